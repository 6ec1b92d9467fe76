//! Command implementations

pub mod common;
pub mod install;
pub mod plan;
pub mod status;
pub mod uninstall;
pub mod update;
