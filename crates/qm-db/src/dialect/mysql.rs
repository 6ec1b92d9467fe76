//! MySQL / MariaDB dialect. The [`Dialect`] defaults already produce MySQL
//! SQL, so this adapter only names its engine.

use super::Dialect;
use qm_core::Engine;

/// MySQL dialect adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn engine(&self) -> Engine {
        Engine::MySql
    }
}
