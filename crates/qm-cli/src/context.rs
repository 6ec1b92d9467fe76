//! Runtime context for CLI commands

use anyhow::{Context, Result};
use qm_core::{Config, DatabaseConfig, Engine};
use qm_db::{open_connection, Connection};
use qm_engine::Migrator;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Loaded configuration and resolved target, before any connection is made
pub struct ProjectContext {
    pub config: Config,
    pub target: Option<String>,
    pub database: DatabaseConfig,
    pub roots: Vec<PathBuf>,
}

impl ProjectContext {
    /// Load the project configuration and resolve the database target
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let project_path = Path::new(&args.project_dir);

        let config = if let Some(config_path) = &args.config {
            Config::load(Path::new(config_path)).context("Failed to load configuration file")?
        } else {
            Config::load_from_dir(project_path).context("Failed to load project configuration")?
        };

        let target = Config::resolve_target(args.target.as_deref());
        let mut database = config
            .get_database_config(target.as_deref())
            .context("Failed to resolve database target")?;
        if database.engine == Engine::DuckDb
            && database.path != ":memory:"
            && Path::new(&database.path).is_relative()
        {
            database.path = project_path.join(&database.path).display().to_string();
        }
        let roots = config.migration_paths_absolute(project_path);

        log::debug!(
            "Project '{}': engine {}, {} migration root(s)",
            config.name,
            database.engine,
            roots.len()
        );

        Ok(Self {
            config,
            target,
            database,
            roots,
        })
    }

    /// Connect to the target database and build a migrator for it
    pub fn migrator(&self) -> Result<Migrator> {
        let conn: Arc<dyn Connection> = Arc::from(
            open_connection(&self.database).context("Failed to connect to database")?,
        );
        Migrator::from_config(&self.config, self.target.as_deref(), conn)
            .context("Failed to set up migrator")
    }
}
