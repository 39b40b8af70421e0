//! Layered settings: built-in defaults, then an optional TOML file, then
//! `HOUSEHOLD_PLANNER__SECTION__KEY` environment variables.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::planner::{Budget, Planner, Strategy};
use crate::world::World;

pub const DEFAULT_FILE: &str = "household-planner.toml";
pub const ENV_PREFIX: &str = "HOUSEHOLD_PLANNER";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub search: SearchSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchSettings {
    pub strategy: Strategy,
    #[serde(default)]
    pub max_nodes: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    pub dedup_successors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    /// Reads `file` if given (it must exist), else `household-planner.toml`
    /// from the working directory when present.
    pub fn new(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(file, Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
    }

    fn load(file: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::from(Path::new(DEFAULT_FILE)).format(FileFormat::Toml).required(false),
        };
        let builder = Config::builder()
            .set_default("search.strategy", "bfs")?
            .set_default("search.dedup_successors", true)?
            .set_default("logging.level", "warn")?
            .add_source(file)
            .add_source(environment);

        builder.build()?.try_deserialize()
    }

    pub fn budget(&self) -> Budget {
        let mut budget = Budget::unlimited();
        if let Some(max_nodes) = self.search.max_nodes {
            budget = budget.max_nodes(max_nodes);
        }
        if let Some(ms) = self.search.timeout_ms {
            budget = budget.timeout(Duration::from_millis(ms));
        }
        budget
    }

    pub fn planner(&self, world: &World) -> Planner {
        Planner::new(world)
            .strategy(self.search.strategy)
            .budget(self.budget())
            .dedup_successors(self.search.dedup_successors)
    }
}

impl LoggingSettings {
    /// `RUST_LOG` wins; `level` is the fallback directive.
    pub fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        Ok(EnvFilter::builder().with_default_directive(self.level.parse()?).from_env_lossy())
    }
}
