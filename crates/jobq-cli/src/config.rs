use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use jobq_core::{EngineConfig, SchedulerConfig};
use serde::{Deserialize, Serialize};

/// Demo configuration.
///
/// Sources, later wins: built-in defaults, `jobq.toml`, `JOBQ_*` environment
/// variables (`JOBQ_ENGINE__RETRY__BASE_DELAY_MS=1000`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl CliConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(CliConfig::default()))
            .merge(Toml::file("jobq.toml"))
            .merge(Env::prefixed("JOBQ_").split("__"))
    }

    /// # Errors
    ///
    /// Returns error if a source cannot be parsed into the config.
    pub fn load() -> anyhow::Result<Self> {
        let config: Self = Self::figment().extract()?;
        Ok(config)
    }
}
