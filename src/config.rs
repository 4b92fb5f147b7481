//! Search configuration.
//!
//! [`SearchConfig`] is read from the `[search]` section of
//! `config/config.toml` and from `LIFEGUARD__SEARCH__*` environment
//! variables, the same sources the rest of Lifeguard reads its settings from.

use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::Deserialize;

const CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct SearchConfig {
    /// Prepended to every model's collection name
    #[serde(default)]
    pub collection_prefix: String,
    /// Page size sent when a criteria sets no `rows`
    #[serde(default)]
    pub default_rows: Option<u64>,
}

fn env_source() -> Environment {
    env_source_from(None)
}

// `vars` replaces the process environment when set
fn env_source_from(vars: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix("LIFEGUARD")
        .separator("__")
        .try_parsing(true)
        .source(vars)
}

impl SearchConfig {
    /// Load the search configuration from `config/config.toml`, falling back to env vars.
    ///
    /// A missing `[search]` section yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_PATH).required(false))
            .add_source(env_source());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(CONFIG_PATH).exists() {
                    log::warn!(
                        "Failed to load {}, falling back to env. Error: {}",
                        CONFIG_PATH,
                        err
                    );
                }
                Config::builder()
                    .add_source(env_source())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Build from an in-memory TOML document with a `[search]` section
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_settings(&settings)
    }

    fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<SearchConfig>("search") {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Search configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }

    /// Full collection name for a model called `name`
    pub fn collection_name(&self, name: &str) -> String {
        format!("{}{}", self.collection_prefix, name)
    }
}
