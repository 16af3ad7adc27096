use crate::courses::{FetchSettings, DEFAULT_FAILURE_RATE};
use std::path::PathBuf;
use std::time::Duration;

/// Sidecar configuration read from the environment at startup.
///
/// | Variable                     | Default | Description                              |
/// |------------------------------|---------|------------------------------------------|
/// | `ROSTERD_WORKSPACE`          | --      | Workspace to open before the first request |
/// | `ROSTERD_FETCH_DELAY_MS`     | `1000`  | Simulated course fetch latency           |
/// | `ROSTERD_FETCH_FAILURE_RATE` | `0.1`   | Simulated fetch failure probability      |
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("ROSTERD_FETCH_FAILURE_RATE must be within [0, 1], got {0}")]
    RateOutOfRange(f64),
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let workspace = lookup("ROSTERD_WORKSPACE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let mut fetch = FetchSettings::default();

        if let Some(val) = lookup("ROSTERD_FETCH_DELAY_MS") {
            let ms = val.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: "ROSTERD_FETCH_DELAY_MS",
                expected: "millisecond count",
                value: val.clone(),
            })?;
            fetch.delay = Duration::from_millis(ms);
        }

        let rate = match lookup("ROSTERD_FETCH_FAILURE_RATE") {
            Some(val) => val.trim().parse::<f64>().map_err(|_| ConfigError::Invalid {
                var: "ROSTERD_FETCH_FAILURE_RATE",
                expected: "number",
                value: val.clone(),
            })?,
            None => DEFAULT_FAILURE_RATE,
        };
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::RateOutOfRange(rate));
        }
        fetch.failure_rate = rate;

        Ok(Config { workspace, fetch })
    }
}
