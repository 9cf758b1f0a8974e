use color_eyre::Result;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable overriding the configured service URL.
const SERVICE_URL_ENV: &str = "ANIREC_SERVICE_URL";

/// Client configuration, read from `<config dir>/anirec/config.yaml`.
/// Every field has a default so the file is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the recommendation service.
    pub service_url: String,
    /// Reveal animation cadence in milliseconds per character.
    pub reveal_interval_ms: u64,
    /// Timeout applied to every HTTP request.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".to_string(),
            reveal_interval_ms: 20,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads the config file if present, falling back to defaults.
    /// `ANIREC_SERVICE_URL` takes precedence over the file.
    pub fn load() -> Result<Self> {
        let mut config = match config_file() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)?;
                serde_yaml::from_str(&raw)?
            }
            _ => Self::default(),
        };
        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.is_empty() {
                config.service_url = url;
            }
        }
        Ok(config)
    }
}

fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("anirec").join("config.yaml"))
}

/// Directory for client-side files (token, log). Created on demand.
pub fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("anirec");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let config = Config::default();
        assert_eq!(config.reveal_interval_ms, 20);
        assert_eq!(config.service_url, "http://localhost:8000");
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let config: Config = serde_yaml::from_str("reveal_interval_ms: 5\n").unwrap();
        assert_eq!(config.reveal_interval_ms, 5);
        assert_eq!(config.request_timeout_secs, 30);
    }
}
