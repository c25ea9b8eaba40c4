use crate::controller::StartupPrecedence;
use crate::error::AppError;
use crate::remote::{DEFAULT_API_URL, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TODO_TIMER_CONFIG_PATH";
const API_URL_ENV_VAR: &str = "TODO_TIMER_API_URL";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub snapshot_path: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub startup: Option<StartupPrecedence>,
}

impl Config {
    /// API base URL: `TODO_TIMER_API_URL`, then the config file, then the
    /// local default.
    pub fn api_url(&self) -> String {
        if let Ok(url) = std::env::var(API_URL_ENV_VAR)
            && !url.trim().is_empty()
        {
            return url;
        }

        self.api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .to_string()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn startup(&self) -> StartupPrecedence {
        self.startup.unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub snapshot_path: Option<String>,
    pub timeout_secs: Option<u64>,
    pub startup: Option<StartupPrecedence>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("todo_timer")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("todo_timer")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(api_url) = overrides.api_url.as_ref() {
        merged.api_url = Some(api_url.clone());
    }
    if let Some(snapshot_path) = overrides.snapshot_path.as_ref() {
        merged.snapshot_path = Some(snapshot_path.clone());
    }
    if overrides.timeout_secs.is_some() {
        merged.timeout_secs = overrides.timeout_secs;
    }
    if overrides.startup.is_some() {
        merged.startup = overrides.startup;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, load_config_from_path, load_config_with_fallback_from_path,
        merge_overrides,
    };
    use crate::controller::StartupPrecedence;
    use crate::remote::DEFAULT_TIMEOUT;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("todo_timer-{nanos}-{file_name}"))
    }

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.unwrap().code(), "invalid_data");
    }

    #[test]
    fn load_config_reads_valid_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "api_url": "http://todos.internal:8080",
            "timeout_secs": 3,
            "startup": "merge"
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.api_url.as_deref(), Some("http://todos.internal:8080"));
        assert_eq!(loaded.timeout(), Duration::from_secs(3));
        assert_eq!(loaded.startup(), StartupPrecedence::Merge);
        assert_eq!(loaded.snapshot_path, None);
    }

    #[test]
    fn defaults_apply_when_fields_are_missing() {
        let config = Config::default();
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.startup(), StartupPrecedence::Local);
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let config = Config {
            timeout_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config {
            api_url: Some("http://a".into()),
            snapshot_path: Some("/tmp/a.json".into()),
            timeout_secs: Some(5),
            startup: None,
        };
        let overrides = ConfigOverrides {
            api_url: Some("http://b".into()),
            startup: Some(StartupPrecedence::Remote),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.api_url.as_deref(), Some("http://b"));
        assert_eq!(merged.snapshot_path.as_deref(), Some("/tmp/a.json"));
        assert_eq!(merged.timeout_secs, Some(5));
        assert_eq!(merged.startup, Some(StartupPrecedence::Remote));
        assert_eq!(base.api_url.as_deref(), Some("http://a"));
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            api_url: Some("http://a".into()),
            ..Config::default()
        };

        let merged = merge_overrides(&base, &ConfigOverrides::default());

        assert_eq!(merged, base);
    }
}
