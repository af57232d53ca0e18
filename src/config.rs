use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::scoring::RubricConfig;

/// Application-level constants
pub const APP_NAME: &str = "AISP";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,aisp_lib=debug"
    } else {
        "info"
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine home directory; set AISP_DATA_DIR")]
    NoHomeDir,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid rubric: {0}")]
    InvalidRubric(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Get the application data directory (~/AISP/ unless overridden)
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Connection settings for the chat-completion service.
#[derive(Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.bigmodel.cn/api/paas/v4".into(),
            api_key: None,
            model: "glm-4".into(),
            temperature: 0.7,
            max_tokens: 500,
            timeout: Duration::from_secs(30),
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueConfig {
    /// Prior transcript messages sent with each generation request.
    pub history_window: usize,
    /// Student input is truncated to this many characters.
    pub max_input_chars: usize,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            max_input_chars: 500,
            idle_timeout: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub cases_dir: PathBuf,
    pub provider: ProviderConfig,
    pub dialogue: DialogueConfig,
    pub rubric: RubricConfig,
}

impl AppConfig {
    /// Build from process environment (`AISP_*` variables).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match get("AISP_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => app_data_dir()?,
        };
        let database_path = get("AISP_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("aisp.db"));
        let cases_dir = get("AISP_CASES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("cases"));

        let mut provider = ProviderConfig::default();
        if let Some(url) = get("AISP_PROVIDER_BASE_URL") {
            provider.base_url = url.trim_end_matches('/').to_string();
        }
        provider.api_key = get("AISP_PROVIDER_API_KEY");
        if let Some(model) = get("AISP_PROVIDER_MODEL") {
            provider.model = model;
        }
        if let Some(secs) = parse_var::<u64>(&get, "AISP_PROVIDER_TIMEOUT_SECS")? {
            provider.timeout = Duration::from_secs(secs);
        }

        let mut dialogue = DialogueConfig::default();
        if let Some(secs) = parse_var::<u64>(&get, "AISP_IDLE_TIMEOUT_SECS")? {
            dialogue.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&get, "AISP_SWEEP_INTERVAL_SECS")? {
            dialogue.sweep_interval = Duration::from_secs(secs.max(1));
        }

        let rubric = load_rubric(&data_dir.join("rubric.json"))?;

        Ok(Self {
            data_dir,
            database_path,
            cases_dir,
            provider,
            dialogue,
            rubric,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.into(),
                value: raw,
            }),
    }
}

/// Rubric overrides from `path`, or the defaults when the file is absent.
pub fn load_rubric(path: &Path) -> Result<RubricConfig, ConfigError> {
    if !path.exists() {
        return Ok(RubricConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rubric: RubricConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    rubric.validate()?;
    tracing::info!(path = %path.display(), "Loaded rubric overrides");
    Ok(rubric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_derive_from_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().to_string_lossy().to_string();
        let config = AppConfig::from_lookup(lookup(&[("AISP_DATA_DIR", &data)])).unwrap();

        assert_eq!(config.database_path, dir.path().join("aisp.db"));
        assert_eq!(config.cases_dir, dir.path().join("cases"));
        assert_eq!(config.provider.model, "glm-4");
        assert_eq!(config.provider.timeout, Duration::from_secs(30));
        assert_eq!(config.dialogue.history_window, 10);
        assert_eq!(config.dialogue.max_input_chars, 500);
        assert_eq!(config.rubric, RubricConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().to_string_lossy().to_string();
        let config = AppConfig::from_lookup(lookup(&[
            ("AISP_DATA_DIR", &data),
            ("AISP_PROVIDER_BASE_URL", "http://localhost:8000/v1/"),
            ("AISP_PROVIDER_MODEL", "glm-4-flash"),
            ("AISP_PROVIDER_TIMEOUT_SECS", "5"),
            ("AISP_IDLE_TIMEOUT_SECS", "60"),
            ("AISP_PROVIDER_API_KEY", "  "),
        ]))
        .unwrap();

        assert_eq!(config.provider.base_url, "http://localhost:8000/v1");
        assert_eq!(config.provider.model, "glm-4-flash");
        assert_eq!(config.provider.timeout, Duration::from_secs(5));
        assert_eq!(config.dialogue.idle_timeout, Duration::from_secs(60));
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn unparsable_number_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("AISP_DATA_DIR", "/tmp/aisp-test"),
            ("AISP_PROVIDER_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "AISP_PROVIDER_TIMEOUT_SECS"));
    }

    #[test]
    fn rubric_file_overrides_and_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rubric.json");

        std::fs::write(&path, r#"{"standards": {"full_turns": 12}}"#).unwrap();
        let rubric = load_rubric(&path).unwrap();
        assert_eq!(rubric.standards.full_turns, 12);
        assert_eq!(rubric.standards.pass_turns, 5);

        std::fs::write(
            &path,
            r#"{"weights": {"inquiry": 0.5, "diagnosis": 0.5, "communication": 0.5}}"#,
        )
        .unwrap();
        assert!(matches!(
            load_rubric(&path),
            Err(ConfigError::InvalidRubric(_))
        ));

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_rubric(&path), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let provider = ProviderConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let text = format!("{provider:?}");
        assert!(!text.contains("sk-secret"));
        assert!(text.contains("<redacted>"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
