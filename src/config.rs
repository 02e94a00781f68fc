use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LmChatConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
    pub context: ContextConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Sent as the `model` field only when set; LM Studio serves whatever is loaded.
    pub model: Option<String>,
    /// Sender name recorded on assistant turns and shown above each reply.
    pub assistant_name: String,
}

/// Knobs for how much stored dialogue is replayed to the model.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContextConfig {
    pub history_window: usize,
    pub fact_markers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_lmchat_dir()
            .join("chats.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:1234/v1/chat/completions".into(),
            temperature: 0.7,
            max_tokens: 1000,
            model: None,
            assistant_name: "Llama 3.3-70B".into(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            fact_markers: vec!["name is".into(), "my name".into()],
        }
    }
}

/// Returns `~/.lmchat/`, falling back to a relative `.lmchat` without a home directory.
pub fn default_lmchat_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lmchat")
}

/// Returns the default config file path: `~/.lmchat/config.toml`
pub fn default_config_path() -> PathBuf {
    default_lmchat_dir().join("config.toml")
}

impl LmChatConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            LmChatConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (LMCHAT_DB, LMCHAT_ENDPOINT, LMCHAT_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LMCHAT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("LMCHAT_ENDPOINT") {
            self.inference.endpoint = val;
        }
        if let Ok(val) = std::env::var("LMCHAT_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LmChatConfig::default();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.inference.temperature, 0.7);
        assert_eq!(config.inference.max_tokens, 1000);
        assert!(config.inference.model.is_none());
        assert_eq!(config.context.history_window, 10);
        assert_eq!(config.context.fact_markers, vec!["name is", "my name"]);
        assert!(config.storage.db_path.ends_with("chats.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[logging]
level = "debug"

[storage]
db_path = "/tmp/test.db"

[inference]
endpoint = "http://127.0.0.1:8080/v1/chat/completions"
model = "qwen2.5-7b"

[context]
history_window = 4
"#;
        let config: LmChatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(
            config.inference.endpoint,
            "http://127.0.0.1:8080/v1/chat/completions"
        );
        assert_eq!(config.inference.model.as_deref(), Some("qwen2.5-7b"));
        assert_eq!(config.context.history_window, 4);
        // defaults still apply for unset fields
        assert_eq!(config.inference.max_tokens, 1000);
        assert_eq!(config.context.fact_markers.len(), 2);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = LmChatConfig::default();
        std::env::set_var("LMCHAT_DB", "/tmp/override.db");
        std::env::set_var("LMCHAT_ENDPOINT", "http://10.0.0.2:1234/v1/chat/completions");
        std::env::set_var("LMCHAT_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(
            config.inference.endpoint,
            "http://10.0.0.2:1234/v1/chat/completions"
        );
        assert_eq!(config.logging.level, "trace");

        // Clean up
        std::env::remove_var("LMCHAT_DB");
        std::env::remove_var("LMCHAT_ENDPOINT");
        std::env::remove_var("LMCHAT_LOG_LEVEL");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = LmChatConfig::load_from(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.inference.assistant_name, "Llama 3.3-70B");
    }
}
