use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub url: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            limit: default_limit(),
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_source_url() -> String {
    "https://jsonplaceholder.typicode.com/comments?postId=1".to_string()
}
fn default_limit() -> usize {
    3
}
fn default_fetch_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Unset means the HTTP client's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: None,
        }
    }
}

fn default_provider() -> String {
    "groq".to_string()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    120
}

impl AnalyzerConfig {
    /// `false` when `provider = "disabled"`; every analysis then degrades.
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Chat-completions base URL, falling back to the provider's public API.
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "openai" => "https://api.openai.com/v1".to_string(),
            _ => "https://api.groq.com/openai/v1".to_string(),
        }
    }

    /// Name of the environment variable holding the API key.
    pub fn resolved_api_key_env(&self) -> String {
        if let Some(name) = &self.api_key_env {
            return name.clone();
        }
        match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY".to_string(),
            _ => "GROQ_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("processed_comments.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("notification_log.txt")
}

impl Config {
    /// Defaults for every section, bound to `127.0.0.1:8000`.
    ///
    /// Used by `pipeline serve` and `pipeline run` when no config file exists.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:8000".to_string(),
            },
            source: SourceConfig::default(),
            analyzer: AnalyzerConfig::default(),
            storage: StorageConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate source
    if config.source.limit == 0 {
        anyhow::bail!("source.limit must be > 0");
    }
    if config.source.timeout_secs == 0 {
        anyhow::bail!("source.timeout_secs must be > 0");
    }

    // Validate analyzer
    if !(0.0..=2.0).contains(&config.analyzer.temperature) {
        anyhow::bail!("analyzer.temperature must be in [0.0, 2.0]");
    }
    if config.analyzer.max_tokens == 0 {
        anyhow::bail!("analyzer.max_tokens must be > 0");
    }
    if config.analyzer.timeout_secs == Some(0) {
        anyhow::bail!("analyzer.timeout_secs must be > 0 when set");
    }

    match config.analyzer.provider.as_str() {
        "disabled" | "groq" | "openai" => {}
        other => anyhow::bail!(
            "Unknown analyzer provider: '{}'. Must be disabled, groq, or openai.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, content: &str) -> PathBuf {
        let path = tmp.path().join("pipeline.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[server]\nbind = \"127.0.0.1:9000\"\n");
        let cfg = load_config(&path).unwrap();

        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.source.limit, 3);
        assert_eq!(cfg.source.timeout_secs, 10);
        assert_eq!(cfg.analyzer.model, "llama-3.1-8b-instant");
        assert_eq!(cfg.analyzer.max_tokens, 120);
        assert!((cfg.analyzer.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(cfg.analyzer.timeout_secs, None);
        assert_eq!(cfg.storage.path, PathBuf::from("processed_comments.json"));
        assert_eq!(cfg.notify.log_path, PathBuf::from("notification_log.txt"));
    }

    #[test]
    fn test_provider_defaults_resolve() {
        let mut cfg = AnalyzerConfig::default();
        assert_eq!(cfg.resolved_base_url(), "https://api.groq.com/openai/v1");
        assert_eq!(cfg.resolved_api_key_env(), "GROQ_API_KEY");

        cfg.provider = "openai".to_string();
        assert_eq!(cfg.resolved_base_url(), "https://api.openai.com/v1");
        assert_eq!(cfg.resolved_api_key_env(), "OPENAI_API_KEY");

        cfg.base_url = Some("http://127.0.0.1:1234/v1/".to_string());
        assert_eq!(cfg.resolved_base_url(), "http://127.0.0.1:1234/v1");
    }

    #[test]
    fn test_disabled_provider_needs_no_key() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "[server]\nbind = \"127.0.0.1:9000\"\n\n[analyzer]\nprovider = \"disabled\"\napi_key_env = \"COMMENT_PIPELINE_TEST_NEVER_SET\"\n",
        );
        let cfg = load_config(&path).unwrap();
        assert!(!cfg.analyzer.is_enabled());
        assert!(AnalyzerConfig::default().is_enabled());

        let client = crate::analyzer::create_client(&cfg.analyzer).unwrap();
        assert_eq!(client.model_name(), "disabled");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "[server]\nbind = \"127.0.0.1:9000\"\n\n[analyzer]\nprovider = \"bard\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown analyzer provider"));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "[server]\nbind = \"127.0.0.1:9000\"\n\n[source]\nlimit = 0\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let mut cfg = Config::minimal();
        cfg.analyzer.temperature = 3.5;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_config(Path::new("/nonexistent/pipeline.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
