//! Application configuration for listscribe.
//!
//! User config lives at `~/.listscribe/listscribe.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ListscribeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "listscribe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".listscribe";

// ---------------------------------------------------------------------------
// Config structs (matching listscribe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Generation service settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Outbound transport policy.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Optional branding for the directory the dataset belongs to.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Backing-file output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Records processed concurrently per batch window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Per-request fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum prompt size accepted by the generation service, in tokens.
    #[serde(default = "default_token_ceiling")]
    pub token_ceiling: u64,

    /// Hard cap on AI-prioritized links per site.
    #[serde(default = "default_max_priority_links")]
    pub max_priority_links: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            window_size: default_window_size(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            token_ceiling: default_token_ceiling(),
            max_priority_links: default_max_priority_links(),
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_window_size() -> usize {
    3
}
fn default_fetch_timeout_secs() -> u64 {
    20
}
fn default_token_ceiling() -> u64 {
    1_048_576
}
fn default_max_priority_links() -> usize {
    5
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model to use for generation, token counting, and link prioritization.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL. Overridable for proxies and tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    "gemini-2.0-flash-lite".into()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

/// `[transport]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// TLS validation mode: "permissive" (default) or "strict".
    #[serde(default = "default_tls_mode")]
    pub tls: TlsMode,

    /// Hostname substrings that must be fetched over plain HTTP.
    #[serde(default = "default_plain_http_hosts")]
    pub plain_http_hosts: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: default_tls_mode(),
            plain_http_hosts: default_plain_http_hosts(),
        }
    }
}

/// TLS certificate/hostname validation mode.
///
/// `Permissive` disables certificate and hostname verification. The datasets
/// this tool targets are full of small-organization sites with expired or
/// mis-issued certificates, and the pipeline only reads public marketing
/// pages, so the trade-off is accepted by default and made explicit here
/// rather than buried in a client builder flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    Strict,
    Permissive,
}

fn default_tls_mode() -> TlsMode {
    TlsMode::Permissive
}
fn default_plain_http_hosts() -> Vec<String> {
    vec!["eyesonsite".into()]
}

/// `[directory]` section — branding injected into generation prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory name (e.g., the listing site the dataset came from).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Directory URL for the prompt's closing call-to-action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Records processed concurrently per batch window.
    pub window_size: usize,
    /// Per-request fetch timeout.
    pub fetch_timeout: Duration,
    /// Token ceiling for prompt negotiation.
    pub token_ceiling: u64,
    /// Hard cap on prioritized links.
    pub max_priority_links: usize,
    /// TLS validation mode.
    pub tls: TlsMode,
    /// Hostname substrings forced onto plain HTTP.
    pub plain_http_hosts: Vec<String>,
    /// Directory branding for prompts.
    pub directory_name: Option<String>,
    /// Directory URL for prompts.
    pub directory_url: Option<String>,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            window_size: config.defaults.window_size.max(1),
            fetch_timeout: Duration::from_secs(config.defaults.fetch_timeout_secs),
            token_ceiling: config.defaults.token_ceiling,
            max_priority_links: config.defaults.max_priority_links,
            tls: config.transport.tls,
            plain_http_hosts: config.transport.plain_http_hosts.clone(),
            directory_name: config.directory.name.clone(),
            directory_url: config.directory.url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.listscribe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ListscribeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.listscribe/listscribe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ListscribeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ListscribeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ListscribeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ListscribeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ListscribeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the generation-service API key from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.gemini.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ListscribeError::config(format!(
            "generation API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(toml_str.contains("permissive"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.window_size, 3);
        assert_eq!(parsed.defaults.token_ceiling, 1_048_576);
        assert_eq!(parsed.gemini.api_key_env, "GEMINI_API_KEY");
        assert_eq!(parsed.transport.tls, TlsMode::Permissive);
    }

    #[test]
    fn strict_tls_parses() {
        let toml_str = r#"
[transport]
tls = "strict"
plain_http_hosts = []
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.transport.tls, TlsMode::Strict);
        assert!(config.transport.plain_http_hosts.is_empty());
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.window_size, 3);
        assert_eq!(pipeline.fetch_timeout, Duration::from_secs(20));
        assert_eq!(pipeline.max_priority_links, 5);
        assert!(pipeline.directory_name.is_none());
    }

    #[test]
    fn window_size_floor_is_one() {
        let mut app = AppConfig::default();
        app.defaults.window_size = 0;
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.window_size, 1);
    }

    #[test]
    fn api_key_resolution_fails_when_unset() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.gemini.api_key_env = "LS_TEST_NONEXISTENT_KEY_98765".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
