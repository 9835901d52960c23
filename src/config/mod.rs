//! Configuration for racegraph
//!
//! Provides:
//! - TOML configuration files
//! - Environment variable overrides
//! - Extra namespace prefixes merged into the fixed table
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./racegraph.toml` - Project-local configuration
//! 2. `~/.config/racegraph/config.toml` - User configuration (XDG)
//! 3. `/etc/racegraph/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `RACEGRAPH_BASE_IRI` - Base IRI for entity IRIs
//! - `RACEGRAPH_MAX_LIMIT` - Upper bound for LIMIT
//! - `RACEGRAPH_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `RACEGRAPH_HOST` / `RACEGRAPH_PORT` - Server address
//! - `RACEGRAPH_DATA` - JSON snapshot with events, athletes and results
//!
//! # Example Configuration
//!
//! ```toml
//! [general]
//! base_iri = "https://races.example.org/"
//! log_level = "normal"
//!
//! [query]
//! max_limit = 10000
//!
//! [server]
//! port = 8080
//! host = "0.0.0.0"
//!
//! [data]
//! path = "./data.json"
//!
//! [prefixes]
//! ex = "http://example.org/"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RaceGraphError};
use crate::mapper::Mapper;
use crate::namespace::{is_valid_prefix, NamespaceTable};
use crate::sparql::DEFAULT_MAX_LIMIT;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RaceGraphConfig {
    pub general: GeneralConfig,
    pub query: QueryConfig,
    pub server: ServerConfig,
    pub data: DataConfig,
    /// Extra prefixes, added after the fixed ones
    pub prefixes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Entity IRIs are minted beneath this IRI
    pub base_iri: String,
    pub log_level: LogLevel,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { base_iri: "http://localhost:8080/".to_string(), log_level: LogLevel::Normal }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// LIMIT is clamped to this; a query without LIMIT gets it too
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { max_limit: DEFAULT_MAX_LIMIT }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_enabled: bool,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_enabled: true,
            max_body_size: 1024 * 1024, // 1 MB
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// JSON snapshot loaded as the entity source
    pub path: Option<PathBuf>,
}

// ============================================================================
// Enums
// ============================================================================

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// The `tracing` filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "info",
            LogLevel::Verbose => "debug",
            LogLevel::Debug => "trace",
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl RaceGraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the first existing default location, then
    /// apply environment variable overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        let config: RaceGraphConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let config: RaceGraphConfig = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(PathBuf::from("<string>"), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config file search paths, in priority order
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./racegraph.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("racegraph").join("config.toml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/racegraph/config.toml"));

        paths
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparseable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("RACEGRAPH_BASE_IRI") {
            self.general.base_iri = val;
        }

        if let Some(limit) = lookup("RACEGRAPH_MAX_LIMIT").and_then(|v| v.parse::<usize>().ok()) {
            self.query.max_limit = limit;
        }

        if let Some(level) = lookup("RACEGRAPH_LOG_LEVEL").and_then(|v| LogLevel::from_str(&v)) {
            self.general.log_level = level;
        }

        if let Some(host) = lookup("RACEGRAPH_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("RACEGRAPH_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.server.port = port;
        }

        if let Some(path) = lookup("RACEGRAPH_DATA") {
            self.data.path = Some(PathBuf::from(path));
        }
    }

    /// Reject values the rest of the crate cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.general.base_iri.contains("://") {
            return Err(ConfigError::Invalid(format!(
                "base_iri must be an absolute IRI, got '{}'",
                self.general.base_iri
            )));
        }
        if self.query.max_limit == 0 {
            return Err(ConfigError::Invalid("max_limit must be at least 1".to_string()));
        }
        if let Some(prefix) = self.prefixes.keys().find(|p| !is_valid_prefix(p)) {
            return Err(ConfigError::Invalid(format!("'{}' is not a valid prefix name", prefix)));
        }
        Ok(())
    }

    /// The fixed prefixes, the configured extras and the base IRI, normalised
    /// the same way entity IRIs are minted
    pub fn namespaces(&self) -> NamespaceTable {
        let mapper = Mapper::new(self.general.base_iri.as_str());
        let mut table = NamespaceTable::well_known().with_base(mapper.base_iri());
        table.extend(self.prefixes.iter().map(|(p, n)| (p.as_str(), n.as_str())));
        table
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Write configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))
    }

    /// Generate a default configuration file content
    pub fn default_config_content() -> &'static str {
        r#"# racegraph configuration

[general]
# Entity IRIs are minted as <base_iri><collection>/<id>
base_iri = "http://localhost:8080/"
# Logging level: quiet, normal, verbose, debug
log_level = "normal"

[query]
# Upper bound for LIMIT; queries without LIMIT get this value
max_limit = 10000

[server]
port = 8080
host = "0.0.0.0"
# Permissive CORS headers for browser clients
cors_enabled = true
# Maximum request body size (bytes)
max_body_size = 1048576

[data]
# JSON snapshot: {"events": [...], "athletes": [...], "results": [...]}
# path = "./data.json"

[prefixes]
# Extra prefixes for queries and Turtle/JSON-LD output
# ex = "http://example.org/"
"#
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {}", .0.display(), .1)]
    IoError(PathBuf, String),

    #[error("Parse error in {}: {}", .0.display(), .1)]
    ParseError(PathBuf, String),

    #[error("Serialization error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for RaceGraphError {
    fn from(err: ConfigError) -> Self {
        let code = match &err {
            ConfigError::IoError(..) => ErrorCode::ConfigNotFound,
            ConfigError::ParseError(..) => ErrorCode::InvalidConfigSyntax,
            ConfigError::SerializeError(_) | ConfigError::Invalid(_) => ErrorCode::ConfigError,
        };
        RaceGraphError::new(code, err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RaceGraphConfig::new();
        assert_eq!(config.query.max_limit, 10000);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.general.log_level, LogLevel::Normal);
        assert!(config.server.cors_enabled);
        assert_eq!(config.data.path, None);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [general]
            base_iri = "https://races.example.org/"
            log_level = "verbose"

            [query]
            max_limit = 500

            [server]
            port = 9000

            [data]
            path = "data/races.json"
        "#;

        let config = RaceGraphConfig::load_from_str(toml).unwrap();
        assert_eq!(config.general.base_iri, "https://races.example.org/");
        assert_eq!(config.general.log_level, LogLevel::Verbose);
        assert_eq!(config.query.max_limit, 500);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.data.path, Some(PathBuf::from("data/races.json")));
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let config = RaceGraphConfig::load_from_str(RaceGraphConfig::default_config_content()).unwrap();
        assert_eq!(config, RaceGraphConfig::default());
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("quiet"), Some(LogLevel::Quiet));
        assert_eq!(LogLevel::from_str("V"), Some(LogLevel::Verbose));
        assert_eq!(LogLevel::from_str("loud"), None);
        assert_eq!(LogLevel::Quiet.filter_directive(), "error");
        assert_eq!(LogLevel::Debug.filter_directive(), "trace");
    }

    #[test]
    fn test_prefixes_merge_into_table() {
        let toml = r#"
            [prefixes]
            ex = "http://example.org/"
        "#;

        let config = RaceGraphConfig::load_from_str(toml).unwrap();
        let table = config.namespaces();
        assert_eq!(table.get("ex"), Some("http://example.org/"));
        assert_eq!(table.get("schema"), Some("http://schema.org/"));
        assert_eq!(table.base().map(|b| b.as_str()), Some("http://localhost:8080/"));
    }

    #[test]
    fn test_namespaces_base_matches_minted_iris() {
        let mut config = RaceGraphConfig::new();
        config.general.base_iri = "http://ex.org/db".into();
        assert_eq!(config.namespaces().base().map(|b| b.as_str()), Some("http://ex.org/db/"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RACEGRAPH_BASE_IRI", "https://override.example/"),
            ("RACEGRAPH_MAX_LIMIT", "25"),
            ("RACEGRAPH_PORT", "not-a-port"),
            ("RACEGRAPH_DATA", "/tmp/data.json"),
        ]
        .into_iter()
        .collect();

        let mut config = RaceGraphConfig::new();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.general.base_iri, "https://override.example/");
        assert_eq!(config.query.max_limit, 25);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.data.path, Some(PathBuf::from("/tmp/data.json")));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            RaceGraphConfig::load_from_str("[general]\nbase_iri = \"relative/\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RaceGraphConfig::load_from_str("[query]\nmax_limit = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RaceGraphConfig::load_from_str("[prefixes]\n\"1bad\" = \"http://x/\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(RaceGraphConfig::load_from_str("[server\nport = 1"), Err(ConfigError::ParseError(..))));
    }

    #[test]
    fn test_serialize_config() {
        let toml = RaceGraphConfig::new().to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[query]"));
        assert!(toml.contains("[server]"));
    }

    #[test]
    fn test_config_paths() {
        let paths = RaceGraphConfig::config_paths();
        assert!(paths[0].ends_with("racegraph.toml"));
    }

    #[test]
    fn test_config_error_codes() {
        let err: RaceGraphError = ConfigError::ParseError(PathBuf::from("x.toml"), "bad".into()).into();
        assert_eq!(err.code, ErrorCode::InvalidConfigSyntax);
        assert_eq!(err.http_status(), 500);
    }
}
