//! Configuration management
//!
//! This module handles loading, validation, and management of the Swarm configuration.
//! Configuration is stored in TOML format at ~/.swarm/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Generative API endpoint, model, key lookup
//! - **router**: Routing policy and classifier retry budget
//! - **rewriter**: Query rewriting window
//! - **memory**: Long-term fact store backing and self-disclosure triggers
//! - **agents**: Search retry budget, video upload polling
//! - **judge**: Optional response scoring pass
//!
//! # Path Expansion
//!
//! `~` in `core.data_dir` and `memory.path` is expanded to the user's home
//! directory, and the data directory is created when missing.
//!
//! # Examples
//!
//! ```no_run
//! use swarm_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.llm.model);
//! println!("Routing policy: {:?}", config.router.policy);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::retry::RetryPolicy;

/// Upper bound for `agents.video_processing_timeout_secs` (one day)
pub const MAX_PROCESSING_TIMEOUT_SECS: u64 = 86_400;

/// Main configuration structure
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Generative API settings
    #[serde(default)]
    pub llm: LLMConfig,

    /// Router settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Query rewriter settings
    #[serde(default)]
    pub rewriter: RewriterConfig,

    /// Long-term memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Specialist agent settings
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Judge settings
    #[serde(default)]
    pub judge: JudgeConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Generative API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Model identifier used for every call
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for the generateContent and files endpoints
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL for media uploads
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,

    /// Environment variable checked for the API key before the OS keychain
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request HTTP timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Which routing policy picks the specialist
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPolicyKind {
    /// One-word classification call to the model
    Classifier,

    /// Fixed ordered substring rules
    Keyword,
}

impl std::str::FromStr for RoutingPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classifier" => Ok(Self::Classifier),
            "keyword" => Ok(Self::Keyword),
            other => Err(format!(
                "unknown routing policy '{}', expected 'classifier' or 'keyword'",
                other
            )),
        }
    }
}

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Routing policy
    #[serde(default = "default_policy")]
    pub policy: RoutingPolicyKind,

    /// Maximum classifier attempts while rate limited
    #[serde(default = "default_router_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between classifier attempts (seconds)
    #[serde(default = "default_router_backoff")]
    pub backoff_secs: u64,
}

/// Query rewriter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriterConfig {
    /// Enable the rewrite step
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of most recent chat turns given to the rewriter
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Retry the rewrite call while rate limited (uses the router budget)
    #[serde(default)]
    pub retry_on_rate_limit: bool,
}

/// Backing used for the long-term fact store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    /// Flat JSON file `{"facts": [...]}`
    Json,

    /// SQLite database
    Sqlite,
}

impl MemoryBackend {
    /// Store file used when `memory.path` is left at its default
    pub fn default_path(&self) -> PathBuf {
        match self {
            MemoryBackend::Json => PathBuf::from("~/.swarm/user_memory.json"),
            MemoryBackend::Sqlite => PathBuf::from("~/.swarm/user_memory.db"),
        }
    }
}

/// Which text the self-disclosure detector inspects and stores
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisclosureSource {
    /// The user's message as typed
    Original,

    /// The standalone rewrite of the message
    Rewritten,
}

/// Long-term memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Store backing
    #[serde(default = "default_memory_backend")]
    pub backend: MemoryBackend,

    /// File used by the backing (supports ~ expansion)
    #[serde(default = "default_memory_path")]
    pub path: PathBuf,

    /// Text checked for self-disclosure
    #[serde(default = "default_disclosure_source")]
    pub disclosure_source: DisclosureSource,

    /// Case-insensitive substrings that mark a self-disclosure
    #[serde(default = "default_triggers")]
    pub triggers: Vec<String>,

    /// Acknowledge and skip routing once a fact was stored
    #[serde(default = "default_true")]
    pub short_circuit: bool,
}

/// Specialist agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Maximum search attempts while rate limited
    #[serde(default = "default_search_attempts")]
    pub search_max_attempts: u32,

    /// Fixed delay between search attempts (seconds)
    #[serde(default = "default_search_backoff")]
    pub search_backoff_secs: u64,

    /// Interval between upload state checks (seconds)
    #[serde(default = "default_poll_interval")]
    pub video_poll_interval_secs: u64,

    /// Give up on an upload that is still processing after this long (seconds)
    #[serde(default = "default_processing_timeout")]
    pub video_processing_timeout_secs: u64,
}

/// Judge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Score every answer after it is produced
    #[serde(default)]
    pub enabled: bool,

    /// Criteria text inserted into the judge prompt
    #[serde(default = "default_criteria")]
    pub criteria: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.swarm")
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_upload_base_url() -> String {
    "https://generativelanguage.googleapis.com/upload/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_policy() -> RoutingPolicyKind {
    RoutingPolicyKind::Classifier
}

fn default_router_attempts() -> u32 {
    3
}

fn default_router_backoff() -> u64 {
    2
}

fn default_history_window() -> usize {
    5
}

fn default_memory_backend() -> MemoryBackend {
    MemoryBackend::Json
}

fn default_memory_path() -> PathBuf {
    MemoryBackend::Json.default_path()
}

fn default_disclosure_source() -> DisclosureSource {
    DisclosureSource::Original
}

fn default_triggers() -> Vec<String> {
    ["my name is", "i study", "i like", "i am a"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_search_attempts() -> u32 {
    3
}

fn default_search_backoff() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    2
}

fn default_processing_timeout() -> u64 {
    300
}

fn default_criteria() -> String {
    "accuracy, helpfulness, and safety".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            upload_base_url: default_upload_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            max_attempts: default_router_attempts(),
            backoff_secs: default_router_backoff(),
        }
    }
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            history_window: default_history_window(),
            retry_on_rate_limit: false,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: default_memory_path(),
            disclosure_source: default_disclosure_source(),
            triggers: default_triggers(),
            short_circuit: true,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            search_max_attempts: default_search_attempts(),
            search_backoff_secs: default_search_backoff(),
            video_poll_interval_secs: default_poll_interval(),
            video_processing_timeout_secs: default_processing_timeout(),
        }
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            criteria: default_criteria(),
        }
    }
}

impl RouterConfig {
    /// Retry budget for the classifier call
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.backoff_secs))
    }
}

impl AgentsConfig {
    /// Retry budget for the search agent
    pub fn search_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.search_max_attempts,
            Duration::from_secs(self.search_backoff_secs),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.video_poll_interval_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.video_processing_timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default location (~/.swarm/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before path expansion so the file keeps the portable `~` form
        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.swarm/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".swarm").join("config.toml"))
    }

    /// Directory where generated images are written
    pub fn images_dir(&self) -> PathBuf {
        self.core.data_dir.join("images")
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates enumerated and numeric fields
    /// - Expands ~ in paths
    /// - Creates the data directory if it doesn't exist
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(EngineError::Config("llm.model must not be empty".to_string()));
        }

        if self.router.max_attempts == 0 {
            return Err(EngineError::Config(
                "router.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.agents.search_max_attempts == 0 {
            return Err(EngineError::Config(
                "agents.search_max_attempts must be at least 1".to_string(),
            ));
        }

        if self.agents.video_poll_interval_secs == 0 {
            return Err(EngineError::Config(
                "agents.video_poll_interval_secs must be at least 1".to_string(),
            ));
        }

        if !(1..=MAX_PROCESSING_TIMEOUT_SECS).contains(&self.agents.video_processing_timeout_secs) {
            return Err(EngineError::Config(format!(
                "agents.video_processing_timeout_secs must be between 1 and {}",
                MAX_PROCESSING_TIMEOUT_SECS
            )));
        }

        if self.rewriter.history_window == 0 {
            return Err(EngineError::Config(
                "rewriter.history_window must be at least 1".to_string(),
            ));
        }

        if self.memory.triggers.iter().any(|t| t.trim().is_empty()) {
            return Err(EngineError::Config(
                "memory.triggers must not contain empty entries".to_string(),
            ));
        }

        // The shared default names the JSON file; sqlite gets its own
        if self.memory.path == default_memory_path() {
            self.memory.path = self.memory.backend.default_path();
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.memory.path = expand_path(&self.memory.path)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
