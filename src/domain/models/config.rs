use serde::{Deserialize, Serialize};

use super::deployment::AutoFixTrigger;

/// Main configuration structure for flowgate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Process engine endpoints
    #[serde(default)]
    pub engine: EngineConfig,

    /// Local draft storage
    #[serde(default)]
    pub drafts: DraftsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Deployment behaviour
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Task lifecycle settings
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Process engine endpoints.
///
/// Workflow registry, deployment, claims and task listing go through the
/// gateway; task lookup and form submission go straight to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,

    /// Request timeout in seconds (1-300)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_engine_url() -> String {
    "http://localhost:8081".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            engine_url: default_engine_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Draft storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DraftsConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_drafts_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Session the draft slots belong to
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_drafts_path() -> String {
    ".flowgate/drafts.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

fn default_session_id() -> String {
    "default".to_string()
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            path: default_drafts_path(),
            max_connections: default_max_connections(),
            session_id: default_session_id(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeployConfig {
    /// When a deploy rejection offers an auto-fix
    #[serde(default)]
    pub auto_fix_trigger: AutoFixTrigger,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TasksConfig {
    /// Identity used when claiming and submitting tasks
    #[serde(default)]
    pub actor: Option<String>,
}
