//! Environment-driven configuration structures shared by all binaries.

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_TRX_DISPLAY: u32 = 10;
const DEFAULT_BALANCE_CHECK_INTERVAL_SECS: u64 = 60;

/// Connection settings for the Idena node JSON-RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    rpc_url: String,
    api_key: Option<String>,
}

impl NodeConfig {
    pub fn new(rpc_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            api_key,
        }
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            rpc_url: get_required_var("IDENA_RPC_URL")?,
            api_key: get_optional_var("IDENA_RPC_KEY"),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

/// Knobs for the transaction query flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    trx_display: u32,
    legacy_overflow: bool,
}

impl QueryConfig {
    pub fn new(trx_display: u32, legacy_overflow: bool) -> Self {
        Self {
            trx_display,
            legacy_overflow,
        }
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            trx_display: get_number_var("TRX_DISPLAY")?.unwrap_or(DEFAULT_TRX_DISPLAY),
            legacy_overflow: get_bool_var("TRX_LEGACY_OVERFLOW")?.unwrap_or(false),
        })
    }

    /// Default number of transactions shown when no `count` is given.
    pub fn trx_display(&self) -> u32 {
        self.trx_display
    }

    /// When set, listings render one row past the clamped count (bounded by
    /// what the node returned), as the original bot did.
    pub fn legacy_overflow(&self) -> bool {
        self.legacy_overflow
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TRX_DISPLAY, false)
    }
}

/// Settings of the periodic incoming-balance check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceCheckConfig {
    active: bool,
    interval: Duration,
    admin_ids: Vec<String>,
}

impl BalanceCheckConfig {
    pub fn new(active: bool, interval: Duration, admin_ids: Vec<String>) -> Self {
        Self {
            active,
            interval,
            admin_ids,
        }
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        let active = get_bool_var("BALANCE_CHECK_ACTIVE")?.unwrap_or(true);
        let interval = get_number_var("BALANCE_CHECK_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_BALANCE_CHECK_INTERVAL_SECS)
            .max(1);
        let admin_ids = if active {
            split_list(&get_required_var("ADMIN_IDS")?)
        } else {
            get_optional_var("ADMIN_IDS")
                .map(|value| split_list(&value))
                .unwrap_or_default()
        };

        Ok(Self {
            active,
            interval: Duration::from_secs(interval),
            admin_ids,
        })
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn admin_ids(&self) -> &[String] {
        &self.admin_ids
    }
}

/// API-specific configuration so the HTTP surface does not depend on
/// monitor-only environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    api_bind_address: String,
    node: NodeConfig,
    query: QueryConfig,
}

impl ApiConfig {
    /// Loads only the environment variables required by the API binary.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        Ok(Self {
            api_bind_address: get_required_var("API_BIND_ADDRESS")?,
            node: NodeConfig::load_from_env()?,
            query: QueryConfig::load_from_env()?,
        })
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }

    pub fn node(&self) -> &NodeConfig {
        &self.node
    }

    pub fn query(&self) -> QueryConfig {
        self.query
    }
}

/// Monitor configuration: state database, node access and alert delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    database_url: String,
    node: NodeConfig,
    balance_check: BalanceCheckConfig,
    telegram_bot_token: Option<String>,
}

impl MonitorConfig {
    /// Loads configuration by hydrating `.env` (if present) and reading the
    /// required process variables. The bot token is only required while the
    /// balance check is active.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let balance_check = BalanceCheckConfig::load_from_env()?;
        let telegram_bot_token = if balance_check.active() {
            Some(get_required_var("TELEGRAM_BOT_TOKEN")?)
        } else {
            get_optional_var("TELEGRAM_BOT_TOKEN")
        };

        Ok(Self {
            database_url: get_required_var("DATABASE_URL")?,
            node: NodeConfig::load_from_env()?,
            balance_check,
            telegram_bot_token,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn node(&self) -> &NodeConfig {
        &self.node
    }

    pub fn balance_check(&self) -> &BalanceCheckConfig {
        &self.balance_check
    }

    pub fn telegram_bot_token(&self) -> Option<&str> {
        self.telegram_bot_token.as_deref()
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    get_optional_var(key).ok_or(ConfigError::MissingVar { key })
}

pub(crate) fn get_optional_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn get_number_var<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    get_optional_var(key)
        .map(|value| {
            value
                .parse()
                .map_err(|source| ConfigError::InvalidNumber { key, source })
        })
        .transpose()
}

fn get_bool_var(key: &'static str) -> Result<Option<bool>, ConfigError> {
    get_optional_var(key)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool { key, value }),
        })
        .transpose()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("IDENA_WATCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid boolean `{value}` in `{key}`")]
    InvalidBool { key: &'static str, value: String },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}

/// Serializes every test in this crate that touches the process environment.
#[cfg(test)]
pub(crate) static ENV_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());
