use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::rate_limit::{RateLimitConfig, RateLimits};
use crate::session::SessionLimits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// 未设置时使用进程内存储
    pub database_url: Option<String>,
    /// 未设置时每个设备使用进程内键值存储
    pub redis_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limits: RateLimits,
    pub sessions: SessionLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            server_host: "::".to_string(),
            server_port: 3000,
            api_base_uri: "/api".to_string(),
            rate_limits: RateLimits::default(),
            sessions: SessionLimits::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let rate_limits = RateLimits {
            create_bug: rate_limit_var("RATE_LIMIT_CREATE_BUG", defaults.rate_limits.create_bug)?,
            create_feature: rate_limit_var(
                "RATE_LIMIT_CREATE_FEATURE",
                defaults.rate_limits.create_feature,
            )?,
            vote: rate_limit_var("RATE_LIMIT_VOTE", defaults.rate_limits.vote)?,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: match env::var("SERVER_PORT") {
                Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_PORT",
                    value,
                })?,
                Err(_) => defaults.server_port,
            },
            api_base_uri: env::var("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            rate_limits,
            sessions: SessionLimits {
                max_devices: positive_var("SESSION_MAX_DEVICES")?
                    .unwrap_or(defaults.sessions.max_devices),
                idle: positive_var("SESSION_IDLE_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.sessions.idle),
            },
        })
    }
}

fn rate_limit_var(
    var: &'static str,
    default: RateLimitConfig,
) -> Result<RateLimitConfig, ConfigError> {
    match env::var(var) {
        Ok(value) => {
            parse_rate_limit(&value).ok_or(ConfigError::Invalid { var, value })
        }
        Err(_) => Ok(default),
    }
}

fn positive_var(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(ConfigError::Invalid { var, value }),
        },
        Err(_) => Ok(None),
    }
}

/// 解析 `<max>/<window_secs>`，例如 `5/3600`
pub fn parse_rate_limit(value: &str) -> Option<RateLimitConfig> {
    let (max, window) = value.trim().split_once('/')?;
    let max_requests: u32 = max.trim().parse().ok()?;
    let window_secs: u64 = window.trim().parse().ok()?;
    if max_requests == 0 || window_secs == 0 {
        return None;
    }
    // 窗口毫秒数必须能放进 i64 时间戳运算
    let window_ms = window_secs.checked_mul(1000)?;
    i64::try_from(window_ms).ok()?;
    Some(RateLimitConfig::new(max_requests, window_ms))
}
