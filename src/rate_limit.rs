//! 客户端限流（建议性）
//!
//! 固定窗口计数器：每个动作一条记录，窗口到期后整体重置。窗口边界处的突发
//! 最多可放行 `2 × max_requests` 次；清空本地存储即可绕过，它只用于改善体验，
//! 真正的限制必须放在服务端。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::context::ExecutionContext;
use crate::error::StoreError;
use crate::storage::{KeyValueStore, keys};

/// 动作名称
pub mod actions {
    pub const CREATE_BUG: &str = "create_bug";
    pub const CREATE_FEATURE: &str = "create_feature";
    pub const VOTE: &str = "vote";
}

/// 持久化的限流记录，字段名与本地存储布局保持一致
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    #[serde(rename = "resetAt")]
    pub reset_at: i64, // Unix 毫秒时间戳
}

impl RateLimitEntry {
    fn fresh(now_ms: i64, config: &RateLimitConfig) -> Self {
        Self {
            count: 0,
            reset_at: now_ms.saturating_add(i64::try_from(config.window_ms).unwrap_or(i64::MAX)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl RateLimitConfig {
    /// 每小时 5 个 bug
    pub const CREATE_BUG: Self = Self::new(5, 60 * 60 * 1000);
    /// 每小时 3 个功能建议
    pub const CREATE_FEATURE: Self = Self::new(3, 60 * 60 * 1000);
    /// 每分钟 20 票
    pub const VOTE: Self = Self::new(20, 60 * 1000);

    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// 各动作的限流配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub create_bug: RateLimitConfig,
    pub create_feature: RateLimitConfig,
    pub vote: RateLimitConfig,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            create_bug: RateLimitConfig::CREATE_BUG,
            create_feature: RateLimitConfig::CREATE_FEATURE,
            vote: RateLimitConfig::VOTE,
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    ctx: ExecutionContext,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(ctx: ExecutionContext, clock: Arc<dyn Clock>) -> Self {
        Self { ctx, clock }
    }

    /// 检查并记录一次尝试，返回是否放行
    ///
    /// 被拒绝时不修改存储。本地存储不可用或记录损坏时放行。
    pub async fn check(&self, key: &str, config: &RateLimitConfig) -> bool {
        let Some(store) = self.ctx.store() else {
            return true;
        };

        match self.record_attempt(store, key, config).await {
            Ok(permitted) => permitted,
            Err(e) => {
                warn!("Rate limit check for '{}' failed open: {}", key, e);
                true
            }
        }
    }

    async fn record_attempt(
        &self,
        store: &dyn KeyValueStore,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<bool, StoreError> {
        let storage_key = keys::rate_limit_key(key);
        let now = self.clock.now_ms();

        let mut entry = match read_entry(store, &storage_key).await? {
            // 窗口已过期，重置
            Some(entry) if now > entry.reset_at => RateLimitEntry::fresh(now, config),
            Some(entry) => entry,
            None => RateLimitEntry::fresh(now, config),
        };

        if entry.count >= config.max_requests {
            debug!(
                "Rate limit exceeded for '{}': {}/{}",
                key, entry.count, config.max_requests
            );
            return Ok(false);
        }

        entry.count += 1;
        let json = serde_json::to_string(&entry).map_err(|source| StoreError::Malformed {
            key: storage_key.clone(),
            source,
        })?;
        store.set(&storage_key, &json).await?;

        Ok(true)
    }

    /// 距离窗口重置还剩多少毫秒；没有记录或存储不可用时为 0
    pub async fn reset_in(&self, key: &str) -> u64 {
        let Some(store) = self.ctx.store() else {
            return 0;
        };

        match read_entry(store, &keys::rate_limit_key(key)).await {
            Ok(Some(entry)) => {
                u64::try_from(entry.reset_at.saturating_sub(self.clock.now_ms())).unwrap_or(0)
            }
            Ok(None) => 0,
            Err(e) => {
                warn!("Failed to read rate limit reset for '{}': {}", key, e);
                0
            }
        }
    }
}

async fn read_entry(
    store: &dyn KeyValueStore,
    storage_key: &str,
) -> Result<Option<RateLimitEntry>, StoreError> {
    match store.get(storage_key).await? {
        Some(json) => {
            let entry = serde_json::from_str(&json).map_err(|source| StoreError::Malformed {
                key: storage_key.to_string(),
                source,
            })?;
            Ok(Some(entry))
        }
        None => Ok(None),
    }
}

/// 把剩余毫秒数格式化成可读文本
///
/// 先向上取整到秒；不足 60 秒按秒显示，否则向上取整到分钟。
pub fn format_remaining_time(ms: u64) -> String {
    let seconds = ms.div_ceil(1000);

    if seconds < 60 {
        let suffix = if seconds != 1 { "s" } else { "" };
        return format!("{} segundo{}", seconds, suffix);
    }

    let minutes = seconds.div_ceil(60);
    let suffix = if minutes != 1 { "s" } else { "" };
    format!("{} minuto{}", minutes, suffix)
}
