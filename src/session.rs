// 设备会话
// 按设备标识分配本地存储与投票看板

use std::sync::Arc;
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use redis::Client as RedisClient;

use crate::backend::FeedbackBackend;
use crate::clock::Clock;
use crate::context::ExecutionContext;
use crate::rate_limit::{RateLimiter, RateLimits};
use crate::storage::{MemoryStore, RedisStore};
use crate::submission::Submitter;
use crate::voting::OptimisticVoter;

/// 请求携带的设备标识
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// 只接受 1..=128 个字母、数字、`-`、`_`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= 128
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| DeviceId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 会话缓存上限：最多保留的设备数与空闲过期时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_devices: u64,
    pub idle: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_devices: 10_000,
            idle: Duration::from_secs(30 * 60),
        }
    }
}

/// 设备标识来自请求头，缓存必须有界。
///
/// 被淘汰的看板不影响进行中的投票：远程写入任务持有自己的看板引用，
/// 新建的看板通过持久化的已投票集合拒绝重复投票。
pub struct DeviceSessions {
    redis: Option<Arc<RedisClient>>,
    backend: Arc<dyn FeedbackBackend>,
    clock: Arc<dyn Clock>,
    limits: RateLimits,
    memory_stores: Cache<DeviceId, MemoryStore>,
    voters: Cache<DeviceId, Arc<OptimisticVoter>>,
}

fn bounded<V>(limits: SessionLimits) -> Cache<DeviceId, V>
where
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(limits.max_devices)
        .time_to_idle(limits.idle)
        .eviction_policy(EvictionPolicy::lru())
        .build()
}

impl DeviceSessions {
    pub fn new(
        redis: Option<Arc<RedisClient>>,
        backend: Arc<dyn FeedbackBackend>,
        clock: Arc<dyn Clock>,
        limits: RateLimits,
        session_limits: SessionLimits,
    ) -> Self {
        Self {
            redis,
            backend,
            clock,
            limits,
            memory_stores: bounded(session_limits),
            voters: bounded(session_limits),
        }
    }

    pub fn backend(&self) -> &Arc<dyn FeedbackBackend> {
        &self.backend
    }

    /// 有设备标识时返回设备上下文，否则为 Detached
    pub fn context(&self, device: Option<&DeviceId>) -> ExecutionContext {
        let Some(device) = device else {
            return ExecutionContext::Detached;
        };

        match &self.redis {
            Some(redis) => ExecutionContext::device(RedisStore::for_device(
                redis.clone(),
                device.as_str(),
            )),
            None => ExecutionContext::device(
                self.memory_stores
                    .get_with(device.clone(), MemoryStore::default),
            ),
        }
    }

    /// 设备的投票流程；同一设备复用同一个看板，保证进行中标记跨请求生效
    pub fn voter(&self, device: Option<&DeviceId>) -> Arc<OptimisticVoter> {
        let Some(device) = device else {
            return Arc::new(self.new_voter(ExecutionContext::Detached));
        };

        self.voters.get_with(device.clone(), || {
            Arc::new(self.new_voter(self.context(Some(device))))
        })
    }

    fn new_voter(&self, ctx: ExecutionContext) -> OptimisticVoter {
        OptimisticVoter::new(
            ctx,
            self.clock.clone(),
            self.backend.clone(),
            self.limits.vote,
        )
    }

    pub fn submitter(&self, device: Option<&DeviceId>) -> Submitter {
        Submitter::new(
            RateLimiter::new(self.context(device), self.clock.clone()),
            self.backend.clone(),
            self.limits,
        )
    }
}
