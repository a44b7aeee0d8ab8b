use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use super::{KeyValueStore, keys};
use crate::error::StoreError;

/// 以 Redis 为后端、按设备隔离命名空间的键值存储
///
/// 值永久保存（不设置过期），与浏览器本地存储的语义一致。
#[derive(Clone)]
pub struct RedisStore {
    redis: Arc<RedisClient>,
    namespace: String,
}

impl RedisStore {
    pub fn for_device(redis: Arc<RedisClient>, device_id: &str) -> Self {
        Self {
            redis,
            namespace: keys::device_namespace(device_id),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(self.scoped(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn.set(self.scoped(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn.del(self.scoped(key)).await?;
        Ok(())
    }
}
