// 本地持久化存储
// 限流器与投票人账本只通过 KeyValueStore 访问设备状态

pub mod keys;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// 设备作用域的字符串键值存储
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
