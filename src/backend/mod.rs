// 远程数据存储
// 反馈记录与票数的权威来源，本地状态只是它的缓存

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::{
    CreatedBug, DevelopmentItem, FeatureSort, FeatureWithVotes, NewBug, NewFeature, NewVote,
};

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

#[async_trait]
pub trait FeedbackBackend: Send + Sync {
    async fn insert_bug(&self, bug: &NewBug) -> Result<CreatedBug, BackendError>;

    /// 返回新功能建议的 id
    async fn insert_feature(&self, feature: &NewFeature) -> Result<String, BackendError>;

    /// 重复的 (feature_id, voter_token) 返回 `BackendError::Conflict`
    async fn insert_vote(&self, vote: &NewVote) -> Result<(), BackendError>;

    /// 公开的功能建议（不含 hidden）
    async fn list_features(&self, sort: FeatureSort)
    -> Result<Vec<FeatureWithVotes>, BackendError>;

    /// 活跃的路线图条目，按 order_index 升序
    async fn list_roadmap(&self) -> Result<Vec<DevelopmentItem>, BackendError>;
}
