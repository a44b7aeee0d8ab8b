//! 投票人账本
//!
//! 每个设备一个匿名投票人令牌，以及该设备已投票的功能集合。集合只是本地缓存，
//! 真正防止重复投票的是远程存储上的唯一约束。

use std::collections::BTreeSet;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::error::{LedgerError, StoreError};
use crate::storage::{KeyValueStore, keys};

#[derive(Debug, Clone)]
pub struct VoterLedger {
    ctx: ExecutionContext,
}

impl VoterLedger {
    pub fn new(ctx: ExecutionContext) -> Self {
        Self { ctx }
    }

    /// 获取或创建设备的投票人令牌（128 位随机 UUID）
    pub async fn voter_token(&self) -> Result<String, LedgerError> {
        let store = self.ctx.store().ok_or(LedgerError::NoDeviceStorage)?;

        if let Some(token) = store.get(keys::VOTER_TOKEN_KEY).await? {
            if !token.is_empty() {
                return Ok(token);
            }
        }

        let token = Uuid::new_v4().to_string();
        store.set(keys::VOTER_TOKEN_KEY, &token).await?;
        debug!("Created voter token for device");

        Ok(token)
    }

    /// 已投票的功能集合；缺失、损坏或不可用时返回空集合
    pub async fn voted_features(&self) -> BTreeSet<String> {
        let Some(store) = self.ctx.store() else {
            return BTreeSet::new();
        };

        match read_voted(store).await {
            Ok(set) => set,
            Err(e) => {
                warn!("Voted feature set unreadable, treating as empty: {}", e);
                BTreeSet::new()
            }
        }
    }

    pub async fn has_voted(&self, feature_id: &str) -> bool {
        self.voted_features().await.contains(feature_id)
    }

    /// 标记为已投票（幂等并集）。非设备上下文中什么都不做。
    pub async fn mark_voted(&self, feature_id: &str) -> Result<(), LedgerError> {
        let Some(store) = self.ctx.store() else {
            return Ok(());
        };

        let mut voted = self.voted_features().await;
        if voted.insert(feature_id.to_string()) {
            write_voted(store, &voted).await?;
        }
        Ok(())
    }

    /// 回滚乐观投票时撤销本地标记
    pub(crate) async fn forget_vote(&self, feature_id: &str) -> Result<(), LedgerError> {
        let Some(store) = self.ctx.store() else {
            return Ok(());
        };

        let mut voted = self.voted_features().await;
        if voted.remove(feature_id) {
            write_voted(store, &voted).await?;
        }
        Ok(())
    }
}

async fn read_voted(store: &dyn KeyValueStore) -> Result<BTreeSet<String>, StoreError> {
    let Some(json) = store.get(keys::VOTED_FEATURES_KEY).await? else {
        return Ok(BTreeSet::new());
    };

    // 只接受字符串数组，其它形状一律当作空集合
    let value: serde_json::Value =
        serde_json::from_str(&json).map_err(|source| StoreError::Malformed {
            key: keys::VOTED_FEATURES_KEY.to_string(),
            source,
        })?;

    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(id) => Some(id),
                _ => None,
            })
            .collect(),
        _ => BTreeSet::new(),
    })
}

async fn write_voted(store: &dyn KeyValueStore, voted: &BTreeSet<String>) -> Result<(), StoreError> {
    let json = serde_json::to_string(voted).map_err(|source| StoreError::Malformed {
        key: keys::VOTED_FEATURES_KEY.to_string(),
        source,
    })?;
    store.set(keys::VOTED_FEATURES_KEY, &json).await
}
