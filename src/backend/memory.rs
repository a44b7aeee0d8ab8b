use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::FeedbackBackend;
use crate::error::BackendError;
use crate::models::{
    BugStatus, CreatedBug, DevelopmentItem, FeatureSort, FeatureStatus, FeatureWithVotes, NewBug,
    NewFeature, NewVote,
};

struct StoredBug {
    bug: NewBug,
    status: BugStatus,
}

struct StoredFeature {
    feature: FeatureWithVotes,
    seq: u64,
}

#[derive(Default)]
struct MemoryData {
    bugs: HashMap<String, StoredBug>,
    features: HashMap<String, StoredFeature>,
    votes: HashSet<(String, String)>,
    roadmap: Vec<DevelopmentItem>,
    seq: u64,
}

/// 进程内远程存储
///
/// 未配置 DATABASE_URL 时使用，同时是测试替身；`(feature_id, voter_token)`
/// 唯一约束与数据库行为一致。
#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<MemoryData>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryData>, BackendError> {
        self.data
            .lock()
            .map_err(|_| BackendError::Unavailable("memory backend poisoned".into()))
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }

    /// 让后续写操作全部失败，模拟远程不可用
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 直接写入一条功能建议，返回 id
    pub fn seed_feature(&self, title: &str, status: FeatureStatus, votes: i64) -> String {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.seq += 1;
        let seq = data.seq;
        let id = Uuid::new_v4().to_string();
        for n in 0..votes {
            data.votes.insert((id.clone(), format!("seed-{}", n)));
        }
        data.features.insert(
            id.clone(),
            StoredFeature {
                feature: FeatureWithVotes {
                    id: id.clone(),
                    title: title.to_string(),
                    description: String::new(),
                    status,
                    votes: 0,
                    created_at: Utc::now(),
                },
                seq,
            },
        );
        id
    }

    pub fn add_roadmap_item(&self, item: DevelopmentItem) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.roadmap.push(item);
    }

    pub fn vote_count(&self, feature_id: &str) -> usize {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.votes.iter().filter(|(id, _)| id == feature_id).count()
    }

    pub fn stored_bug(&self, bug_id: &str) -> Option<(NewBug, BugStatus)> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.bugs
            .get(bug_id)
            .map(|stored| (stored.bug.clone(), stored.status))
    }
}

#[async_trait]
impl FeedbackBackend for MemoryBackend {
    async fn insert_bug(&self, bug: &NewBug) -> Result<CreatedBug, BackendError> {
        self.check_writable()?;
        let mut data = self.lock()?;

        let bug_id = Uuid::new_v4().to_string();
        let public_id = format!("BUG-{:05}", data.bugs.len() + 1);
        data.bugs.insert(
            bug_id.clone(),
            StoredBug {
                bug: bug.clone(),
                status: BugStatus::New,
            },
        );

        Ok(CreatedBug { bug_id, public_id })
    }

    async fn insert_feature(&self, feature: &NewFeature) -> Result<String, BackendError> {
        self.check_writable()?;
        let mut data = self.lock()?;

        data.seq += 1;
        let seq = data.seq;
        let id = Uuid::new_v4().to_string();
        data.features.insert(
            id.clone(),
            StoredFeature {
                feature: FeatureWithVotes {
                    id: id.clone(),
                    title: feature.title.clone(),
                    description: feature.description.clone(),
                    status: FeatureStatus::Open,
                    votes: 0,
                    created_at: Utc::now(),
                },
                seq,
            },
        );

        Ok(id)
    }

    async fn insert_vote(&self, vote: &NewVote) -> Result<(), BackendError> {
        self.check_writable()?;
        let mut data = self.lock()?;

        if !data.features.contains_key(&vote.feature_id) {
            return Err(BackendError::NotFound(vote.feature_id.clone()));
        }
        if !data
            .votes
            .insert((vote.feature_id.clone(), vote.voter_token.clone()))
        {
            return Err(BackendError::Conflict(format!(
                "feature_votes({}, {})",
                vote.feature_id, vote.voter_token
            )));
        }

        Ok(())
    }

    async fn list_features(
        &self,
        sort: FeatureSort,
    ) -> Result<Vec<FeatureWithVotes>, BackendError> {
        let data = self.lock()?;

        let mut rows: Vec<(u64, FeatureWithVotes)> = data
            .features
            .values()
            .filter(|stored| stored.feature.status != FeatureStatus::Hidden)
            .map(|stored| {
                let mut feature = stored.feature.clone();
                feature.votes = data
                    .votes
                    .iter()
                    .filter(|(id, _)| *id == feature.id)
                    .count() as i64;
                (stored.seq, feature)
            })
            .collect();

        match sort {
            FeatureSort::Votes => {
                rows.sort_by(|a, b| b.1.votes.cmp(&a.1.votes).then(b.0.cmp(&a.0)))
            }
            FeatureSort::Recent => rows.sort_by(|a, b| b.0.cmp(&a.0)),
        }

        Ok(rows.into_iter().map(|(_, feature)| feature).collect())
    }

    async fn list_roadmap(&self) -> Result<Vec<DevelopmentItem>, BackendError> {
        let data = self.lock()?;
        let mut items: Vec<DevelopmentItem> =
            data.roadmap.iter().filter(|item| item.is_active).cloned().collect();
        items.sort_by_key(|item| item.order_index);
        Ok(items)
    }
}
