//! 乐观投票
//!
//! 每个功能在客户端视角下是一个小状态机：
//!
//! ```text
//! Unvoted --投票--> Voting --成功/重复--> Voted
//!                      \--其它失败--> Unvoted（回滚）
//! ```
//!
//! `Voting` 只阻止同一功能的重入，不同功能可以同时投票。进行中标记由
//! `InFlightGuard` 持有，任何退出路径都会释放。远程写入在独立任务中执行，
//! 请求被取消也会走到成功、重复或回滚之一。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::backend::FeedbackBackend;
use crate::clock::Clock;
use crate::context::ExecutionContext;
use crate::error::VoteError;
use crate::ledger::VoterLedger;
use crate::models::{FeatureWithVotes, NewVote};
use crate::rate_limit::{RateLimitConfig, RateLimiter, actions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Unvoted,
    Voting,
    Voted,
}

/// 本地拒绝投票的原因，不涉及远程调用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRejection {
    AlreadyVoted,
    InFlight,
    RateLimited { retry_in_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// 远程写入成功
    Recorded,
    /// 远程已存在该设备的投票，按成功处理
    AlreadyRecorded,
    Rejected(VoteRejection),
}

/// 展示用的票数与投票状态
#[derive(Debug, Default)]
pub struct VoteBoard {
    counts: HashMap<String, i64>,
    voted: HashSet<String>,
    in_flight: HashSet<String>,
}

impl VoteBoard {
    /// 用远程票数和本地已投集合刷新；进行中的功能保持不变
    pub fn refresh<I>(&mut self, features: &[FeatureWithVotes], voted: I)
    where
        I: IntoIterator<Item = String>,
    {
        for feature in features {
            if !self.in_flight.contains(&feature.id) {
                self.counts.insert(feature.id.clone(), feature.votes);
            }
        }

        let mut mirror: HashSet<String> = voted.into_iter().collect();
        for id in &self.in_flight {
            if self.voted.contains(id) {
                mirror.insert(id.clone());
            } else {
                mirror.remove(id);
            }
        }
        self.voted = mirror;
    }

    pub fn count(&self, feature_id: &str) -> Option<i64> {
        self.counts.get(feature_id).copied()
    }

    pub fn state(&self, feature_id: &str) -> VoteState {
        if self.in_flight.contains(feature_id) {
            VoteState::Voting
        } else if self.voted.contains(feature_id) {
            VoteState::Voted
        } else {
            VoteState::Unvoted
        }
    }

    fn apply_optimistic(&mut self, feature_id: &str) {
        *self.counts.entry(feature_id.to_string()).or_insert(0) += 1;
        self.voted.insert(feature_id.to_string());
    }

    fn roll_back(&mut self, feature_id: &str) {
        if let Some(count) = self.counts.get_mut(feature_id) {
            *count -= 1;
        }
        self.voted.remove(feature_id);
    }
}

fn lock(board: &Mutex<VoteBoard>) -> MutexGuard<'_, VoteBoard> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 进行中标记，析构时释放
struct InFlightGuard {
    board: Arc<Mutex<VoteBoard>>,
    feature_id: String,
}

impl InFlightGuard {
    /// 功能处于 Unvoted 时占用进行中标记
    fn acquire(board: &Arc<Mutex<VoteBoard>>, feature_id: &str) -> Result<Self, VoteRejection> {
        let mut guard = lock(board);
        match guard.state(feature_id) {
            VoteState::Voted => return Err(VoteRejection::AlreadyVoted),
            VoteState::Voting => return Err(VoteRejection::InFlight),
            VoteState::Unvoted => {}
        }
        guard.in_flight.insert(feature_id.to_string());

        Ok(Self {
            board: board.clone(),
            feature_id: feature_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.board).in_flight.remove(&self.feature_id);
    }
}

/// 组合限流器、投票人账本和远程存储的投票流程
pub struct OptimisticVoter {
    limiter: RateLimiter,
    ledger: VoterLedger,
    backend: Arc<dyn FeedbackBackend>,
    vote_limit: RateLimitConfig,
    board: Arc<Mutex<VoteBoard>>,
}

impl OptimisticVoter {
    pub fn new(
        ctx: ExecutionContext,
        clock: Arc<dyn Clock>,
        backend: Arc<dyn FeedbackBackend>,
        vote_limit: RateLimitConfig,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(ctx.clone(), clock),
            ledger: VoterLedger::new(ctx),
            backend,
            vote_limit,
            board: Arc::new(Mutex::new(VoteBoard::default())),
        }
    }

    pub fn ledger(&self) -> &VoterLedger {
        &self.ledger
    }

    /// 用远程列表刷新展示状态
    pub async fn load(&self, features: &[FeatureWithVotes]) {
        let voted = self.ledger.voted_features().await;
        lock(&self.board).refresh(features, voted);
    }

    pub fn displayed_votes(&self, feature_id: &str) -> Option<i64> {
        lock(&self.board).count(feature_id)
    }

    pub fn state(&self, feature_id: &str) -> VoteState {
        lock(&self.board).state(feature_id)
    }

    pub async fn vote(&self, feature_id: &str) -> Result<VoteOutcome, VoteError> {
        let in_flight = match InFlightGuard::acquire(&self.board, feature_id) {
            Ok(guard) => guard,
            Err(rejection) => {
                debug!("Vote for {} rejected locally: {:?}", feature_id, rejection);
                return Ok(VoteOutcome::Rejected(rejection));
            }
        };

        // 看板可能落后于持久化集合（同一存储上的其它实例已投票）
        if self.ledger.has_voted(feature_id).await {
            lock(&self.board).voted.insert(feature_id.to_string());
            debug!("Vote for {} already in persisted voted set", feature_id);
            return Ok(VoteOutcome::Rejected(VoteRejection::AlreadyVoted));
        }

        if !self.limiter.check(actions::VOTE, &self.vote_limit).await {
            let retry_in_ms = self.limiter.reset_in(actions::VOTE).await;
            debug!("Vote for {} rate limited for {}ms", feature_id, retry_in_ms);
            return Ok(VoteOutcome::Rejected(VoteRejection::RateLimited {
                retry_in_ms,
            }));
        }

        let voter_token = self.ledger.voter_token().await?;

        lock(&self.board).apply_optimistic(feature_id);

        // 远程写入一旦开始必须走完，调用方被取消时任务继续执行并完成回滚
        let task = RemoteVote {
            ledger: self.ledger.clone(),
            backend: self.backend.clone(),
            board: self.board.clone(),
            vote: NewVote {
                feature_id: feature_id.to_string(),
                voter_token,
            },
            _in_flight: in_flight,
        };
        tokio::spawn(task.run()).await?
    }
}

/// 乐观更新之后的远程写入与收尾，持有进行中标记直到结束
struct RemoteVote {
    ledger: VoterLedger,
    backend: Arc<dyn FeedbackBackend>,
    board: Arc<Mutex<VoteBoard>>,
    vote: NewVote,
    _in_flight: InFlightGuard,
}

impl RemoteVote {
    async fn run(self) -> Result<VoteOutcome, VoteError> {
        let feature_id = self.vote.feature_id.as_str();

        if let Err(e) = self.ledger.mark_voted(feature_id).await {
            warn!("Failed to persist vote mark for {}: {}", feature_id, e);
        }

        match self.backend.insert_vote(&self.vote).await {
            Ok(()) => Ok(VoteOutcome::Recorded),
            Err(e) if e.is_conflict() => {
                debug!("Vote for {} already recorded remotely", feature_id);
                Ok(VoteOutcome::AlreadyRecorded)
            }
            Err(e) => {
                error!("Vote for {} failed, rolling back: {}", feature_id, e);
                lock(&self.board).roll_back(feature_id);
                if let Err(e) = self.ledger.forget_vote(feature_id).await {
                    warn!("Failed to clear vote mark for {}: {}", feature_id, e);
                }
                Err(VoteError::Remote(e))
            }
        }
    }
}
