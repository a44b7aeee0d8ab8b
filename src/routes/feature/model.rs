use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{FeatureSort, FeatureStatus, FeatureWithVotes};
use crate::voting::{VoteOutcome, VoteRejection, VoteState};
use crate::rate_limit::format_remaining_time;

#[derive(Debug, Default, Deserialize)]
pub struct FeatureQuery {
    #[serde(default)]
    pub sort: FeatureSort,
    pub search: Option<String>,
}

impl FeatureQuery {
    /// 标题或描述包含搜索词（不区分大小写）
    pub fn matches(&self, feature: &FeatureWithVotes) -> bool {
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                feature.title.to_lowercase().contains(&term)
                    || feature.description.to_lowercase().contains(&term)
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub votes: i64,
    pub voted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreateFeatureResponse {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    Recorded,
    AlreadyRecorded,
    AlreadyVoted,
    InFlight,
    RateLimited,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub status: VoteStatus,
    pub votes: Option<i64>,
    pub voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_in: Option<String>,
}

impl VoteResponse {
    pub fn new(outcome: VoteOutcome, votes: Option<i64>, state: VoteState) -> Self {
        let (status, retry_in) = match outcome {
            VoteOutcome::Recorded => (VoteStatus::Recorded, None),
            VoteOutcome::AlreadyRecorded => (VoteStatus::AlreadyRecorded, None),
            VoteOutcome::Rejected(VoteRejection::AlreadyVoted) => (VoteStatus::AlreadyVoted, None),
            VoteOutcome::Rejected(VoteRejection::InFlight) => (VoteStatus::InFlight, None),
            VoteOutcome::Rejected(VoteRejection::RateLimited { retry_in_ms }) => (
                VoteStatus::RateLimited,
                Some(format_remaining_time(retry_in_ms)),
            ),
        };

        Self {
            status,
            votes,
            voted: state != VoteState::Unvoted,
            retry_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(title: &str, description: &str) -> FeatureWithVotes {
        FeatureWithVotes {
            id: "f".into(),
            title: title.into(),
            description: description.into(),
            status: FeatureStatus::Open,
            votes: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let query = FeatureQuery {
            search: Some("ESCURO".into()),
            ..Default::default()
        };
        assert!(query.matches(&feature("Modo escuro", "")));
        assert!(query.matches(&feature("Tema", "um tema escuro")));
        assert!(!query.matches(&feature("Exportar CSV", "planilhas")));
        assert!(FeatureQuery::default().matches(&feature("x", "y")));
    }

    #[test]
    fn rate_limited_vote_reports_retry_time() {
        let response = VoteResponse::new(
            VoteOutcome::Rejected(VoteRejection::RateLimited { retry_in_ms: 30_000 }),
            Some(3),
            VoteState::Unvoted,
        );
        assert_eq!(response.status, VoteStatus::RateLimited);
        assert_eq!(response.retry_in.as_deref(), Some("30 segundos"));
        assert!(!response.voted);
    }
}
