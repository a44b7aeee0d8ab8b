// 反馈门户数据模型
// 与托管数据库中的表结构一一对应

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 可选的模块名称
pub const MODULES: [&str; 5] = ["Financeiro", "Tarefas", "Relatórios", "Integrações", "Outro"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugSeverity {
    Low,
    Medium,
    High,
}

impl BugSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            BugSeverity::Low => "low",
            BugSeverity::Medium => "medium",
            BugSeverity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugStatus {
    New,
    Triaged,
    InProgress,
    Resolved,
    WontFix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Open,
    Planned,
    InDev,
    Shipped,
    Rejected,
    Hidden,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureStatus::Open => "open",
            FeatureStatus::Planned => "planned",
            FeatureStatus::InDev => "in_dev",
            FeatureStatus::Shipped => "shipped",
            FeatureStatus::Rejected => "rejected",
            FeatureStatus::Hidden => "hidden",
        }
    }
}

impl FromStr for FeatureStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(FeatureStatus::Open),
            "planned" => Ok(FeatureStatus::Planned),
            "in_dev" => Ok(FeatureStatus::InDev),
            "shipped" => Ok(FeatureStatus::Shipped),
            "rejected" => Ok(FeatureStatus::Rejected),
            "hidden" => Ok(FeatureStatus::Hidden),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

/// 提交 bug 时自动采集的用户环境
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugEnvironment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// 新 bug（不含自动生成字段）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBug {
    pub title: String,
    pub description: String,
    pub repro_steps: Option<String>,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub module: Option<String>,
    pub severity: Option<BugSeverity>,
    pub environment: Option<BugEnvironment>,
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBug {
    pub bug_id: String,
    pub public_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeature {
    pub title: String,
    pub description: String,
}

/// 带票数的功能建议
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureWithVotes {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub votes: i64,
    pub created_at: DateTime<Utc>,
}

/// 投票记录，(feature_id, voter_token) 唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVote {
    pub feature_id: String,
    pub voter_token: String,
}

/// 路线图条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub link: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSort {
    #[default]
    Votes,
    Recent,
}
