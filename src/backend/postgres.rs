use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use super::FeedbackBackend;
use crate::error::BackendError;
use crate::models::{
    CreatedBug, DevelopmentItem, FeatureSort, FeatureStatus, FeatureWithVotes, NewBug, NewFeature,
    NewVote,
};

/// 功能建议查询结果
#[derive(Debug, FromRow)]
struct FeatureRow {
    id: String,
    title: String,
    description: String,
    status: String,
    votes: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<FeatureRow> for FeatureWithVotes {
    type Error = BackendError;

    fn try_from(row: FeatureRow) -> Result<Self, Self::Error> {
        let status: FeatureStatus = row
            .status
            .parse()
            .map_err(|e| BackendError::Database(sqlx::Error::Decode(Box::new(e))))?;
        Ok(FeatureWithVotes {
            id: row.id,
            title: row.title,
            description: row.description,
            status,
            votes: row.votes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DevelopmentItemRow {
    id: String,
    title: String,
    description: Option<String>,
    order_index: i32,
    link: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<DevelopmentItemRow> for DevelopmentItem {
    fn from(row: DevelopmentItemRow) -> Self {
        DevelopmentItem {
            id: row.id,
            title: row.title,
            description: row.description,
            order_index: row.order_index,
            link: row.link,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

const FEATURES_BY_VOTES: &str = r#"
    SELECT f.id::text AS id, f.title, f.description, f.status::text AS status,
           COUNT(v.id) AS votes, f.created_at
    FROM feature_requests f
    LEFT JOIN feature_votes v ON v.feature_id = f.id
    WHERE f.status <> 'hidden'
    GROUP BY f.id
    ORDER BY votes DESC, f.created_at DESC
"#;

const FEATURES_BY_RECENT: &str = r#"
    SELECT f.id::text AS id, f.title, f.description, f.status::text AS status,
           COUNT(v.id) AS votes, f.created_at
    FROM feature_requests f
    LEFT JOIN feature_votes v ON v.feature_id = f.id
    WHERE f.status <> 'hidden'
    GROUP BY f.id
    ORDER BY f.created_at DESC
"#;

/// 基于 Postgres 的远程存储
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 把唯一约束冲突映射为 `Conflict`
fn map_insert_error(e: sqlx::Error) -> BackendError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            BackendError::Conflict(db.message().to_string())
        }
        _ => BackendError::Database(e),
    }
}

#[async_trait]
impl FeedbackBackend for PgBackend {
    async fn insert_bug(&self, bug: &NewBug) -> Result<CreatedBug, BackendError> {
        let (bug_id, public_id): (String, String) = sqlx::query_as(
            r#"
            INSERT INTO bugs (title, description, repro_steps, expected_result, actual_result,
                              module, severity, environment, page_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id::text, public_id
            "#,
        )
        .bind(&bug.title)
        .bind(&bug.description)
        .bind(&bug.repro_steps)
        .bind(&bug.expected_result)
        .bind(&bug.actual_result)
        .bind(&bug.module)
        .bind(bug.severity.map(|s| s.as_str()))
        .bind(bug.environment.as_ref().map(Json))
        .bind(&bug.page_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        tracing::info!("Created bug {}", public_id);
        Ok(CreatedBug { bug_id, public_id })
    }

    async fn insert_feature(&self, feature: &NewFeature) -> Result<String, BackendError> {
        let (id,): (String,) = sqlx::query_as(
            r#"
            INSERT INTO feature_requests (title, description)
            VALUES ($1, $2)
            RETURNING id::text
            "#,
        )
        .bind(&feature.title)
        .bind(&feature.description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        tracing::info!("Created feature request {}", id);
        Ok(id)
    }

    async fn insert_vote(&self, vote: &NewVote) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            INSERT INTO feature_votes (feature_id, voter_token)
            VALUES ($1::uuid, $2)
            "#,
        )
        .bind(&vote.feature_id)
        .bind(&vote.voter_token)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn list_features(
        &self,
        sort: FeatureSort,
    ) -> Result<Vec<FeatureWithVotes>, BackendError> {
        let query = match sort {
            FeatureSort::Votes => FEATURES_BY_VOTES,
            FeatureSort::Recent => FEATURES_BY_RECENT,
        };

        let rows: Vec<FeatureRow> = sqlx::query_as(query).fetch_all(&self.pool).await?;
        rows.into_iter().map(FeatureWithVotes::try_from).collect()
    }

    async fn list_roadmap(&self) -> Result<Vec<DevelopmentItem>, BackendError> {
        let rows: Vec<DevelopmentItemRow> = sqlx::query_as(
            r#"
            SELECT id::text AS id, title, description, order_index, link, is_active, created_at
            FROM development_items
            WHERE is_active = true
            ORDER BY order_index ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DevelopmentItem::from).collect())
    }
}
