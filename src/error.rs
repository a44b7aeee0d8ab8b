use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// 本地键值存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("local storage unavailable: {0}")]
    Unavailable(String),
    #[error("malformed value under `{key}`: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

/// 远程数据存储错误
#[derive(Debug, Error)]
pub enum BackendError {
    /// 违反唯一约束（例如重复投票）
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Conflict(_))
    }
}

/// 投票人账本错误
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("voter token requires device-bound storage")]
    NoDeviceStorage,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 投票流程错误，Display 文本直接展示给用户
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Não foi possível identificar este dispositivo.")]
    Ledger(#[from] LedgerError),
    #[error("Erro ao registrar voto")]
    Remote(#[source] BackendError),
    #[error("Erro ao registrar voto")]
    Aborted(#[from] tokio::task::JoinError),
}

/// 提交流程错误，Display 文本直接展示给用户
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Submissão inválida detectada.")]
    Spam,
    #[error("Muitos envios recentes. Tente novamente em {retry_in}.")]
    RateLimited { retry_in: String },
    #[error("{0}")]
    Invalid(String),
    #[error("Erro ao enviar")]
    Remote(#[from] BackendError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("feature not found")]
    FeatureNotFound,
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match &self {
            AppError::FeatureNotFound => (
                StatusCode::NOT_FOUND,
                error_codes::NOT_FOUND,
                "Funcionalidade não encontrada".to_string(),
            ),
            AppError::Submit(e) => match e {
                SubmitError::Spam => {
                    (StatusCode::BAD_REQUEST, error_codes::SPAM_DETECTED, e.to_string())
                }
                SubmitError::RateLimited { .. } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    error_codes::RATE_LIMIT,
                    e.to_string(),
                ),
                SubmitError::Invalid(_) => (
                    StatusCode::BAD_REQUEST,
                    error_codes::VALIDATION_ERROR,
                    e.to_string(),
                ),
                SubmitError::Remote(_) => (
                    StatusCode::BAD_GATEWAY,
                    error_codes::REMOTE_ERROR,
                    e.to_string(),
                ),
            },
            AppError::Vote(VoteError::Ledger(LedgerError::NoDeviceStorage)) => (
                StatusCode::BAD_REQUEST,
                error_codes::DEVICE_REQUIRED,
                self.to_string(),
            ),
            AppError::Vote(VoteError::Ledger(_) | VoteError::Aborted(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                self.to_string(),
            ),
            AppError::Vote(VoteError::Remote(_)) => (
                StatusCode::BAD_GATEWAY,
                error_codes::REMOTE_ERROR,
                self.to_string(),
            ),
            AppError::Backend(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Erro interno do servidor".to_string(),
            ),
        };

        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}
