use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::{AppState, error::AppError, utils::success_to_api_response};

/// 正在开发中的条目
#[axum::debug_handler]
pub async fn list_roadmap(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let items = state.sessions.backend().list_roadmap().await?;
    Ok((StatusCode::OK, success_to_api_response(items)))
}
