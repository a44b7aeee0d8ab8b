use axum::{
    Extension,
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::{TypedHeader, headers::UserAgent};

use crate::{
    AppState,
    environment::capture_environment,
    error::AppError,
    session::DeviceId,
    submission::BugForm,
    utils::success_to_api_response,
};

use super::model::viewport_from_headers;

#[axum::debug_handler]
pub async fn create_bug(
    State(state): State<AppState>,
    device: Option<Extension<DeviceId>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    Json(form): Json<BugForm>,
) -> Result<impl IntoResponse, AppError> {
    let device = device.map(|Extension(d)| d);
    let environment = capture_environment(
        user_agent.as_ref().map(|TypedHeader(ua)| ua.as_str()),
        viewport_from_headers(&headers),
    );

    let created = state
        .sessions
        .submitter(device.as_ref())
        .submit_bug(form, environment)
        .await?;

    Ok((StatusCode::CREATED, success_to_api_response(created)))
}
