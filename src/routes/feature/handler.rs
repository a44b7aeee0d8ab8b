use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::AppError,
    models::FeatureSort,
    session::DeviceId,
    submission::FeatureForm,
    utils::success_to_api_response,
    voting::VoteState,
};

use super::model::{CreateFeatureResponse, FeatureQuery, FeatureView, VoteResponse};

#[axum::debug_handler]
pub async fn list_features(
    State(state): State<AppState>,
    device: Option<Extension<DeviceId>>,
    Query(query): Query<FeatureQuery>,
) -> Result<impl IntoResponse, AppError> {
    let device = device.map(|Extension(d)| d);
    let features = state.sessions.backend().list_features(query.sort).await?;

    let voter = state.sessions.voter(device.as_ref());
    voter.load(&features).await;

    let views: Vec<FeatureView> = features
        .into_iter()
        .filter(|f| query.matches(f))
        .map(|f| FeatureView {
            votes: voter.displayed_votes(&f.id).unwrap_or(f.votes),
            voted: voter.state(&f.id) != VoteState::Unvoted,
            id: f.id,
            title: f.title,
            description: f.description,
            status: f.status,
            created_at: f.created_at,
        })
        .collect();

    Ok((StatusCode::OK, success_to_api_response(views)))
}

#[axum::debug_handler]
pub async fn create_feature(
    State(state): State<AppState>,
    device: Option<Extension<DeviceId>>,
    Json(form): Json<FeatureForm>,
) -> Result<impl IntoResponse, AppError> {
    let device = device.map(|Extension(d)| d);
    let id = state
        .sessions
        .submitter(device.as_ref())
        .submit_feature(form)
        .await?;

    Ok((
        StatusCode::CREATED,
        success_to_api_response(CreateFeatureResponse { id }),
    ))
}

#[axum::debug_handler]
pub async fn vote(
    State(state): State<AppState>,
    device: Option<Extension<DeviceId>>,
    Path(feature_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let device = device.map(|Extension(d)| d);
    let voter = state.sessions.voter(device.as_ref());

    // 看板里还没有这个功能时先从远程加载
    if voter.displayed_votes(&feature_id).is_none() {
        let features = state
            .sessions
            .backend()
            .list_features(FeatureSort::Votes)
            .await?;
        voter.load(&features).await;
        if voter.displayed_votes(&feature_id).is_none() {
            return Err(AppError::FeatureNotFound);
        }
    }

    let outcome = voter.vote(&feature_id).await?;
    let response = VoteResponse::new(
        outcome,
        voter.displayed_votes(&feature_id),
        voter.state(&feature_id),
    );

    Ok((StatusCode::OK, success_to_api_response(response)))
}
