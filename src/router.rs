use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{device_context, log_errors},
    routes,
};

// 反馈相关的路由
fn feedback_routes() -> Router<AppState> {
    Router::new()
        .route("/bugs", post(routes::bug::create_bug))
        .route(
            "/features",
            get(routes::feature::list_features).post(routes::feature::create_feature),
        )
        .route("/features/{feature_id}/vote", post(routes::feature::vote))
        .route("/roadmap", get(routes::roadmap::list_roadmap))
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .nest(&state.config.api_base_uri, feedback_routes())
        .layer(axum::middleware::from_fn(device_context))
        .layer(axum::middleware::from_fn(log_errors));

    // 开发模式下允许所有来源
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        backend::MemoryBackend, clock::SystemClock, config::Config, models::FeatureStatus,
        session::DeviceSessions, utils::error_codes,
    };

    fn app() -> (Router, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let config = Config::default();
        let state = AppState {
            sessions: Arc::new(DeviceSessions::new(
                None,
                backend.clone(),
                Arc::new(SystemClock),
                config.rate_limits,
                config.sessions,
            )),
            config,
        };
        (create_router(state), backend)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        device: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(device) = device {
            builder = builder.header("x-device-id", device);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn vote_twice_counts_once() {
        let (app, backend) = app();
        let id = backend.seed_feature("Modo escuro", FeatureStatus::Open, 2);
        let uri = format!("/api/features/{}/vote", id);

        let (status, body) = send(&app, "POST", &uri, Some("device-1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resp_data"]["status"], "recorded");
        assert_eq!(body["resp_data"]["votes"], 3);
        assert_eq!(body["resp_data"]["voted"], true);

        let (_, body) = send(&app, "POST", &uri, Some("device-1"), None).await;
        assert_eq!(body["resp_data"]["status"], "already_voted");
        assert_eq!(body["resp_data"]["votes"], 3);
        assert_eq!(backend.vote_count(&id), 3);

        let (_, body) = send(&app, "GET", "/api/features", Some("device-1"), None).await;
        assert_eq!(body["resp_data"][0]["voted"], true);
        let (_, body) = send(&app, "GET", "/api/features", Some("device-2"), None).await;
        assert_eq!(body["resp_data"][0]["voted"], false);
        assert_eq!(body["resp_data"][0]["votes"], 3);
    }

    #[tokio::test]
    async fn vote_requires_device() {
        let (app, backend) = app();
        let id = backend.seed_feature("Modo escuro", FeatureStatus::Open, 0);

        let uri = format!("/api/features/{}/vote", id);
        let (status, body) = send(&app, "POST", &uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], error_codes::DEVICE_REQUIRED);

        let (status, body) = send(&app, "POST", &uri, Some("bad id!"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], error_codes::VALIDATION_ERROR);
        assert_eq!(backend.vote_count(&id), 0);
    }

    #[tokio::test]
    async fn vote_for_unknown_feature_is_not_found() {
        let (app, _) = app();
        let (status, body) =
            send(&app, "POST", "/api/features/nope/vote", Some("device-1"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], error_codes::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_vote_is_rolled_back() {
        let (app, backend) = app();
        let id = backend.seed_feature("Modo escuro", FeatureStatus::Open, 1);
        backend.set_fail_writes(true);

        let uri = format!("/api/features/{}/vote", id);
        let (status, body) = send(&app, "POST", &uri, Some("device-1"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], error_codes::REMOTE_ERROR);

        let (_, body) = send(&app, "GET", "/api/features", Some("device-1"), None).await;
        assert_eq!(body["resp_data"][0]["votes"], 1);
        assert_eq!(body["resp_data"][0]["voted"], false);
    }

    #[tokio::test]
    async fn feature_submissions_are_rate_limited_per_device() {
        let (app, _) = app();
        let form = json!({ "title": "Exportar CSV", "description": "Exportar relatórios" });

        for _ in 0..3 {
            let (status, _) =
                send(&app, "POST", "/api/features", Some("device-1"), Some(form.clone())).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) =
            send(&app, "POST", "/api/features", Some("device-1"), Some(form.clone())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], error_codes::RATE_LIMIT);
        assert!(
            body["msg"]
                .as_str()
                .unwrap()
                .starts_with("Muitos envios recentes. Tente novamente em ")
        );

        let (status, _) = send(&app, "POST", "/api/features", Some("device-2"), Some(form)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn honeypot_blocks_bug_submission() {
        let (app, _) = app();
        let form = json!({
            "title": "Erro ao salvar",
            "description": "Nada acontece",
            "website_url": "http://spam.example"
        });

        let (status, body) = send(&app, "POST", "/api/bugs", Some("device-1"), Some(form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], error_codes::SPAM_DETECTED);
    }

    #[tokio::test]
    async fn bug_submission_returns_public_id() {
        let (app, _) = app();
        let form = json!({
            "title": "Erro ao salvar",
            "description": "Nada acontece",
            "severity": "high",
            "module": "Financeiro"
        });

        let (status, body) = send(&app, "POST", "/api/bugs", None, Some(form)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["code"], 0);
        assert_eq!(body["resp_data"]["public_id"], "BUG-00001");
    }

    #[tokio::test]
    async fn listing_filters_by_search() {
        let (app, backend) = app();
        backend.seed_feature("Modo escuro", FeatureStatus::Open, 0);
        backend.seed_feature("Exportar CSV", FeatureStatus::Planned, 0);
        backend.seed_feature("Oculta", FeatureStatus::Hidden, 0);

        let (_, body) = send(&app, "GET", "/api/features?search=csv", None, None).await;
        let items = body["resp_data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Exportar CSV");

        let (_, body) = send(&app, "GET", "/api/features?sort=recent", None, None).await;
        assert_eq!(body["resp_data"].as_array().unwrap().len(), 2);
    }
}
