use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::session::DeviceId;
use crate::utils::{error_codes, error_to_api_response};

pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// 解析设备标识并放入请求扩展；缺失时按无设备上下文继续处理
pub async fn device_context(mut req: Request<Body>, next: Next) -> Response {
    let raw = req
        .headers()
        .get(DEVICE_ID_HEADER)
        .map(|h| h.to_str().unwrap_or_default().to_string());

    if let Some(raw) = raw {
        match DeviceId::parse(&raw) {
            Some(device) => {
                tracing::debug!("device: {}", device.as_str());
                req.extensions_mut().insert(device);
            }
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    error_to_api_response::<()>(
                        error_codes::VALIDATION_ERROR,
                        "Identificador de dispositivo inválido".to_string(),
                    ),
                )
                    .into_response();
            }
        }
    }

    next.run(req).await
}
