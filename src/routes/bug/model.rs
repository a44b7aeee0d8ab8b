use axum::http::HeaderMap;

pub const VIEWPORT_HEADER: &str = "x-viewport";

/// 解析 `x-viewport: 1280x720`
pub fn viewport_from_headers(headers: &HeaderMap) -> Option<(u32, u32)> {
    let raw = headers.get(VIEWPORT_HEADER)?.to_str().ok()?;
    let (w, h) = raw.trim().split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}
