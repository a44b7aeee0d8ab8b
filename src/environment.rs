use crate::models::BugEnvironment;

const UNKNOWN: &str = "Desconhecido";

/// 从 User-Agent 与视口尺寸推断用户环境
///
/// 规则按顺序匹配，先命中者为准。
pub fn capture_environment(user_agent: Option<&str>, viewport: Option<(u32, u32)>) -> BugEnvironment {
    let Some(ua) = user_agent else {
        return BugEnvironment {
            viewport: viewport.map(|(w, h)| format!("{}x{}", w, h)),
            device: viewport.map(|(w, _)| device_class(w).to_string()),
            ..Default::default()
        };
    };

    BugEnvironment {
        os: Some(os_from_user_agent(ua).to_string()),
        browser: Some(browser_from_user_agent(ua).to_string()),
        device: Some(viewport.map_or(UNKNOWN, |(w, _)| device_class(w)).to_string()),
        app_version: None,
        viewport: viewport.map(|(w, h)| format!("{}x{}", w, h)),
        user_agent: Some(ua.to_string()),
    }
}

pub fn os_from_user_agent(ua: &str) -> &'static str {
    if ua.contains("Win") {
        "Windows"
    } else if ua.contains("Mac") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else {
        UNKNOWN
    }
}

pub fn browser_from_user_agent(ua: &str) -> &'static str {
    if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Edg") {
        "Edge"
    } else if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Safari") {
        "Safari"
    } else if ua.contains("Opera") || ua.contains("OPR") {
        "Opera"
    } else {
        UNKNOWN
    }
}

/// 按视口宽度划分设备类型
pub fn device_class(width: u32) -> &'static str {
    match width {
        0..768 => "Mobile",
        768..1024 => "Tablet",
        _ => "Desktop",
    }
}
