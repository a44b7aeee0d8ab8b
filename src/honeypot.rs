/// 蜜罐字段名，看起来像正常字段以迷惑机器人
pub const HONEYPOT_FIELD_NAME: &str = "website_url";

/// 蜜罐字段被填写即视为自动提交
pub fn is_honeypot_filled(value: &str) -> bool {
    !value.is_empty()
}
