/// 限流记录键前缀
const RATE_LIMIT_PREFIX: &str = "rate_limit_";

/// 设备级 Redis 命名空间前缀
const DEVICE_PREFIX: &str = "device:";

/// 设备投票人令牌键
pub const VOTER_TOKEN_KEY: &str = "voter_token";

/// 已投票功能集合键
pub const VOTED_FEATURES_KEY: &str = "voted_features";

/// 生成某个动作的限流记录键
pub fn rate_limit_key(action: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, action)
}

/// 生成设备命名空间，所有设备状态键都挂在它下面
pub fn device_namespace(device_id: &str) -> String {
    format!("{}{}:", DEVICE_PREFIX, device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_key_uses_action_suffix() {
        assert_eq!(rate_limit_key("create_bug"), "rate_limit_create_bug");
        assert_eq!(rate_limit_key("vote"), "rate_limit_vote");
    }

    #[test]
    fn device_namespace_is_colon_terminated() {
        assert_eq!(device_namespace("abc"), "device:abc:");
    }
}
