use std::fmt;
use std::sync::Arc;

use crate::storage::KeyValueStore;

/// 执行上下文能力
///
/// 只有 `Device` 上下文持有设备绑定的本地存储；`Detached`（例如没有设备标识的
/// 服务端调用）下限流器放行、账本读取为空、令牌创建失败。
#[derive(Clone)]
pub enum ExecutionContext {
    Device(Arc<dyn KeyValueStore>),
    Detached,
}

impl ExecutionContext {
    pub fn device(store: impl KeyValueStore + 'static) -> Self {
        ExecutionContext::Device(Arc::new(store))
    }

    pub fn store(&self) -> Option<&dyn KeyValueStore> {
        match self {
            ExecutionContext::Device(store) => Some(store.as_ref()),
            ExecutionContext::Detached => None,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Device(_) => f.write_str("ExecutionContext::Device"),
            ExecutionContext::Detached => f.write_str("ExecutionContext::Detached"),
        }
    }
}
