//! 全局容器句柄
//!
//! 可选地把构建完成的容器安装为进程内的全局容器，供无法直接拿到容器引用的代码使用。

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use sprig_common::{ContainerError, ContainerResult};
use tracing::debug;

use crate::container::Container;

static GLOBAL_CONTAINER: Lazy<RwLock<Option<Arc<Container>>>> = Lazy::new(|| RwLock::new(None));

/// 安装全局容器，返回之前安装的容器
pub fn install(container: Arc<Container>) -> Option<Arc<Container>> {
    debug!("安装全局容器");
    GLOBAL_CONTAINER.write().replace(container)
}

/// 当前的全局容器
pub fn current() -> Option<Arc<Container>> {
    GLOBAL_CONTAINER.read().clone()
}

/// 当前的全局容器，未安装时返回错误
pub fn required() -> ContainerResult<Arc<Container>> {
    current().ok_or_else(|| ContainerError::Unavailable {
        message: "全局容器尚未安装".to_string(),
    })
}

/// 若全局容器正是 `container`，则将其卸载
pub(crate) fn detach(container: &Container) {
    let detached = {
        let mut slot = GLOBAL_CONTAINER.write();
        let matches = slot
            .as_ref()
            .is_some_and(|installed| std::ptr::eq(Arc::as_ptr(installed), container));
        if matches {
            slot.take()
        } else {
            None
        }
    };
    if detached.is_some() {
        debug!("卸载全局容器");
    }
}
