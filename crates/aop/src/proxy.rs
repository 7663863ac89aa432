//! 代理生成

use std::sync::Arc;

use sprig_common::{ContainerError, ContainerResult, Instance, InvocationHandler, TypeKey, View};
use tracing::debug;

/// 代理解析器
///
/// 为实例声明的每个可代理契约生成一个转发到调用处理器的代理视图。
#[derive(Debug, Default, Clone, Copy)]
pub struct ProxyResolver;

impl ProxyResolver {
    /// 创建代理解析器
    pub const fn new() -> Self {
        Self
    }

    /// 创建代理实例
    ///
    /// 代理只暴露可代理契约；原实例没有可代理契约时返回错误。
    pub fn create_proxy(&self, original: &Instance, handler: Arc<dyn InvocationHandler>) -> ContainerResult<Instance> {
        let builders = original.proxy_builders();
        if builders.is_empty() {
            return Err(ContainerError::aop(format!(
                "类型 {} 没有可被代理的契约",
                original.type_name()
            )));
        }
        let views: Vec<(TypeKey, View)> = builders
            .iter()
            .map(|(key, build)| (*key, build(original, &handler)))
            .collect();
        debug!(
            "为 {:?} 创建代理, 契约: {:?}",
            original,
            views.iter().map(|(key, _)| key.short_name()).collect::<Vec<_>>()
        );
        Ok(Instance::proxy_of(original, views))
    }
}
