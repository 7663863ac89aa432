//! 拦截后置处理器
//!
//! 组件类型上的拦截标记指向一个调用处理器组件。[`InterceptionPostProcessor`]
//! 在初始化前把带标记的组件替换为代理，其他组件注入时拿到的是代理；
//! 而注入和生命周期钩子仍作用于原始实例。

use std::sync::Arc;

use dashmap::DashMap;
use di_abstractions::{BuildContext, Constructor, PostProcessor, TypeDescriptor};
use sprig_common::{ContainerError, ContainerResult, Instance, InvocationHandler, Managed, TypeMeta};
use tracing::{debug, info};

use crate::proxy::ProxyResolver;

/// 环绕拦截标记
pub const AROUND_MARKER: &str = "around";

/// 事务拦截标记
pub const TRANSACTIONAL_MARKER: &str = "transactional";

/// 环绕拦截后置处理器的类型名称
pub const AROUND_PROCESSOR_TYPE: &str = "sprig.aop.AroundProxyPostProcessor";

/// 事务拦截后置处理器的类型名称
pub const TRANSACTIONAL_PROCESSOR_TYPE: &str = "sprig.aop.TransactionalPostProcessor";

/// 按拦截标记创建代理的后置处理器
pub struct InterceptionPostProcessor {
    marker: String,
    resolver: ProxyResolver,
    originals: DashMap<String, Instance>,
}

impl InterceptionPostProcessor {
    /// 处理指定标记的后置处理器
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            resolver: ProxyResolver::new(),
            originals: DashMap::new(),
        }
    }

    /// 处理 `around` 标记
    pub fn around() -> Self {
        Self::new(AROUND_MARKER)
    }

    /// 处理 `transactional` 标记
    pub fn transactional() -> Self {
        Self::new(TRANSACTIONAL_MARKER)
    }

    /// 处理的标记
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// 被代理组件的原始实例
    pub fn original(&self, name: &str) -> Option<Instance> {
        self.originals.get(name).map(|entry| entry.value().clone())
    }

    /// 已代理的组件数量
    pub fn proxied_count(&self) -> usize {
        self.originals.len()
    }

    /// 可注册到类型目录的类型描述
    pub fn descriptor(type_name: impl Into<String>, marker: &'static str) -> TypeDescriptor {
        TypeDescriptor::component::<Self>(type_name).constructor(Constructor::no_args(move || Self::new(marker)))
    }

    /// 环绕拦截后置处理器的类型描述，组件名为 `aroundProxyPostProcessor`
    pub fn around_descriptor() -> TypeDescriptor {
        Self::descriptor(AROUND_PROCESSOR_TYPE, AROUND_MARKER)
    }

    /// 事务拦截后置处理器的类型描述，组件名为 `transactionalPostProcessor`
    pub fn transactional_descriptor() -> TypeDescriptor {
        Self::descriptor(TRANSACTIONAL_PROCESSOR_TYPE, TRANSACTIONAL_MARKER)
    }

    fn resolve_handler(&self, context: &dyn BuildContext, handler_name: &str, name: &str) -> ContainerResult<Arc<dyn InvocationHandler>> {
        let definition = context.find_definition(handler_name).ok_or_else(|| {
            ContainerError::aop(format!(
                "组件 '{}' 的 {} 标记引用的处理器 '{}' 不存在",
                name, self.marker, handler_name
            ))
        })?;
        let instance = match definition.instance() {
            Some(instance) => instance,
            None => context.create_early(&definition)?,
        };
        instance.cast::<dyn InvocationHandler>().ok_or_else(|| {
            ContainerError::aop(format!(
                "组件 '{}' ({}) 不是调用处理器",
                handler_name,
                instance.type_name()
            ))
        })
    }
}

impl Managed for InterceptionPostProcessor {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn PostProcessor>(|it| it)
            .build()
    }
}

impl PostProcessor for InterceptionPostProcessor {
    fn before_initialization(
        &self,
        context: &dyn BuildContext,
        instance: Instance,
        name: &str,
    ) -> ContainerResult<Option<Instance>> {
        let Some(handler_name) = instance.marker(&self.marker).map(str::to_string) else {
            return Ok(Some(instance));
        };
        debug!("组件 '{}' 带有 {} 标记, 处理器: {}", name, self.marker, handler_name);
        let handler = self.resolve_handler(context, &handler_name, name)?;
        let proxy = self.resolver.create_proxy(&instance, handler)?;
        info!("组件 '{}' 已替换为代理: {:?}", name, proxy);
        self.originals.insert(name.to_string(), instance);
        Ok(Some(proxy))
    }

    fn on_set_property(&self, instance: Instance, name: &str) -> Instance {
        self.original(name).unwrap_or(instance)
    }
}
