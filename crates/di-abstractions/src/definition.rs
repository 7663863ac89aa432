//! 组件定义
//!
//! 注册阶段由类型描述符生成，每个组件名称对应一个定义。
//! 定义在创建阶段持有经过后置处理器处理的实例。

use std::cmp::Ordering;
use std::fmt;

use parking_lot::RwLock;
use sprig_common::{ContainerError, ContainerResult, DeclaredType, Instance, TypeKey};

use crate::descriptor::{BoundHook, Constructor, FactoryMethod, InjectionPoint, ParamSpec};

/// 未指定排序值时的默认值
pub const DEFAULT_ORDER: i32 = i32::MAX;

/// 组件的创建方式
#[derive(Debug, Clone)]
pub enum CreationStrategy {
    /// 调用类型自身的构造函数
    Constructor(Constructor),
    /// 调用工厂所有者组件上的工厂方法
    Factory {
        /// 工厂所有者的组件名称
        owner: String,
        method: FactoryMethod,
    },
}

impl CreationStrategy {
    /// 创建时需要解析的参数
    pub fn params(&self) -> &[ParamSpec] {
        match self {
            Self::Constructor(constructor) => &constructor.params,
            Self::Factory { method, .. } => &method.params,
        }
    }
}

/// 生命周期钩子
#[derive(Debug, Clone, Default)]
pub enum LifecycleHook {
    /// 没有钩子
    #[default]
    None,
    /// 类型上绑定的钩子
    Bound(BoundHook),
    /// 按名称在运行时类型上查找的方法
    Named(String),
}

impl LifecycleHook {
    /// 钩子名称
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Bound(hook) => Some(&hook.name),
            Self::Named(name) => Some(name),
        }
    }
}

/// 组件定义
pub struct ComponentDefinition {
    name: String,
    declared: DeclaredType,
    strategy: CreationStrategy,
    order: i32,
    primary: bool,
    factory_owner: bool,
    init: LifecycleHook,
    destroy: LifecycleHook,
    injections: Vec<InjectionPoint>,
    instance: RwLock<Option<Instance>>,
}

impl ComponentDefinition {
    /// 以构造函数方式创建的组件定义
    #[allow(clippy::too_many_arguments)]
    pub fn with_constructor(
        name: impl Into<String>,
        declared: DeclaredType,
        constructor: Constructor,
        order: i32,
        primary: bool,
        factory_owner: bool,
        init: LifecycleHook,
        destroy: LifecycleHook,
        injections: Vec<InjectionPoint>,
    ) -> Self {
        Self {
            name: name.into(),
            declared,
            strategy: CreationStrategy::Constructor(constructor),
            order,
            primary,
            factory_owner,
            init,
            destroy,
            injections,
            instance: RwLock::new(None),
        }
    }

    /// 以工厂方法方式创建的组件定义
    pub fn with_factory(name: impl Into<String>, owner: impl Into<String>, method: FactoryMethod) -> Self {
        let init = method
            .init_method
            .clone()
            .map_or(LifecycleHook::None, LifecycleHook::Named);
        let destroy = method
            .destroy_method
            .clone()
            .map_or(LifecycleHook::None, LifecycleHook::Named);
        Self {
            name: name.into(),
            declared: method.returns.clone(),
            order: method.order.unwrap_or(DEFAULT_ORDER),
            primary: method.primary,
            factory_owner: false,
            init,
            destroy,
            injections: Vec::new(),
            strategy: CreationStrategy::Factory {
                owner: owner.into(),
                method,
            },
            instance: RwLock::new(None),
        }
    }

    /// 组件名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明类型
    pub fn declared(&self) -> &DeclaredType {
        &self.declared
    }

    /// 创建方式
    pub fn strategy(&self) -> &CreationStrategy {
        &self.strategy
    }

    /// 排序值
    pub fn order(&self) -> i32 {
        self.order
    }

    /// 是否首选
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// 是否为工厂所有者
    pub fn is_factory_owner(&self) -> bool {
        self.factory_owner
    }

    /// 初始化钩子
    pub fn init_hook(&self) -> &LifecycleHook {
        &self.init
    }

    /// 销毁钩子
    pub fn destroy_hook(&self) -> &LifecycleHook {
        &self.destroy
    }

    /// 注入点
    pub fn injections(&self) -> &[InjectionPoint] {
        &self.injections
    }

    /// 声明类型是否满足 `key`
    pub fn satisfies(&self, key: &TypeKey) -> bool {
        self.declared.satisfies(key)
    }

    /// 已创建的实例
    pub fn instance(&self) -> Option<Instance> {
        self.instance.read().clone()
    }

    /// 已创建的实例，尚未创建时返回错误
    pub fn required_instance(&self) -> ContainerResult<Instance> {
        self.instance().ok_or_else(|| {
            ContainerError::creation(
                self.name.clone(),
                format!(
                    "组件 '{}' ({}) 在当前阶段尚未实例化",
                    self.name,
                    self.declared.name()
                ),
            )
        })
    }

    /// 记录新创建的实例，每个定义只能记录一次
    pub fn set_instance(&self, instance: Instance) -> ContainerResult<()> {
        let mut slot = self.instance.write();
        if slot.is_some() {
            return Err(ContainerError::creation(
                self.name.clone(),
                format!("组件 '{}' 的实例已存在", self.name),
            ));
        }
        *slot = Some(instance);
        Ok(())
    }

    /// 以后置处理器产生的实例替换已记录的实例
    pub fn replace_instance(&self, instance: Instance) -> ContainerResult<()> {
        let mut slot = self.instance.write();
        if slot.is_none() {
            return Err(ContainerError::creation(
                self.name.clone(),
                format!("组件 '{}' 尚未创建, 无法替换实例", self.name),
            ));
        }
        *slot = Some(instance);
        Ok(())
    }

    /// 按 (排序值, 名称) 比较
    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match &self.strategy {
            CreationStrategy::Constructor(_) => "constructor".to_string(),
            CreationStrategy::Factory { owner, method } => format!("{owner}.{}", method.method_name),
        };
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("type", &self.declared.name())
            .field("strategy", &strategy)
            .field("order", &self.order)
            .field("primary", &self.primary)
            .field("init", &self.init.name())
            .field("destroy", &self.destroy.name())
            .field("instance", &*self.instance.read())
            .finish()
    }
}
