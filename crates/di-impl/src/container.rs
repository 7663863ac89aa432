//! 依赖注入容器实现
//!
//! 容器按以下阶段构建：
//!
//! 1. 创建全部工厂所有者
//! 2. 创建全部后置处理器，并加入后置处理器链
//! 3. 按 (排序值, 名称) 创建其余组件，依赖在需要时被提前创建
//! 4. 对每个组件执行属性注入
//! 5. 对每个组件调用初始化钩子
//!
//! 注入与生命周期钩子作用在经后置处理器还原后的原始实例上。

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use di_abstractions::{
    Argument, AutowiredMarker, BuildContext, ComponentDefinition, ComponentLookup, CreationStrategy,
    InjectionKind, InjectionPoint, LifecycleHook, ParamSpec, PostProcessor, ResolvedArgs,
    ValueResolver,
};
use parking_lot::{Mutex, RwLock};
use sprig_common::{ContainerError, ContainerResult, Instance, TypeKey};
use tracing::{debug, error, info, warn};

use crate::global;
use crate::registry::DefinitionMap;

/// 依赖注入容器
pub struct Container {
    definitions: RwLock<DefinitionMap>,
    resolver: Arc<dyn ValueResolver>,
    post_processors: RwLock<Vec<Arc<dyn PostProcessor>>>,
    creating: Mutex<HashSet<String>>,
}

impl Container {
    /// 由组件定义构建容器，返回时全部组件已创建、注入并初始化
    pub fn start(definitions: DefinitionMap, resolver: Arc<dyn ValueResolver>) -> ContainerResult<Self> {
        let container = Self {
            definitions: RwLock::new(definitions),
            resolver,
            post_processors: RwLock::new(Vec::new()),
            creating: Mutex::new(HashSet::new()),
        };
        container.create_factory_owners()?;
        container.create_post_processors()?;
        container.create_remaining()?;
        container.inject_all()?;
        container.init_all()?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            for definition in container.sorted_definitions() {
                debug!("组件定义: {:?}", definition);
            }
        }
        info!("容器启动完成, 共 {} 个组件", container.len());
        Ok(container)
    }

    /// 组件数量
    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    /// 是否没有任何组件
    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }

    /// 按名称排序的全部组件名称
    pub fn component_names(&self) -> Vec<String> {
        self.definitions.read().keys().cloned().collect()
    }

    fn snapshot(&self) -> Vec<Arc<ComponentDefinition>> {
        self.definitions.read().values().cloned().collect()
    }

    fn sorted_definitions(&self) -> Vec<Arc<ComponentDefinition>> {
        let mut definitions = self.snapshot();
        definitions.sort_by(|a, b| a.cmp_priority(b));
        definitions
    }

    fn create_factory_owners(&self) -> ContainerResult<()> {
        for definition in self.sorted_definitions() {
            if definition.is_factory_owner() && definition.instance().is_none() {
                self.create_early(&definition)?;
            }
        }
        Ok(())
    }

    fn create_post_processors(&self) -> ContainerResult<()> {
        let mut processors = Vec::new();
        for definition in self.find_definitions(TypeKey::of::<dyn PostProcessor>()) {
            let instance = match definition.instance() {
                Some(instance) => instance,
                None => self.create_early(&definition)?,
            };
            let processor = instance.cast::<dyn PostProcessor>().ok_or_else(|| {
                ContainerError::creation(
                    definition.name(),
                    format!("实例 {} 不是后置处理器", instance.type_name()),
                )
            })?;
            debug!("注册后置处理器: {}", definition.name());
            processors.push(processor);
        }
        self.post_processors.write().extend(processors);
        Ok(())
    }

    fn create_remaining(&self) -> ContainerResult<()> {
        for definition in self.sorted_definitions() {
            if definition.instance().is_none() {
                self.create_early(&definition)?;
            }
        }
        Ok(())
    }

    fn inject_all(&self) -> ContainerResult<()> {
        for definition in self.snapshot() {
            if definition.injections().is_empty() {
                continue;
            }
            let target = self.injection_target(&definition)?;
            for point in definition.injections() {
                self.inject_point(&definition, &target, point)?;
            }
        }
        Ok(())
    }

    fn init_all(&self) -> ContainerResult<()> {
        for definition in self.snapshot() {
            let target = self.injection_target(&definition)?;
            self.call_hook(&definition, &target, definition.init_hook())?;
        }
        Ok(())
    }

    fn processors(&self) -> Vec<Arc<dyn PostProcessor>> {
        self.post_processors.read().clone()
    }

    /// 逆序经过后置处理器链，还原出应当接受注入和钩子调用的实例
    fn injection_target(&self, definition: &ComponentDefinition) -> ContainerResult<Instance> {
        let mut target = definition.required_instance()?;
        for processor in self.processors().iter().rev() {
            target = processor.on_set_property(target, definition.name());
        }
        Ok(target)
    }

    fn resolve_param(&self, definition: &ComponentDefinition, param: &ParamSpec) -> ContainerResult<Argument> {
        if definition.is_factory_owner() && param.autowired.is_some() {
            return Err(ContainerError::creation(
                definition.name(),
                format!("工厂所有者的构造参数 '{}' 不能声明依赖注入", param.name),
            ));
        }
        match (&param.value, &param.autowired) {
            (Some(_), Some(_)) => Err(ContainerError::definition(format!(
                "组件 '{}' 的参数 '{}' 不能同时声明值注入和依赖注入",
                definition.name(),
                param.name
            ))),
            (None, None) => Err(ContainerError::definition(format!(
                "组件 '{}' 的参数 '{}' 必须声明值注入或依赖注入",
                definition.name(),
                param.name
            ))),
            (Some(value), None) => {
                let resolved = self.resolver.resolve_required(&value.expression, value.value_type)?;
                Ok(Argument::Value(resolved))
            }
            (None, Some(autowired)) => {
                let dependency = self.find_dependency(autowired)?;
                match dependency {
                    Some(dependency) => match dependency.instance() {
                        Some(instance) => Ok(Argument::Component(instance)),
                        None => Ok(Argument::Component(self.create_early(&dependency)?)),
                    },
                    None if autowired.required => Err(ContainerError::unsatisfied(
                        definition.name(),
                        format!("参数 '{}' 缺少类型为 {} 的依赖组件", param.name, autowired.target),
                    )),
                    None => Ok(Argument::Absent),
                }
            }
        }
    }

    fn find_dependency(&self, autowired: &AutowiredMarker) -> ContainerResult<Option<Arc<ComponentDefinition>>> {
        match &autowired.name {
            Some(name) => self.find_definition_as(name, autowired.target),
            None => self.find_definition_by_type(autowired.target),
        }
    }

    fn inject_point(&self, definition: &ComponentDefinition, target: &Instance, point: &InjectionPoint) -> ContainerResult<()> {
        if !point.is_marked() {
            return Ok(());
        }
        let location = format!("{}.{}", definition.name(), point.name);
        if point.modifiers.is_static {
            return Err(ContainerError::definition(format!("不能注入静态成员: {location}")));
        }
        match point.kind {
            InjectionKind::Field if point.modifiers.is_final => {
                return Err(ContainerError::definition(format!("不能注入 final 字段: {location}")));
            }
            InjectionKind::Setter { arity } => {
                if point.modifiers.is_final {
                    warn!("注入 final 方法: {}", location);
                }
                if arity != 1 {
                    return Err(ContainerError::definition(format!(
                        "setter 方法 {location} 必须只有一个参数, 实际为 {arity} 个"
                    )));
                }
            }
            InjectionKind::Field => {}
        }

        let argument = match (&point.value, &point.autowired) {
            (Some(_), Some(_)) => {
                return Err(ContainerError::definition(format!(
                    "{location} 不能同时声明值注入和依赖注入"
                )));
            }
            (Some(value), None) => {
                let resolved = self.resolver.resolve_required(&value.expression, value.value_type)?;
                debug!("值注入: {} = {:?}", location, resolved);
                Argument::Value(resolved)
            }
            (None, Some(autowired)) => {
                let instance = self
                    .find_dependency(autowired)?
                    .and_then(|dependency| dependency.instance());
                match instance {
                    Some(instance) => {
                        debug!("依赖注入: {} = {:?}", location, instance);
                        Argument::Component(instance)
                    }
                    None if autowired.required => {
                        return Err(ContainerError::unsatisfied(
                            definition.name(),
                            format!("{} 缺少类型为 {} 的依赖组件", location, autowired.target),
                        ));
                    }
                    None => return Ok(()),
                }
            }
            (None, None) => return Ok(()),
        };
        point
            .apply(target, argument)
            .map_err(|e| ContainerError::creation(definition.name(), e))
    }

    fn call_hook(&self, definition: &ComponentDefinition, target: &Instance, hook: &LifecycleHook) -> ContainerResult<()> {
        match hook {
            LifecycleHook::None => Ok(()),
            LifecycleHook::Bound(hook) => {
                debug!("调用组件 '{}' 的方法: {}", definition.name(), hook.name);
                hook.call(target)
                    .map_err(|e| ContainerError::creation(definition.name(), e))
            }
            LifecycleHook::Named(method) => {
                debug!("调用组件 '{}' 的方法: {}", definition.name(), method);
                match target.invoke_operation(method) {
                    Some(result) => result.map_err(|e| ContainerError::creation(definition.name(), e)),
                    None => Err(ContainerError::definition(format!(
                        "方法 '{}' 在类型 {} 中不存在",
                        method,
                        target.type_name()
                    ))),
                }
            }
        }
    }
}

impl BuildContext for Container {
    fn find_definition(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.definitions.read().get(name).cloned()
    }

    fn find_definition_as(&self, name: &str, key: TypeKey) -> ContainerResult<Option<Arc<ComponentDefinition>>> {
        match self.find_definition(name) {
            None => Ok(None),
            Some(definition) if definition.satisfies(&key) => Ok(Some(definition)),
            Some(definition) => Err(ContainerError::TypeMismatch {
                name: name.to_string(),
                required: key.name().to_string(),
                actual: definition.declared().name().to_string(),
            }),
        }
    }

    fn find_definitions(&self, key: TypeKey) -> Vec<Arc<ComponentDefinition>> {
        let mut found: Vec<_> = self
            .definitions
            .read()
            .values()
            .filter(|definition| definition.satisfies(&key))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.cmp_priority(b));
        found
    }

    fn find_definition_by_type(&self, key: TypeKey) -> ContainerResult<Option<Arc<ComponentDefinition>>> {
        let mut found = self.find_definitions(key);
        if found.len() <= 1 {
            return Ok(found.pop());
        }
        let mut primaries: Vec<_> = found.into_iter().filter(|definition| definition.is_primary()).collect();
        match primaries.len() {
            1 => Ok(primaries.pop()),
            0 => Err(ContainerError::Ambiguous {
                type_name: key.name().to_string(),
                reason: "存在多个组件但没有首选组件".to_string(),
            }),
            _ => Err(ContainerError::Ambiguous {
                type_name: key.name().to_string(),
                reason: "存在多个首选组件".to_string(),
            }),
        }
    }

    fn create_early(&self, definition: &Arc<ComponentDefinition>) -> ContainerResult<Instance> {
        debug!("创建组件: {} ({})", definition.name(), definition.declared().name());
        if !self.creating.lock().insert(definition.name().to_string()) {
            return Err(ContainerError::unsatisfied(
                definition.name(),
                "检测到循环依赖, 组件正在创建中",
            ));
        }

        let params = definition.strategy().params();
        let mut values = Vec::with_capacity(params.len());
        for param in params {
            values.push(self.resolve_param(definition, param)?);
        }
        let args = ResolvedArgs::new(values);

        let created = match definition.strategy() {
            CreationStrategy::Constructor(constructor) => constructor.invoke(&args),
            CreationStrategy::Factory { owner, method } => {
                let owner_definition = self.find_definition(owner).ok_or_else(|| {
                    ContainerError::no_such_component(format!("工厂所有者 '{owner}' 不存在"))
                })?;
                let owner_instance = match owner_definition.instance() {
                    Some(instance) => instance,
                    None => self.create_early(&owner_definition)?,
                };
                method.invoke(&owner_instance, &args)
            }
        };
        let raw = created.map_err(|e| ContainerError::creation(definition.name(), e))?;
        definition.set_instance(raw.clone())?;

        let mut instance = raw.clone();
        for processor in self.processors() {
            match processor.before_initialization(self, instance.clone(), definition.name())? {
                Some(processed) => {
                    if !processed.ptr_eq(&instance) {
                        debug!("组件 '{}' 被后置处理器替换为 {:?}", definition.name(), processed);
                        instance = processed;
                    }
                }
                None => {
                    return Err(ContainerError::creation(
                        definition.name(),
                        "后置处理器返回了空实例",
                    ));
                }
            }
        }
        if !instance.ptr_eq(&raw) {
            definition.replace_instance(instance.clone())?;
        }
        Ok(instance)
    }
}

impl ComponentLookup for Container {
    fn contains_component(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    fn get_instance(&self, name: &str) -> ContainerResult<Instance> {
        self.find_definition(name)
            .ok_or_else(|| ContainerError::no_such_component(format!("没有名为 '{name}' 的组件")))?
            .required_instance()
    }

    fn get_instance_as(&self, name: &str, key: TypeKey) -> ContainerResult<Instance> {
        self.find_definition_as(name, key)?
            .ok_or_else(|| ContainerError::no_such_component(format!("没有名为 '{name}' 的组件")))?
            .required_instance()
    }

    fn get_instance_by_type(&self, key: TypeKey) -> ContainerResult<Instance> {
        self.find_definition_by_type(key)?
            .ok_or_else(|| ContainerError::no_such_component(format!("没有类型为 {key} 的组件")))?
            .required_instance()
    }

    fn get_instances(&self, key: TypeKey) -> ContainerResult<Vec<Instance>> {
        self.find_definitions(key)
            .iter()
            .map(|definition| definition.required_instance())
            .collect()
    }

    fn close(&self) -> ContainerResult<()> {
        info!("正在关闭容器...");
        let mut first_error = None;
        for definition in self.snapshot() {
            if definition.instance().is_none() {
                continue;
            }
            let result = self
                .injection_target(&definition)
                .and_then(|target| self.call_hook(&definition, &target, definition.destroy_hook()));
            if let Err(e) = result {
                error!("组件 '{}' 销毁失败: {}", definition.name(), e);
                first_error.get_or_insert(e);
            }
        }
        self.definitions.write().clear();
        self.post_processors.write().clear();
        global::detach(self);
        info!("容器已关闭");
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("components", &self.component_names())
            .field("post_processors", &self.post_processors.read().len())
            .finish_non_exhaustive()
    }
}
