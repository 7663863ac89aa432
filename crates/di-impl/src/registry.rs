//! 组件定义注册
//!
//! 把扫描得到的类型名称转换为组件定义：带组件标记的类型生成一个定义，
//! 工厂所有者上的每个工厂方法再各生成一个定义。

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use di_abstractions::{
    BoundHook, ComponentDefinition, ComponentMarker, Constructor, FactoryMethod, LifecycleHook,
    TypeCatalog, TypeDescriptor, TypeKind, DEFAULT_ORDER,
};
use sprig_common::{ContainerError, ContainerResult};
use tracing::debug;

/// 按组件名称排序的定义表
pub type DefinitionMap = BTreeMap<String, Arc<ComponentDefinition>>;

/// 由类型名称集合创建组件定义
pub fn create_definitions(catalog: &TypeCatalog, type_names: &BTreeSet<String>) -> ContainerResult<DefinitionMap> {
    let mut definitions = DefinitionMap::new();
    for type_name in type_names {
        let descriptor = catalog
            .get(type_name)
            .ok_or_else(|| ContainerError::definition(format!("类型不存在: {type_name}")))?;
        if descriptor.kind.is_skipped() {
            continue;
        }
        let Some(marker) = &descriptor.component else {
            continue;
        };
        debug!("发现组件类型: {}", type_name);
        if descriptor.kind == TypeKind::Abstract {
            return Err(ContainerError::definition(format!(
                "组件类型 {type_name} 不能是抽象类型"
            )));
        }

        let name = component_name(descriptor, marker);
        let definition = ComponentDefinition::with_constructor(
            name.clone(),
            descriptor.declared.clone(),
            suitable_constructor(descriptor)?,
            descriptor.order.unwrap_or(DEFAULT_ORDER),
            descriptor.primary,
            descriptor.factory_owner,
            single_hook(descriptor, &descriptor.init_hooks, "初始化")?,
            single_hook(descriptor, &descriptor.destroy_hooks, "销毁")?,
            descriptor.injections.clone(),
        );
        add_definition(&mut definitions, definition)?;
        debug!("注册组件定义: {} ({})", name, type_name);

        if descriptor.factory_owner {
            scan_factory_methods(&name, descriptor, &mut definitions)?;
        }
    }
    Ok(definitions)
}

/// 组件名称：显式名称，否则为首字母小写的简单类型名
fn component_name(descriptor: &TypeDescriptor, marker: &ComponentMarker) -> String {
    match &marker.name {
        Some(name) if !name.is_empty() => name.clone(),
        _ => decapitalize(descriptor.simple_name()),
    }
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn suitable_constructor(descriptor: &TypeDescriptor) -> ContainerResult<Constructor> {
    match descriptor.constructors.as_slice() {
        [constructor] => Ok(constructor.clone()),
        [] => Err(ContainerError::definition(format!(
            "类型 {} 没有可用的构造函数",
            descriptor.type_name
        ))),
        many => Err(ContainerError::definition(format!(
            "类型 {} 存在 {} 个构造函数, 只允许一个",
            descriptor.type_name,
            many.len()
        ))),
    }
}

fn single_hook(descriptor: &TypeDescriptor, hooks: &[BoundHook], kind: &str) -> ContainerResult<LifecycleHook> {
    match hooks {
        [] => Ok(LifecycleHook::None),
        [hook] => Ok(LifecycleHook::Bound(hook.clone())),
        _ => Err(ContainerError::definition(format!(
            "类型 {} 声明了多个{}方法: {:?}",
            descriptor.type_name, kind, hooks
        ))),
    }
}

fn scan_factory_methods(
    owner: &str,
    descriptor: &TypeDescriptor,
    definitions: &mut DefinitionMap,
) -> ContainerResult<()> {
    for method in &descriptor.factory_methods {
        validate_factory_method(descriptor, method)?;
        let name = method
            .component_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| method.method_name.clone());
        let definition = ComponentDefinition::with_factory(name.clone(), owner, method.clone());
        add_definition(definitions, definition)?;
        debug!("注册工厂方法组件定义: {} ({}.{})", name, owner, method.method_name);
    }
    Ok(())
}

fn validate_factory_method(descriptor: &TypeDescriptor, method: &FactoryMethod) -> ContainerResult<()> {
    let location = format!("{}.{}", descriptor.type_name, method.method_name);
    let modifiers = method.modifiers;
    let problem = if modifiers.is_abstract {
        Some("不能是抽象方法")
    } else if modifiers.is_final {
        Some("不能是 final 方法")
    } else if modifiers.is_private {
        Some("不能是私有方法")
    } else if method.returns.is_unit() {
        Some("不能没有返回值")
    } else if method.returns.is_primitive() {
        Some("不能返回原始类型")
    } else {
        None
    };
    match problem {
        Some(problem) => Err(ContainerError::definition(format!("工厂方法 {location} {problem}"))),
        None => Ok(()),
    }
}

fn add_definition(definitions: &mut DefinitionMap, definition: ComponentDefinition) -> ContainerResult<()> {
    let name = definition.name().to_string();
    if definitions.contains_key(&name) {
        return Err(ContainerError::definition(format!("组件名称重复: {name}")));
    }
    definitions.insert(name, Arc::new(definition));
    Ok(())
}
