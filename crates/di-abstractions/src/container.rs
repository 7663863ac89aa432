//! 依赖注入容器抽象接口
//!
//! 提供组件查找的核心抽象和容器设置

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sprig_common::{ContainerError, ContainerResult, Instance, TypeKey};

/// 组件查找 trait
pub trait ComponentLookup: Send + Sync {
    /// 是否存在指定名称的组件
    fn contains_component(&self, name: &str) -> bool;

    /// 按名称获取组件实例
    fn get_instance(&self, name: &str) -> ContainerResult<Instance>;

    /// 按名称获取组件实例并校验类型
    fn get_instance_as(&self, name: &str, key: TypeKey) -> ContainerResult<Instance>;

    /// 按类型获取唯一组件实例
    fn get_instance_by_type(&self, key: TypeKey) -> ContainerResult<Instance>;

    /// 满足某个类型的全部组件实例
    fn get_instances(&self, key: TypeKey) -> ContainerResult<Vec<Instance>>;

    /// 关闭容器，依次调用各组件的销毁钩子
    fn close(&self) -> ContainerResult<()>;

    /// 按名称获取组件并以类型 `U` 访问
    fn get<U: ?Sized + 'static>(&self, name: &str) -> ContainerResult<Arc<U>>
    where
        Self: Sized,
    {
        let instance = self.get_instance_as(name, TypeKey::of::<U>())?;
        cast_instance(name, &instance)
    }

    /// 按类型获取唯一组件
    fn get_by_type<U: ?Sized + 'static>(&self) -> ContainerResult<Arc<U>>
    where
        Self: Sized,
    {
        let key = TypeKey::of::<U>();
        let instance = self.get_instance_by_type(key)?;
        cast_instance(key.name(), &instance)
    }

    /// 满足类型 `U` 的全部组件
    fn get_all<U: ?Sized + 'static>(&self) -> ContainerResult<Vec<Arc<U>>>
    where
        Self: Sized,
    {
        self.get_instances(TypeKey::of::<U>())?
            .iter()
            .map(|instance| cast_instance(instance.type_name(), instance))
            .collect()
    }
}

/// 以类型 `U` 访问实例，实例未暴露该类型时返回类型不匹配错误
pub fn cast_instance<U: ?Sized + 'static>(name: &str, instance: &Instance) -> ContainerResult<Arc<U>> {
    instance.cast::<U>().ok_or_else(|| ContainerError::TypeMismatch {
        name: name.to_string(),
        required: std::any::type_name::<U>().to_string(),
        actual: instance.type_name().to_string(),
    })
}

/// 容器设置
///
/// 通常从配置的 `container` 节绑定。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// 扫描的包，为空时扫描整个类型目录
    pub scan_packages: Vec<String>,
    /// 额外导入的类型名称
    pub imports: Vec<String>,
    /// 构建完成后是否安装为全局容器
    pub install_global: bool,
}
