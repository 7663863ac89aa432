//! 后置处理器
//!
//! 后置处理器在组件创建后、注入前有机会替换实例（例如换成代理），
//! 并在注入和生命周期阶段把替换后的实例还原为原始实例。

use std::sync::Arc;

use sprig_common::{ContainerResult, Instance, TypeKey};

use crate::definition::ComponentDefinition;

/// 构建期上下文
///
/// 容器把自身以该接口交给后置处理器，用于查找定义和提前创建依赖组件。
pub trait BuildContext {
    /// 按名称查找定义
    fn find_definition(&self, name: &str) -> Option<Arc<ComponentDefinition>>;

    /// 按名称查找定义并校验类型，类型不符时返回错误
    fn find_definition_as(&self, name: &str, key: TypeKey) -> ContainerResult<Option<Arc<ComponentDefinition>>>;

    /// 满足某个类型的全部定义，按 (排序值, 名称) 排序
    fn find_definitions(&self, key: TypeKey) -> Vec<Arc<ComponentDefinition>>;

    /// 满足某个类型的唯一定义，多个时取唯一的首选定义
    fn find_definition_by_type(&self, key: TypeKey) -> ContainerResult<Option<Arc<ComponentDefinition>>>;

    /// 立即创建组件实例（包括其尚未创建的依赖）
    fn create_early(&self, definition: &Arc<ComponentDefinition>) -> ContainerResult<Instance>;
}

/// 后置处理器 trait
pub trait PostProcessor: Send + Sync {
    /// 初始化前调用，可返回替换后的实例；返回 `None` 视为错误
    fn before_initialization(
        &self,
        _context: &dyn BuildContext,
        instance: Instance,
        _name: &str,
    ) -> ContainerResult<Option<Instance>> {
        Ok(Some(instance))
    }

    /// 初始化后调用，保留的扩展点
    fn after_initialization(
        &self,
        _context: &dyn BuildContext,
        instance: Instance,
        _name: &str,
    ) -> ContainerResult<Option<Instance>> {
        Ok(Some(instance))
    }

    /// 注入属性前调用，返回应当接受注入的实例
    fn on_set_property(&self, instance: Instance, _name: &str) -> Instance {
        instance
    }
}
