//! 解析后的参数
//!
//! 容器为构造函数、工厂方法和注入点解析出的参数值。

use std::sync::Arc;

use sprig_common::{BoxError, FromPropertyValue, Instance, PropertyValue};

/// 一个已解析的参数
#[derive(Debug, Clone)]
pub enum Argument {
    /// 属性值
    Value(PropertyValue),
    /// 依赖组件
    Component(Instance),
    /// 可选依赖未找到
    Absent,
}

impl Argument {
    /// 取出属性值
    pub fn into_value<T: FromPropertyValue>(self) -> Result<T, BoxError> {
        match self {
            Self::Value(value) => {
                let found = value.value_type();
                T::from_property(value).ok_or_else(|| {
                    format!("属性值类型 {found} 与期望类型 {} 不符", T::VALUE_TYPE).into()
                })
            }
            other => Err(format!("期望属性值, 实际为 {other:?}").into()),
        }
    }

    /// 以类型 `U` 取出依赖组件
    pub fn into_component<U: ?Sized + 'static>(self) -> Result<Arc<U>, BoxError> {
        self.into_optional::<U>()?.ok_or_else(|| {
            format!("缺少类型为 {} 的依赖组件", std::any::type_name::<U>()).into()
        })
    }

    /// 以类型 `U` 取出可选依赖组件
    pub fn into_optional<U: ?Sized + 'static>(self) -> Result<Option<Arc<U>>, BoxError> {
        match self {
            Self::Component(instance) => instance.cast::<U>().map(Some).ok_or_else(|| {
                format!(
                    "组件 {} 无法作为 {} 使用",
                    instance.type_name(),
                    std::any::type_name::<U>()
                )
                .into()
            }),
            Self::Absent => Ok(None),
            Self::Value(value) => Err(format!("期望依赖组件, 实际为属性值 {value:?}").into()),
        }
    }
}

/// 按参数声明顺序排列的已解析参数
#[derive(Debug, Clone, Default)]
pub struct ResolvedArgs {
    values: Vec<Argument>,
}

impl ResolvedArgs {
    /// 创建参数列表
    pub fn new(values: Vec<Argument>) -> Self {
        Self { values }
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 第 `index` 个参数
    pub fn get(&self, index: usize) -> Result<&Argument, BoxError> {
        self.values
            .get(index)
            .ok_or_else(|| format!("参数下标 {index} 越界, 共 {} 个参数", self.values.len()).into())
    }

    /// 第 `index` 个参数作为属性值
    pub fn value<T: FromPropertyValue>(&self, index: usize) -> Result<T, BoxError> {
        self.get(index)?.clone().into_value()
    }

    /// 第 `index` 个参数作为依赖组件
    pub fn component<U: ?Sized + 'static>(&self, index: usize) -> Result<Arc<U>, BoxError> {
        self.get(index)?.clone().into_component()
    }

    /// 第 `index` 个参数作为可选依赖组件
    pub fn optional<U: ?Sized + 'static>(&self, index: usize) -> Result<Option<Arc<U>>, BoxError> {
        self.get(index)?.clone().into_optional()
    }

    /// 第 `index` 个参数的实例句柄
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        match self.values.get(index) {
            Some(Argument::Component(instance)) => Some(instance),
            _ => None,
        }
    }
}
