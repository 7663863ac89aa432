//! 值解析器抽象接口
//!
//! 构造参数和注入点上的值标记通过 [`ValueResolver`] 解析为具体的属性值。

use sprig_common::{PropertyError, PropertyResult, PropertyValue, ValueType};

/// 值解析器 trait
pub trait ValueResolver: Send + Sync {
    /// 解析表达式并转换为指定类型，键不存在且没有默认值时返回 `None`
    fn resolve(&self, expression: &str, value_type: ValueType) -> PropertyResult<Option<PropertyValue>>;

    /// 解析表达式，缺失时返回错误
    fn resolve_required(&self, expression: &str, value_type: ValueType) -> PropertyResult<PropertyValue> {
        self.resolve(expression, value_type)?
            .ok_or_else(|| PropertyError::NotFound {
                key: expression.to_string(),
            })
    }
}
