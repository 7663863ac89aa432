//! 方法调用模型
//!
//! 代理把每一次契约方法调用转换为一个 [`Invocation`] 交给 [`InvocationHandler`]。
//! 处理器可以检查或替换参数，然后通过 [`Invocation::proceed`] 调用原始实例。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::errors::{InvocationError, InvocationResult};
use crate::instance::Instance;

/// 类型擦除后的返回值
pub type ReturnValue = Box<dyn Any + Send>;

/// 调用原始实例的回调
pub type Proceed<'a> = &'a (dyn Fn(&Instance, Arguments) -> InvocationResult<ReturnValue> + 'a);

/// 被调用方法的描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    contract: &'static str,
    name: &'static str,
    tags: &'static [&'static str],
}

impl MethodDescriptor {
    /// 创建方法描述
    pub const fn new(contract: &'static str, name: &'static str) -> Self {
        Self {
            contract,
            name,
            tags: &[],
        }
    }

    /// 附加方法标签，处理器可据此决定是否拦截
    #[must_use]
    pub const fn with_tags(mut self, tags: &'static [&'static str]) -> Self {
        self.tags = tags;
        self
    }

    /// 方法标签
    pub fn tags(&self) -> &'static [&'static str] {
        self.tags
    }

    /// 是否带有某个标签
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }

    /// 所属契约名称
    pub fn contract(&self) -> &'static str {
        self.contract
    }

    /// 方法名称
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.contract, self.name)
    }
}

/// 调用参数
pub struct Arguments {
    method: MethodDescriptor,
    values: Vec<Option<Box<dyn Any + Send>>>,
}

impl Arguments {
    /// 由装箱的参数值创建
    pub fn new(method: MethodDescriptor, values: Vec<Box<dyn Any + Send>>) -> Self {
        Self {
            method,
            values: values.into_iter().map(Some).collect(),
        }
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 读取第 `index` 个参数
    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        self.values
            .get(index)
            .and_then(Option::as_ref)
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// 可变地读取第 `index` 个参数
    pub fn get_mut<T: 'static>(&mut self, index: usize) -> Option<&mut T> {
        self.values
            .get_mut(index)
            .and_then(Option::as_mut)
            .and_then(|value| value.downcast_mut::<T>())
    }

    /// 替换第 `index` 个参数，新值必须与原值类型一致
    pub fn replace<T: Any + Send>(&mut self, index: usize, value: T) -> InvocationResult<()> {
        if let Some(slot) = self.get_mut::<T>(index) {
            *slot = value;
            return Ok(());
        }
        Err(self.mismatch::<T>(index))
    }

    /// 取出第 `index` 个参数的所有权
    pub fn take<T: 'static>(&mut self, index: usize) -> InvocationResult<T> {
        let value = self
            .values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| self.mismatch::<T>(index))?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                self.values[index] = Some(value);
                Err(self.mismatch::<T>(index))
            }
        }
    }

    fn mismatch<T>(&self, index: usize) -> InvocationError {
        InvocationError::ArgumentMismatch {
            method: self.method.to_string(),
            index,
            expected: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("method", &self.method.to_string())
            .field("len", &self.values.len())
            .finish()
    }
}

/// 一次被拦截的方法调用
pub struct Invocation<'a> {
    target: &'a Instance,
    method: MethodDescriptor,
    arguments: Arguments,
    proceed: Proceed<'a>,
}

impl<'a> Invocation<'a> {
    /// 创建调用
    pub fn new(
        target: &'a Instance,
        method: MethodDescriptor,
        arguments: Arguments,
        proceed: Proceed<'a>,
    ) -> Self {
        Self {
            target,
            method,
            arguments,
            proceed,
        }
    }

    /// 原始实例
    pub fn target(&self) -> &'a Instance {
        self.target
    }

    /// 被调用的方法
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    /// 调用参数
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// 可变的调用参数
    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// 使用当前参数调用原始实例
    pub fn proceed(self) -> InvocationResult<ReturnValue> {
        (self.proceed)(self.target, self.arguments)
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("target", self.target)
            .field("method", &self.method)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// 调用处理器
///
/// 代理上的每个契约方法都会经由处理器，处理器可以在调用原始实例前后附加行为。
pub trait InvocationHandler: Send + Sync {
    /// 处理一次调用
    fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult<ReturnValue>;
}

/// 可被代理的契约
///
/// 由 `#[interceptable]` 为 `dyn Trait` 生成实现。
pub trait ProxyContract: Send + Sync + 'static {
    /// 创建转发到处理器的代理
    fn create_proxy(target: Instance, handler: Arc<dyn InvocationHandler>) -> Arc<Self>;
}
