//! 前置与后置通知
//!
//! 只关心调用前或调用后的处理器可以实现 [`BeforeAdvice`] 或 [`AfterAdvice`]，
//! 再由 [`BeforeHandler`] / [`AfterHandler`] 适配为 [`InvocationHandler`]。

use sprig_common::{
    Arguments, Instance, Invocation, InvocationHandler, InvocationResult, Managed, MethodDescriptor,
    ReturnValue, TypeMeta,
};

/// 前置通知
pub trait BeforeAdvice: Send + Sync {
    /// 调用原始实例之前执行，可以改写参数；返回错误时不再调用原始实例
    fn before(&self, target: &Instance, method: &MethodDescriptor, arguments: &mut Arguments) -> InvocationResult<()>;
}

/// 后置通知
pub trait AfterAdvice: Send + Sync {
    /// 原始实例成功返回后执行，可以替换返回值
    fn after(&self, target: &Instance, method: &MethodDescriptor, value: ReturnValue) -> InvocationResult<ReturnValue>;
}

/// 前置通知适配器
#[derive(Debug, Default)]
pub struct BeforeHandler<A> {
    advice: A,
}

impl<A: BeforeAdvice> BeforeHandler<A> {
    /// 包装前置通知
    pub const fn new(advice: A) -> Self {
        Self { advice }
    }

    /// 被包装的通知
    pub const fn advice(&self) -> &A {
        &self.advice
    }
}

impl<A: BeforeAdvice> InvocationHandler for BeforeHandler<A> {
    fn invoke(&self, mut invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
        let method = *invocation.method();
        let target = invocation.target();
        self.advice.before(target, &method, invocation.arguments_mut())?;
        invocation.proceed()
    }
}

impl<A: BeforeAdvice + 'static> Managed for BeforeHandler<A> {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn InvocationHandler>(|it| it)
            .build()
    }
}

/// 后置通知适配器
#[derive(Debug, Default)]
pub struct AfterHandler<A> {
    advice: A,
}

impl<A: AfterAdvice> AfterHandler<A> {
    /// 包装后置通知
    pub const fn new(advice: A) -> Self {
        Self { advice }
    }

    /// 被包装的通知
    pub const fn advice(&self) -> &A {
        &self.advice
    }
}

impl<A: AfterAdvice> InvocationHandler for AfterHandler<A> {
    fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
        let method = *invocation.method();
        let target = invocation.target();
        let value = invocation.proceed()?;
        self.advice.after(target, &method, value)
    }
}

impl<A: AfterAdvice + 'static> Managed for AfterHandler<A> {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn InvocationHandler>(|it| it)
            .build()
    }
}
