//! # AOP
//!
//! 基于调用处理器的拦截代理。
//!
//! ## 组成
//!
//! - [`ProxyResolver`] - 为实例的可代理契约生成代理
//! - [`InterceptionPostProcessor`] - 按拦截标记替换组件实例的后置处理器
//! - [`BeforeHandler`] / [`AfterHandler`] - 前置与后置通知适配器
//! - [`TransactionManager`] - 声明式事务处理器

pub mod advice;
pub mod interception;
pub mod proxy;
pub mod transaction;

pub use advice::*;
pub use interception::*;
pub use proxy::*;
pub use transaction::*;

#[cfg(test)]
mod fixtures;
