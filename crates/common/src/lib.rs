//! # Sprig Common
//!
//! Sprig 容器的公共基础：运行时类型元数据、组件实例句柄、属性值和方法调用模型。
//!
//! ## 核心类型
//!
//! - [`Instance`] - 组件实例句柄
//! - [`TypeMeta`] / [`Managed`] - 运行时类型元数据
//! - [`DeclaredType`] - 组件定义上的声明类型
//! - [`PropertyValue`] / [`ValueType`] - 可注入的属性值
//! - [`InvocationHandler`] / [`Invocation`] - 代理的调用模型
//! - [`ContainerError`] - 容器错误类型

pub mod errors;
pub mod instance;
pub mod invocation;
pub mod metadata;
pub mod value;

pub use errors::*;
pub use instance::*;
pub use invocation::*;
pub use metadata::*;
pub use value::*;
