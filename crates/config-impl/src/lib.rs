//! # Configuration Implementation
//!
//! 值注入所需的属性解析实现。
//!
//! ## 主要组件
//!
//! - [`PropertyResolver`] - 属性解析器，实现 [`di_abstractions::ValueResolver`]
//! - [`PropertyResolverBuilder`] - 组合环境变量、配置文件和显式属性
//! - [`convert()`] - 字符串到属性值的类型转换

pub mod convert;
pub mod resolver;

pub use convert::{convert, parse_duration};
pub use resolver::{PropertyResolver, PropertyResolverBuilder};
