//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义类型描述、组件定义和容器扩展点的核心接口。
//!
//! ## 核心接口
//!
//! - [`TypeDescriptor`] / [`TypeCatalog`] - 类型描述与类型目录
//! - [`ComponentScanner`] - 组件扫描器接口
//! - [`ComponentDefinition`] - 组件定义
//! - [`PostProcessor`] / [`BuildContext`] - 后置处理器扩展点
//! - [`ValueResolver`] - 值解析器接口
//! - [`ComponentLookup`] - 组件查找接口

pub mod args;
pub mod catalog;
pub mod container;
pub mod definition;
pub mod descriptor;
pub mod post_processor;
pub mod resolver;
pub mod scanner;

pub use args::*;
pub use catalog::*;
pub use container::*;
pub use definition::*;
pub use descriptor::*;
pub use post_processor::*;
pub use resolver::*;
pub use scanner::*;
