//! # 依赖注入具体实现
//!
//! 提供具体的依赖注入容器、组件定义注册和容器构建器实现
//!
//! ## 主要组件
//!
//! - [`Container`] - 多阶段构建的依赖注入容器
//! - [`ContainerBuilder`] - 扫描类型目录并启动容器
//! - [`CatalogScanner`] - 基于类型目录的组件扫描器
//! - [`global`] - 可选的全局容器句柄

pub mod builder;
pub mod container;
pub mod global;
pub mod registry;
pub mod scanner;

pub use builder::{ContainerBuilder, SETTINGS_SECTION};
pub use container::Container;
pub use registry::{create_definitions, DefinitionMap};
pub use scanner::CatalogScanner;
