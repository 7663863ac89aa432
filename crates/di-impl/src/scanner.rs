//! 基于类型目录的组件扫描器

use std::collections::BTreeSet;
use std::sync::Arc;

use di_abstractions::{ComponentScanner, TypeCatalog};
use sprig_common::ContainerResult;
use tracing::debug;

/// 在 [`TypeCatalog`] 中按包路径收集类型名称
#[derive(Debug, Clone)]
pub struct CatalogScanner {
    catalog: Arc<TypeCatalog>,
}

impl CatalogScanner {
    /// 创建扫描器
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }
}

impl ComponentScanner for CatalogScanner {
    fn scan(&self, package: &str) -> ContainerResult<BTreeSet<String>> {
        let names: BTreeSet<String> = self
            .catalog
            .names_in_package(package)
            .map(ToString::to_string)
            .collect();
        debug!("包 '{}' 中扫描到 {} 个类型", package, names.len());
        Ok(names)
    }

    fn name(&self) -> &str {
        "CatalogScanner"
    }
}
