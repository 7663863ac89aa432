//! 容器构建器
//!
//! 收集扫描包和导入的类型名称，生成组件定义并启动容器。

use std::collections::BTreeSet;
use std::sync::Arc;

use config_impl::PropertyResolver;
use di_abstractions::{ComponentScanner, ContainerSettings, TypeCatalog, ValueResolver};
use sprig_common::{ContainerResult, PropertyError};
use tracing::{debug, info, warn};

use crate::container::Container;
use crate::global;
use crate::registry::create_definitions;
use crate::scanner::CatalogScanner;

/// 配置中容器设置所在的节
pub const SETTINGS_SECTION: &str = "container";

/// 容器构建器
pub struct ContainerBuilder {
    catalog: Arc<TypeCatalog>,
    settings: ContainerSettings,
    scanners: Vec<Box<dyn ComponentScanner>>,
    resolver: Option<Arc<dyn ValueResolver>>,
}

impl ContainerBuilder {
    /// 基于类型目录创建构建器
    pub fn new(catalog: TypeCatalog) -> Self {
        Self::from_shared(Arc::new(catalog))
    }

    /// 基于共享的类型目录创建构建器
    pub fn from_shared(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            scanners: vec![Box::new(CatalogScanner::new(Arc::clone(&catalog)))],
            catalog,
            settings: ContainerSettings::default(),
            resolver: None,
        }
    }

    /// 增加扫描包
    #[must_use]
    pub fn scan(mut self, package: impl Into<String>) -> Self {
        self.settings.scan_packages.push(package.into());
        self
    }

    /// 导入一个类型
    #[must_use]
    pub fn import(mut self, type_name: impl Into<String>) -> Self {
        self.settings.imports.push(type_name.into());
        self
    }

    /// 增加额外的扫描器
    #[must_use]
    pub fn with_scanner(mut self, scanner: Box<dyn ComponentScanner>) -> Self {
        self.scanners.push(scanner);
        self
    }

    /// 指定值解析器
    #[must_use]
    pub fn with_value_resolver(mut self, resolver: Arc<dyn ValueResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// 合并容器设置
    #[must_use]
    pub fn with_settings(mut self, settings: ContainerSettings) -> Self {
        self.settings.scan_packages.extend(settings.scan_packages);
        self.settings.imports.extend(settings.imports);
        self.settings.install_global |= settings.install_global;
        self
    }

    /// 使用属性解析器作为值解析器，并合并其中 `container` 节的设置
    pub fn with_properties(self, resolver: PropertyResolver) -> ContainerResult<Self> {
        let settings = match resolver.bind_section::<ContainerSettings>(SETTINGS_SECTION) {
            Ok(settings) => settings,
            Err(PropertyError::NotFound { .. }) => ContainerSettings::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(self.with_settings(settings).with_value_resolver(Arc::new(resolver)))
    }

    /// 构建完成后是否安装为全局容器
    #[must_use]
    pub fn install_global(mut self, install: bool) -> Self {
        self.settings.install_global = install;
        self
    }

    /// 构建并启动容器
    pub fn build(self) -> ContainerResult<Arc<Container>> {
        let type_names = self.scan_type_names()?;
        info!("共收集到 {} 个候选类型", type_names.len());
        let definitions = create_definitions(&self.catalog, &type_names)?;
        info!("共注册 {} 个组件定义", definitions.len());

        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(PropertyResolver::from_env()));
        let container = Arc::new(Container::start(definitions, resolver)?);
        if self.settings.install_global {
            global::install(Arc::clone(&container));
        }
        Ok(container)
    }

    fn scan_type_names(&self) -> ContainerResult<BTreeSet<String>> {
        let packages = if self.settings.scan_packages.is_empty() {
            vec![String::new()]
        } else {
            self.settings.scan_packages.clone()
        };

        let mut names = BTreeSet::new();
        for package in &packages {
            debug!("扫描包: '{}'", package);
            for scanner in self.scanners.iter().filter(|scanner| scanner.supports(package)) {
                names.extend(scanner.scan(package)?);
            }
        }
        for import in &self.settings.imports {
            if names.insert(import.clone()) {
                debug!("导入类型: {}", import);
            } else {
                warn!("导入的类型 {} 已被扫描, 忽略", import);
            }
        }
        Ok(names)
    }
}
