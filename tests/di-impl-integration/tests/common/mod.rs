//! 集成测试共用工具

use std::sync::{Arc, Once};

use config_impl::PropertyResolver;
use di_abstractions::TypeCatalog;
use di_impl::{Container, ContainerBuilder};
use sprig_common::ContainerResult;

static INIT_LOGGER: Once = Once::new();

pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt().with_env_filter("debug").try_init().ok();
    });
}

/// 以空属性源构建容器
pub fn build(catalog: TypeCatalog) -> ContainerResult<Arc<Container>> {
    init_logger();
    ContainerBuilder::new(catalog)
        .with_value_resolver(Arc::new(PropertyResolver::empty()))
        .build()
}
