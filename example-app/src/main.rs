//! # 示例应用程序
//!
//! 演示如何用 Sprig 容器装配一个小商店：值注入、工厂方法、拦截代理和事务。

mod components;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use config_impl::PropertyResolver;
use di_abstractions::ComponentLookup;
use di_impl::{global, Container, ContainerBuilder};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::components::{AuditLog, Greeting, Orders, ShopError};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Sprig 示例应用")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config/app.toml")]
    config: String,

    /// 环境变量前缀，例如 SHOP_APP_GREETING 覆盖 app.greeting
    #[arg(long, default_value = "SHOP")]
    env_prefix: String,

    /// 日志过滤规则
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// 演示参数
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DemoSettings {
    customers: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(args.log_level.as_str())
        .init();

    info!("启动 Sprig 示例应用");

    let properties = load_properties(&args)?;
    let demo = match properties.bind_section::<DemoSettings>("demo") {
        Ok(demo) => demo,
        Err(e) => {
            warn!("未找到演示参数, 使用默认值: {}", e);
            DemoSettings::default()
        }
    };

    let container = build_container(properties)?;

    let result = run_demo(&demo);
    if let Err(e) = &result {
        error!("演示失败: {:#}", e);
    }

    container.close().context("关闭容器失败")?;
    info!("应用已关闭");
    result
}

/// 加载配置
fn load_properties(args: &Args) -> anyhow::Result<PropertyResolver> {
    if !std::path::Path::new(&args.config).exists() {
        info!("配置文件 {} 不存在，将使用默认配置和环境变量", args.config);
    }
    PropertyResolver::builder()
        .with_optional_file(&args.config)
        .with_env_prefix(&args.env_prefix)
        .build()
        .context("加载配置失败")
}

/// 构建容器
fn build_container(properties: PropertyResolver) -> anyhow::Result<Arc<Container>> {
    info!("构建容器");
    let container = ContainerBuilder::new(components::catalog())
        .with_properties(properties)?
        .install_global(true)
        .build()
        .context("构建容器失败")?;
    info!("容器构建完成, 共 {} 个组件: {:?}", container.len(), container.component_names());
    Ok(container)
}

/// 通过全局容器运行演示
fn run_demo(demo: &DemoSettings) -> anyhow::Result<()> {
    let container = global::required()?;

    let greeting = container.get_by_type::<dyn Greeting>()?;
    let orders = container.get::<dyn Orders>("orders")?;
    for (index, customer) in demo.customers.iter().enumerate() {
        info!("{}", greeting.greet(customer.clone())?);
        let id = orders.place(customer.clone(), u32::try_from(index + 1)?)?;
        info!("{} 的订单号: {}", customer, id);
    }

    match orders.place("nobody".into(), 0) {
        Err(ShopError::EmptyOrder) => info!("空订单被拒绝, 事务已回滚"),
        other => warn!("空订单未被拒绝: {:?}", other),
    }

    let audit = container.get::<AuditLog>("auditLog")?;
    for entry in audit.entries() {
        info!("审计: {}", entry);
    }
    Ok(())
}
