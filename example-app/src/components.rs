//! 示例组件
//!
//! 一个小商店：问候服务经由礼貌处理器拦截，下单服务运行在事务中，
//! 邮件服务由工厂方法生产，审计日志带有初始化和销毁钩子。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aop::{
    with_current_connection, InterceptionPostProcessor, TransactionConnection, TransactionManager,
    TransactionalResource, AROUND_MARKER, DEFAULT_TRANSACTION_MANAGER, TRANSACTIONAL_MARKER,
};
use component_macros::interceptable;
use di_abstractions::{
    Argument, Constructor, FactoryMethod, InjectionPoint, ParamSpec, TypeCatalog, TypeDescriptor,
};
use parking_lot::Mutex;
use sprig_common::{
    BoxError, DeclaredType, Instance, Invocation, InvocationError, InvocationHandler, InvocationResult,
    Managed, ReturnValue, TypeMeta,
};
use tracing::info;

/// 商店业务错误
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error("商品数量必须大于零")]
    EmptyOrder,
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

/// 问候服务
#[interceptable]
pub trait Greeting {
    #[tag(polite)]
    fn greet(&self, customer: String) -> Result<String, ShopError>;
}

/// 下单服务
#[interceptable]
pub trait Orders {
    fn place(&self, customer: String, quantity: u32) -> Result<u64, ShopError>;
}

/// 邮件发送
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, body: &str);
}

/// 控制台问候服务，问候语来自配置
pub struct ConsoleGreeting {
    greeting: String,
}

impl Greeting for ConsoleGreeting {
    fn greet(&self, customer: String) -> Result<String, ShopError> {
        Ok(format!("{}, {}.", self.greeting, customer))
    }
}

impl Managed for ConsoleGreeting {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .interceptable::<dyn Greeting>(|it| it)
            .marker(AROUND_MARKER, "politeHandler")
            .build()
    }
}

/// 把带 `polite` 标签的方法返回值末尾的句号换成感叹号
#[derive(Debug, Default)]
pub struct PoliteHandler;

impl InvocationHandler for PoliteHandler {
    fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
        let polite = invocation.method().has_tag("polite");
        let value = invocation.proceed()?;
        if !polite {
            return Ok(value);
        }
        match value.downcast::<String>() {
            Ok(text) => match text.strip_suffix('.') {
                Some(stripped) => Ok(Box::new(format!("{stripped}!"))),
                None => Ok(text),
            },
            Err(value) => Ok(value),
        }
    }
}

impl Managed for PoliteHandler {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn InvocationHandler>(|it| it)
            .build()
    }
}

/// 审计日志
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<Vec<String>>,
}

impl AuditLog {
    /// 追加一条记录，超出容量时丢弃最早的记录
    pub fn record(&self, entry: impl Into<String>) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.remove(0);
        }
        entries.push(entry.into());
    }

    /// 全部记录
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl Managed for AuditLog {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

/// 控制台邮件
pub struct ConsoleMailer {
    sender: String,
}

impl Mailer for ConsoleMailer {
    fn send(&self, to: &str, body: &str) {
        info!("[mail] {} -> {}: {}", self.sender, to, body);
    }
}

impl Managed for ConsoleMailer {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn Mailer>(|it| it)
            .operation("connect", |mailer: &Self| {
                info!("邮件服务 {} 已连接", mailer.sender);
                Ok(())
            })
            .operation("disconnect", |mailer: &Self| {
                info!("邮件服务 {} 已断开", mailer.sender);
                Ok(())
            })
            .build()
    }
}

/// 邮件配置，工厂所有者
pub struct MailConfig;

impl Managed for MailConfig {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

/// 事务内下单
pub struct OrderService {
    next_id: AtomicU64,
    mailer: Arc<dyn Mailer>,
    audit: Mutex<Option<Arc<AuditLog>>>,
}

impl Orders for OrderService {
    fn place(&self, customer: String, quantity: u32) -> Result<u64, ShopError> {
        if quantity == 0 {
            return Err(ShopError::EmptyOrder);
        }
        with_current_connection(|connection| {
            info!("订单写入事务连接, auto_commit = {:?}", connection.auto_commit().ok());
        });
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Some(audit) = self.audit.lock().as_ref() {
            audit.record(format!("order #{id}: {customer} x {quantity}"));
        }
        self.mailer.send(&customer, &format!("订单 #{id} 已确认"));
        Ok(id)
    }
}

impl Managed for OrderService {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .interceptable::<dyn Orders>(|it| it)
            .marker(TRANSACTIONAL_MARKER, DEFAULT_TRANSACTION_MANAGER)
            .build()
    }
}

/// 打印事务动作的内存连接
struct LoggingConnection {
    auto_commit: AtomicBool,
}

impl TransactionConnection for LoggingConnection {
    fn auto_commit(&self) -> Result<bool, BoxError> {
        Ok(self.auto_commit.load(Ordering::SeqCst))
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<(), BoxError> {
        self.auto_commit.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<(), BoxError> {
        info!("[db] commit");
        Ok(())
    }

    fn rollback(&self) -> Result<(), BoxError> {
        info!("[db] rollback");
        Ok(())
    }
}

/// 内存连接池
pub struct MemoryPool {
    timeout: Duration,
}

impl TransactionalResource for MemoryPool {
    fn connection(&self) -> Result<Box<dyn TransactionConnection>, BoxError> {
        info!("[db] 打开连接, 超时 {:?}", self.timeout);
        Ok(Box::new(LoggingConnection { auto_commit: AtomicBool::new(true) }))
    }
}

impl Managed for MemoryPool {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn TransactionalResource>(|it| it)
            .build()
    }
}

/// 示例应用的类型目录
pub fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(InterceptionPostProcessor::around_descriptor())
        .with(InterceptionPostProcessor::transactional_descriptor())
        .with(TransactionManager::descriptor())
        .with(
            TypeDescriptor::component::<ConsoleGreeting>("shop.web.ConsoleGreeting")
                .named("greeting")
                .constructor(Constructor::new(
                    vec![ParamSpec::value::<String>("greeting", "${app.greeting:Hello}")],
                    |args| {
                        Ok(Instance::new(ConsoleGreeting {
                            greeting: args.value::<String>(0)?,
                        }))
                    },
                )),
        )
        .with(
            TypeDescriptor::component::<PoliteHandler>("shop.web.PoliteHandler")
                .constructor(Constructor::no_args(PoliteHandler::default)),
        )
        .with(
            TypeDescriptor::component::<AuditLog>("shop.support.AuditLog")
                .order(0)
                .constructor(Constructor::new(
                    vec![ParamSpec::value::<usize>("capacity", "${app.audit_capacity:8}")],
                    |args| {
                        Ok(Instance::new(AuditLog {
                            capacity: args.value::<usize>(0)?,
                            entries: Mutex::new(Vec::new()),
                        }))
                    },
                ))
                .post_construct("open", |audit: &AuditLog| {
                    info!("审计日志已打开, 容量 {}", audit.capacity);
                    Ok(())
                })
                .pre_destroy("flush", |audit: &AuditLog| {
                    info!("审计日志落盘 {} 条记录", audit.entries.lock().len());
                    Ok(())
                }),
        )
        .with(
            TypeDescriptor::configuration::<MailConfig>("shop.support.MailConfig")
                .constructor(Constructor::no_args(|| MailConfig))
                .factory(
                    FactoryMethod::new(
                        "mailer",
                        DeclaredType::contract::<dyn Mailer>(),
                        |_owner, args| {
                            Ok(Instance::new(ConsoleMailer {
                                sender: args.value::<String>(0)?,
                            }))
                        },
                    )
                    .param(ParamSpec::value::<String>("sender", "${app.mail_sender:shop@sprig.dev}"))
                    .init_method("connect")
                    .destroy_method("disconnect"),
                ),
        )
        .with(
            TypeDescriptor::component::<OrderService>("shop.orders.OrderService")
                .named("orders")
                .constructor(Constructor::new(
                    vec![ParamSpec::autowired::<dyn Mailer>("mailer")],
                    |args| {
                        Ok(Instance::new(OrderService {
                            next_id: AtomicU64::new(1),
                            mailer: args.component::<dyn Mailer>(0)?,
                            audit: Mutex::new(None),
                        }))
                    },
                ))
                .inject(
                    InjectionPoint::setter::<OrderService, _>("set_audit", |orders, argument: Argument| {
                        *orders.audit.lock() = argument.into_optional::<AuditLog>()?;
                        Ok(())
                    })
                    .autowired::<AuditLog>(),
                ),
        )
        .with(
            TypeDescriptor::component::<MemoryPool>("shop.db.MemoryPool")
                .constructor(Constructor::new(
                    vec![ParamSpec::value::<Duration>("timeout", "${app.session_timeout:PT30S}")],
                    |args| {
                        Ok(Instance::new(MemoryPool {
                            timeout: args.value::<Duration>(0)?,
                        }))
                    },
                )),
        )
}
