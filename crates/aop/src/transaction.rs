//! 声明式事务
//!
//! [`TransactionManager`] 作为调用处理器包裹带 `transactional` 标记的组件：
//! 调用前从 [`TransactionalResource`] 取得连接并关闭自动提交，成功返回后提交，
//! 出错时回滚。事务期间连接绑定在当前线程，可通过 [`with_current_connection`] 使用。

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use di_abstractions::{Constructor, ParamSpec, TypeDescriptor};
use sprig_common::{
    BoxError, Instance, Invocation, InvocationError, InvocationHandler, InvocationResult, Managed, ReturnValue,
    TypeMeta,
};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// 默认的事务处理器组件名称
pub const DEFAULT_TRANSACTION_MANAGER: &str = "platformTransactionManager";

/// 事务处理器的类型名称
pub const TRANSACTION_MANAGER_TYPE: &str = "sprig.aop.PlatformTransactionManager";

/// 事务错误类型
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("无法开启事务: {source}")]
    Begin { source: BoxError },

    #[error("事务提交失败: {source}")]
    Commit { source: BoxError },

    #[error("事务回滚失败: {suppressed}, 原始错误: {cause}")]
    Rollback {
        #[source]
        cause: InvocationError,
        suppressed: BoxError,
    },
}

impl From<TransactionError> for InvocationError {
    fn from(error: TransactionError) -> Self {
        Self::handler(error)
    }
}

/// 事务连接
///
/// 方法均以共享引用调用，同一事务内的嵌套调用可同时持有连接。
pub trait TransactionConnection: Send + Sync {
    /// 是否自动提交
    fn auto_commit(&self) -> Result<bool, BoxError>;

    /// 设置自动提交
    fn set_auto_commit(&self, enabled: bool) -> Result<(), BoxError>;

    /// 提交
    fn commit(&self) -> Result<(), BoxError>;

    /// 回滚
    fn rollback(&self) -> Result<(), BoxError>;

    /// 事务结束后释放连接
    fn close(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// 可开启事务的资源，例如连接池
pub trait TransactionalResource: Send + Sync {
    /// 取得一个新连接
    fn connection(&self) -> Result<Box<dyn TransactionConnection>, BoxError>;
}

/// 进行中的事务
pub struct TransactionStatus {
    id: Uuid,
    started_at: DateTime<Utc>,
    connection: Arc<dyn TransactionConnection>,
}

impl TransactionStatus {
    fn new(connection: Box<dyn TransactionConnection>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            connection: Arc::from(connection),
        }
    }

    /// 事务标识
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 开始时间
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// 事务连接
    pub fn connection(&self) -> Arc<dyn TransactionConnection> {
        Arc::clone(&self.connection)
    }

    /// 使用事务连接
    pub fn with_connection<R>(&self, f: impl FnOnce(&dyn TransactionConnection) -> R) -> R {
        f(self.connection.as_ref())
    }
}

impl fmt::Debug for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionStatus")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<TransactionStatus>>> = const { RefCell::new(None) };
}

/// 当前线程上的事务
pub fn current_transaction() -> Option<Arc<TransactionStatus>> {
    CURRENT.with(|current| current.borrow().clone())
}

/// 当前线程事务的连接
pub fn current_connection() -> Option<Arc<dyn TransactionConnection>> {
    current_transaction().map(|status| status.connection())
}

/// 使用当前线程事务的连接，没有事务时返回 `None`
pub fn with_current_connection<R>(f: impl FnOnce(&dyn TransactionConnection) -> R) -> Option<R> {
    current_connection().map(|connection| f(connection.as_ref()))
}

/// 事务在当前线程上的绑定，离开作用域时解除
struct Binding;

impl Binding {
    fn bind(status: Arc<TransactionStatus>) -> Self {
        CURRENT.with(|current| *current.borrow_mut() = Some(status));
        Self
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        CURRENT.with(|current| current.borrow_mut().take());
    }
}

/// 事务处理器
///
/// 当前线程已有事务时直接加入，不开启新事务。
pub struct TransactionManager {
    resource: Arc<dyn TransactionalResource>,
}

impl TransactionManager {
    /// 基于资源创建事务处理器
    pub fn new(resource: Arc<dyn TransactionalResource>) -> Self {
        Self { resource }
    }

    /// 可注册到类型目录的类型描述，构造时注入唯一的 [`TransactionalResource`]
    pub fn descriptor() -> TypeDescriptor {
        TypeDescriptor::component::<Self>(TRANSACTION_MANAGER_TYPE)
            .named(DEFAULT_TRANSACTION_MANAGER)
            .constructor(Constructor::new(
                vec![ParamSpec::autowired::<dyn TransactionalResource>("resource")],
                |args| {
                    let resource = args.component::<dyn TransactionalResource>(0)?;
                    Ok(Instance::new(Self::new(resource)))
                },
            ))
    }

    fn begin(&self) -> Result<(Arc<TransactionStatus>, bool), TransactionError> {
        let connection = self
            .resource
            .connection()
            .map_err(|source| TransactionError::Begin { source })?;
        let auto_commit = connection
            .auto_commit()
            .map_err(|source| TransactionError::Begin { source })?;
        if auto_commit {
            connection
                .set_auto_commit(false)
                .map_err(|source| TransactionError::Begin { source })?;
        }
        Ok((Arc::new(TransactionStatus::new(connection)), auto_commit))
    }

    fn complete(status: &TransactionStatus, result: InvocationResult<ReturnValue>) -> InvocationResult<ReturnValue> {
        match result {
            Ok(value) => match status.with_connection(|connection| connection.commit()) {
                Ok(()) => {
                    debug!("事务 {} 已提交", status.id());
                    Ok(value)
                }
                Err(source) => {
                    warn!("事务 {} 提交失败: {}", status.id(), source);
                    if let Err(e) = status.with_connection(|connection| connection.rollback()) {
                        warn!("事务 {} 回滚失败: {}", status.id(), e);
                    }
                    Err(TransactionError::Commit { source }.into())
                }
            },
            Err(cause) => {
                warn!("事务 {} 回滚, 原因: {}", status.id(), cause);
                match status.with_connection(|connection| connection.rollback()) {
                    Ok(()) => Err(cause),
                    Err(suppressed) => Err(TransactionError::Rollback { cause, suppressed }.into()),
                }
            }
        }
    }

    fn release(status: &TransactionStatus, auto_commit: bool) {
        status.with_connection(|connection| {
            if auto_commit {
                if let Err(e) = connection.set_auto_commit(true) {
                    warn!("事务 {} 恢复自动提交失败: {}", status.id(), e);
                }
            }
            if let Err(e) = connection.close() {
                warn!("事务 {} 关闭连接失败: {}", status.id(), e);
            }
        });
    }
}

impl InvocationHandler for TransactionManager {
    fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
        if let Some(status) = current_transaction() {
            debug!("{} 加入已存在的事务 {}", invocation.method(), status.id());
            return invocation.proceed();
        }

        let (status, auto_commit) = self.begin()?;
        debug!("{} 开启事务 {}", invocation.method(), status.id());
        let result = {
            let _binding = Binding::bind(Arc::clone(&status));
            invocation.proceed()
        };
        let outcome = Self::complete(&status, result);
        Self::release(&status, auto_commit);
        outcome
    }
}

impl Managed for TransactionManager {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn InvocationHandler>(|it| it)
            .build()
    }
}

impl fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManager").finish_non_exhaustive()
    }
}
