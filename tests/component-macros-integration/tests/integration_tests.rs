//! `#[interceptable]` 生成代理的运行时行为

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use component_macros::interceptable;
use sprig_common::{
    Instance, Invocation, InvocationError, InvocationHandler, InvocationResult, Managed, ProxyContract,
    ReturnValue, TypeMeta,
};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("余额不足: {0}")]
    Insufficient(u64),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

#[interceptable]
pub trait Account {
    #[tag(audited)]
    fn withdraw(&self, amount: u64, memo: String) -> Result<u64, AccountError>;

    fn balance(&self) -> Result<u64, AccountError>;
}

pub struct SimpleAccount {
    balance: AtomicUsize,
}

impl SimpleAccount {
    fn new(balance: usize) -> Self {
        Self {
            balance: AtomicUsize::new(balance),
        }
    }
}

impl Account for SimpleAccount {
    fn withdraw(&self, amount: u64, _memo: String) -> Result<u64, AccountError> {
        let current = self.balance.load(Ordering::SeqCst) as u64;
        if amount > current {
            return Err(AccountError::Insufficient(current));
        }
        self.balance.fetch_sub(amount as usize, Ordering::SeqCst);
        Ok(current - amount)
    }

    fn balance(&self) -> Result<u64, AccountError> {
        Ok(self.balance.load(Ordering::SeqCst) as u64)
    }
}

impl Managed for SimpleAccount {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .interceptable::<dyn Account>(|it| it)
            .build()
    }
}

/// 记录调用并改写备注
#[derive(Default)]
struct AuditHandler {
    log: Mutex<Vec<String>>,
}

impl InvocationHandler for AuditHandler {
    fn invoke(&self, mut invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
        let method = *invocation.method();
        if method.has_tag("audited") {
            let memo = invocation.arguments().get::<String>(1).cloned().unwrap_or_default();
            invocation.arguments_mut().replace(1, format!("[audit] {memo}"))?;
            let memo = invocation.arguments().get::<String>(1).cloned().unwrap_or_default();
            self.log.lock().unwrap().push(format!("{method}: {memo}"));
        } else {
            self.log.lock().unwrap().push(method.to_string());
        }
        invocation.proceed()
    }
}

/// 总是返回错误类型的值
struct WrongReturn;

impl InvocationHandler for WrongReturn {
    fn invoke(&self, _invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
        Ok(Box::new("not a number"))
    }
}

fn proxy(handler: Arc<dyn InvocationHandler>) -> (Arc<dyn Account>, Instance) {
    let original = Instance::new(SimpleAccount::new(100));
    let proxy = <dyn Account as ProxyContract>::create_proxy(original.clone(), handler);
    (proxy, original)
}

#[test]
fn calls_are_routed_through_the_handler() {
    let handler = Arc::new(AuditHandler::default());
    let (account, _) = proxy(handler.clone());

    assert_eq!(account.withdraw(30, "coffee".into()).unwrap(), 70);
    assert_eq!(account.balance().unwrap(), 70);
    assert_eq!(
        handler.log.lock().unwrap().as_slice(),
        ["Account::withdraw: [audit] coffee", "Account::balance"]
    );
}

#[test]
fn target_errors_keep_their_type() {
    let (account, _) = proxy(Arc::new(AuditHandler::default()));
    match account.withdraw(500, "car".into()) {
        Err(AccountError::Insufficient(balance)) => assert_eq!(balance, 100),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn wrong_return_type_is_reported() {
    let (account, _) = proxy(Arc::new(WrongReturn));
    assert!(matches!(
        account.balance(),
        Err(AccountError::Invocation(InvocationError::ReturnTypeMismatch { .. }))
    ));
}

#[test]
fn proxy_targets_the_original_instance() {
    let (account, original) = proxy(Arc::new(AuditHandler::default()));
    account.withdraw(10, String::new()).unwrap();
    let direct = original.cast::<dyn Account>().unwrap();
    assert_eq!(direct.balance().unwrap(), 90);
}

#[test]
fn missing_contract_is_reported() {
    #[derive(Default)]
    struct Plain;
    impl Managed for Plain {
        fn type_meta() -> TypeMeta {
            TypeMeta::of::<Self>()
        }
    }

    let target = Instance::new(Plain);
    let account = <dyn Account as ProxyContract>::create_proxy(target, Arc::new(AuditHandler::default()));
    assert!(matches!(
        account.balance(),
        Err(AccountError::Invocation(InvocationError::ContractMissing { contract: "Account", .. }))
    ));
}
