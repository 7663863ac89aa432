//! 拦截代理与事务的集成测试

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use aop::{
    with_current_connection, InterceptionPostProcessor, ProxyResolver, TransactionConnection, TransactionManager,
    TransactionalResource, AROUND_MARKER, DEFAULT_TRANSACTION_MANAGER, TRANSACTIONAL_MARKER,
};
use common::build;
use component_macros::interceptable;
use di_abstractions::{
    Argument, BuildContext, ComponentLookup, Constructor, InjectionPoint, ParamSpec, PostProcessor, TypeCatalog,
    TypeDescriptor,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use sprig_common::{
    BoxError, ContainerResult, Instance, Invocation, InvocationError, InvocationHandler, InvocationResult, Managed,
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
    #[tag(polite)]
    fn describe(&self, owner: String) -> Result<String, AccountError>;

    fn withdraw(&self, amount: u64) -> Result<u64, AccountError>;
}

/// 记录账户操作
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl Managed for Journal {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

pub struct SavingsAccount {
    balance: AtomicU64,
    journal: OnceCell<Arc<Journal>>,
}

impl SavingsAccount {
    fn new(balance: u64) -> Self {
        Self {
            balance: AtomicU64::new(balance),
            journal: OnceCell::new(),
        }
    }
}

impl Account for SavingsAccount {
    fn describe(&self, owner: String) -> Result<String, AccountError> {
        Ok(format!("{owner} has {}.", self.balance.load(Ordering::SeqCst)))
    }

    fn withdraw(&self, amount: u64) -> Result<u64, AccountError> {
        let current = self.balance.load(Ordering::SeqCst);
        if amount > current {
            return Err(AccountError::Insufficient(current));
        }
        self.balance.store(current - amount, Ordering::SeqCst);
        if let Some(journal) = self.journal.get() {
            journal.record(format!("withdraw {amount}"));
        }
        Ok(current - amount)
    }
}

impl Managed for SavingsAccount {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .interceptable::<dyn Account>(|it| it)
            .marker(AROUND_MARKER, "politeHandler")
            .build()
    }
}

fn savings_account() -> TypeDescriptor {
    TypeDescriptor::component::<SavingsAccount>("bank.SavingsAccount")
        .named("account")
        .constructor(Constructor::no_args(|| SavingsAccount::new(100)))
        .inject(
            InjectionPoint::field::<SavingsAccount, _>("journal", |account, argument: Argument| {
                let journal = argument.into_component::<Journal>()?;
                account
                    .journal
                    .set(journal)
                    .map_err(|_| BoxError::from("journal 已注入"))
            })
            .autowired::<Journal>(),
        )
}

/// 把带 `polite` 标签的方法返回值末尾的句号换成感叹号
#[derive(Debug, Default)]
pub struct PoliteHandler {
    calls: AtomicU64,
}

impl InvocationHandler for PoliteHandler {
    fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
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

/// 通过构造参数依赖账户的柜员
pub struct Teller {
    account: Arc<dyn Account>,
}

impl Managed for Teller {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

fn bank_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(savings_account())
        .with(TypeDescriptor::component::<Journal>("bank.Journal").constructor(Constructor::no_args(Journal::default)))
        .with(
            TypeDescriptor::component::<PoliteHandler>("bank.PoliteHandler")
                .constructor(Constructor::no_args(PoliteHandler::default)),
        )
        .with(
            TypeDescriptor::component::<Teller>("bank.Teller").constructor(Constructor::new(
                vec![ParamSpec::autowired::<dyn Account>("account")],
                |args| {
                    Ok(Instance::new(Teller {
                        account: args.component::<dyn Account>(0)?,
                    }))
                },
            )),
        )
        .with(InterceptionPostProcessor::around_descriptor())
}

#[test]
fn dependents_receive_the_proxy() -> anyhow::Result<()> {
    let container = build(bank_catalog())?;
    let teller = container.get::<Teller>("teller")?;
    assert_eq!(teller.account.describe("Ann".into())?, "Ann has 100!");
    assert_eq!(teller.account.withdraw(40)?, 60);
    assert!(matches!(teller.account.withdraw(500), Err(AccountError::Insufficient(60))));

    let handler = container.get::<PoliteHandler>("politeHandler")?;
    assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    assert!(container.get::<SavingsAccount>("account").is_err());
    Ok(())
}

#[test]
fn injection_lands_on_the_original_instance() -> anyhow::Result<()> {
    let container = build(bank_catalog())?;
    let processor = container.get::<InterceptionPostProcessor>("aroundProxyPostProcessor")?;
    let original = processor.original("account").expect("recorded original");
    let proxy = container.get_instance("account")?;
    assert!(!proxy.ptr_eq(&original));

    let journal = container.get::<Journal>("journal")?;
    let account = original.cast::<SavingsAccount>().expect("concrete account");
    assert!(Arc::ptr_eq(account.journal.get().expect("injected"), &journal));

    container.get::<dyn Account>("account")?.withdraw(10)?;
    assert_eq!(journal.entries(), ["withdraw 10"]);
    Ok(())
}

#[test]
fn pass_through_proxy_matches_the_original() -> anyhow::Result<()> {
    struct PassThrough;

    impl InvocationHandler for PassThrough {
        fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
            invocation.proceed()
        }
    }

    let original = Instance::new(SavingsAccount::new(50));
    let twin = Instance::new(SavingsAccount::new(50));
    let proxy = ProxyResolver::new().create_proxy(&original, Arc::new(PassThrough))?;
    let proxied = proxy.cast::<dyn Account>().expect("account view");
    let direct = twin.cast::<dyn Account>().expect("account view");

    for owner in ["Ann", "Bob", ""] {
        assert_eq!(proxied.describe(owner.into())?, direct.describe(owner.into())?);
    }
    for amount in [10, 20, 500] {
        match (proxied.withdraw(amount), direct.withdraw(amount)) {
            (Ok(left), Ok(right)) => assert_eq!(left, right),
            (Err(AccountError::Insufficient(left)), Err(AccountError::Insufficient(right))) => {
                assert_eq!(left, right);
            }
            other => panic!("results differ: {other:?}"),
        }
    }
    Ok(())
}

static UNWRAPPED: Mutex<Vec<&'static str>> = parking_lot::const_mutex(Vec::new());

/// 给账户套一层透明代理，并记录还原顺序
pub struct Wrapper {
    label: &'static str,
    originals: Mutex<HashMap<String, Instance>>,
}

impl Wrapper {
    fn descriptor(type_name: &str, label: &'static str, order: i32) -> TypeDescriptor {
        TypeDescriptor::component::<Self>(type_name)
            .order(order)
            .constructor(Constructor::no_args(move || Self {
                label,
                originals: Mutex::new(HashMap::new()),
            }))
    }
}

impl Managed for Wrapper {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn PostProcessor>(|it| it)
            .build()
    }
}

impl PostProcessor for Wrapper {
    fn before_initialization(
        &self,
        _context: &dyn BuildContext,
        instance: Instance,
        name: &str,
    ) -> ContainerResult<Option<Instance>> {
        if name != "account" {
            return Ok(Some(instance));
        }
        let proxy = ProxyResolver::new().create_proxy(&instance, Arc::new(Transparent))?;
        self.originals.lock().insert(name.to_string(), instance);
        Ok(Some(proxy))
    }

    fn on_set_property(&self, instance: Instance, name: &str) -> Instance {
        match self.originals.lock().get(name) {
            Some(original) => {
                UNWRAPPED.lock().push(self.label);
                original.clone()
            }
            None => instance,
        }
    }
}

struct Transparent;

impl InvocationHandler for Transparent {
    fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult<ReturnValue> {
        invocation.proceed()
    }
}

#[test]
fn later_processors_unwrap_first() -> anyhow::Result<()> {
    let catalog = TypeCatalog::new()
        .with(savings_account())
        .with(TypeDescriptor::component::<Journal>("bank.Journal").constructor(Constructor::no_args(Journal::default)))
        .with(Wrapper::descriptor("bank.FirstWrapper", "first", 100))
        .with(Wrapper::descriptor("bank.SecondWrapper", "second", 200));
    let container = build(catalog)?;

    assert_eq!(&UNWRAPPED.lock()[..2], ["second", "first"]);
    let first = container.get::<Wrapper>("firstWrapper")?;
    let original = first.originals.lock().get("account").cloned().expect("original");
    let account = original.cast::<SavingsAccount>().expect("true original");
    assert!(account.journal.get().is_some());
    Ok(())
}

type Events = Arc<Mutex<Vec<String>>>;

struct RecordingConnection {
    events: Events,
    auto_commit: AtomicBool,
}

impl TransactionConnection for RecordingConnection {
    fn auto_commit(&self) -> Result<bool, BoxError> {
        Ok(self.auto_commit.load(Ordering::SeqCst))
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<(), BoxError> {
        self.auto_commit.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<(), BoxError> {
        self.events.lock().push("commit".into());
        Ok(())
    }

    fn rollback(&self) -> Result<(), BoxError> {
        self.events.lock().push("rollback".into());
        Ok(())
    }
}

/// 模拟的连接池
#[derive(Default)]
pub struct Pool {
    events: Events,
}

impl TransactionalResource for Pool {
    fn connection(&self) -> Result<Box<dyn TransactionConnection>, BoxError> {
        Ok(Box::new(RecordingConnection {
            events: Arc::clone(&self.events),
            auto_commit: AtomicBool::new(true),
        }))
    }
}

impl Managed for Pool {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .contract::<dyn TransactionalResource>(|it| it)
            .build()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("金额必须大于零")]
    Zero,
    #[error("没有进行中的事务")]
    NoTransaction,
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

#[interceptable]
pub trait Transfers {
    fn transfer(&self, amount: u64) -> Result<(), TransferError>;
}

pub struct TransferService;

impl Transfers for TransferService {
    fn transfer(&self, amount: u64) -> Result<(), TransferError> {
        with_current_connection(|_| ()).ok_or(TransferError::NoTransaction)?;
        if amount == 0 {
            return Err(TransferError::Zero);
        }
        Ok(())
    }
}

impl Managed for TransferService {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .interceptable::<dyn Transfers>(|it| it)
            .marker(TRANSACTIONAL_MARKER, DEFAULT_TRANSACTION_MANAGER)
            .build()
    }
}

#[test]
fn transactional_components_commit_and_roll_back() -> anyhow::Result<()> {
    let container = build(
        TypeCatalog::new()
            .with(TypeDescriptor::component::<Pool>("db.Pool").constructor(Constructor::no_args(Pool::default)))
            .with(TransactionManager::descriptor())
            .with(InterceptionPostProcessor::transactional_descriptor())
            .with(
                TypeDescriptor::component::<TransferService>("bank.TransferService")
                    .constructor(Constructor::no_args(|| TransferService)),
            ),
    )?;
    let transfers = container.get::<dyn Transfers>("transferService")?;
    transfers.transfer(5)?;
    assert!(matches!(transfers.transfer(0), Err(TransferError::Zero)));

    let pool = container.get::<Pool>("pool")?;
    assert_eq!(pool.events.lock().as_slice(), ["commit", "rollback"]);
    assert!(aop::current_transaction().is_none());
    Ok(())
}
