//! 测试用的可代理契约与组件

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use sprig_common::{
    Arguments, Instance, Invocation, InvocationError, InvocationHandler, InvocationResult, Managed,
    MethodDescriptor, ProxyContract, ReturnValue, TypeMeta,
};
use thiserror::Error;

static INIT_LOGGER: Once = Once::new();

pub(crate) fn init_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt().with_env_filter("debug").try_init().ok();
    });
}

#[derive(Debug, Error)]
pub(crate) enum GreetError {
    #[error("拒绝问候: {0}")]
    Refused(String),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

pub(crate) trait Greeter: Send + Sync {
    fn greet(&self, name: String) -> Result<String, GreetError>;
}

struct GreeterProxy {
    target: Instance,
    handler: Arc<dyn InvocationHandler>,
}

impl Greeter for GreeterProxy {
    fn greet(&self, name: String) -> Result<String, GreetError> {
        const METHOD: MethodDescriptor = MethodDescriptor::new("Greeter", "greet").with_tags(&["polite"]);
        let values: Vec<Box<dyn Any + Send>> = vec![Box::new(name)];
        let proceed = |target: &Instance, mut args: Arguments| -> InvocationResult<ReturnValue> {
            let contract = target
                .cast::<dyn Greeter>()
                .ok_or_else(|| InvocationError::ContractMissing {
                    contract: "Greeter",
                    actual: target.type_name().to_string(),
                })?;
            let name = args.take::<String>(0)?;
            let value = contract.greet(name).map_err(InvocationError::target)?;
            Ok(Box::new(value))
        };
        let invocation = Invocation::new(&self.target, METHOD, Arguments::new(METHOD, values), &proceed);
        let value = self
            .handler
            .invoke(invocation)
            .map_err(InvocationError::into_error::<GreetError>)?;
        value.downcast::<String>().map(|value| *value).map_err(|_| {
            GreetError::from(InvocationError::ReturnTypeMismatch {
                method: METHOD.to_string(),
                expected: std::any::type_name::<String>(),
            })
        })
    }
}

impl ProxyContract for dyn Greeter {
    fn create_proxy(target: Instance, handler: Arc<dyn InvocationHandler>) -> Arc<Self> {
        Arc::new(GreeterProxy { target, handler })
    }
}

#[derive(Default)]
pub(crate) struct EnglishGreeter {
    pub(crate) calls: AtomicUsize,
}

impl Greeter for EnglishGreeter {
    fn greet(&self, name: String) -> Result<String, GreetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if name.is_empty() {
            return Err(GreetError::Refused("无名氏".into()));
        }
        Ok(format!("Hello, {name}."))
    }
}

impl Managed for EnglishGreeter {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>()
            .interceptable::<dyn Greeter>(|it| it)
            .marker("around", "politeHandler")
            .build()
    }
}

/// 把带 `polite` 标签的方法返回值末尾的句号换成感叹号
#[derive(Default)]
pub(crate) struct PoliteHandler;

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
