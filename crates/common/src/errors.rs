//! 错误类型定义

use thiserror::Error;

/// 通用的装箱错误类型，用于承载用户代码返回的错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 容器错误类型
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("组件定义错误: {message}")]
    Definition { message: String },

    #[error("组件创建失败: {component}, 原因: {source}")]
    Creation { component: String, source: BoxError },

    #[error("依赖无法满足: {component}, 原因: {message}")]
    UnsatisfiedDependency { component: String, message: String },

    #[error("存在多个类型为 {type_name} 的组件: {reason}")]
    Ambiguous { type_name: String, reason: String },

    #[error("组件不存在: {message}")]
    NoSuchComponent { message: String },

    #[error("组件类型不匹配: '{name}' 需要类型 {required}, 实际类型 {actual}")]
    TypeMismatch {
        name: String,
        required: String,
        actual: String,
    },

    #[error("属性解析失败: {source}")]
    Property {
        #[from]
        source: PropertyError,
    },

    #[error("代理配置错误: {message}")]
    Aop { message: String },

    #[error("容器不可用: {message}")]
    Unavailable { message: String },
}

/// 属性解析错误类型
#[derive(Error, Debug)]
pub enum PropertyError {
    #[error("属性不存在: {key}")]
    NotFound { key: String },

    #[error("无效的属性表达式: {key}")]
    InvalidKey { key: String },

    #[error("属性存在循环引用: {key}")]
    CircularReference { key: String },

    #[error("属性类型转换失败: {key} = '{value}' 无法转换为 {target}")]
    Conversion {
        key: String,
        value: String,
        target: String,
    },

    #[error("属性源加载失败: {source}")]
    Source { source: BoxError },
}

/// 方法调用错误类型
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("目标方法执行失败: {0}")]
    Target(BoxError),

    #[error("方法 {method} 的第 {index} 个参数类型不匹配, 期望 {expected}")]
    ArgumentMismatch {
        method: String,
        index: usize,
        expected: &'static str,
    },

    #[error("方法 {method} 的返回值类型不匹配, 期望 {expected}")]
    ReturnTypeMismatch {
        method: String,
        expected: &'static str,
    },

    #[error("代理目标 {actual} 未实现契约 {contract}")]
    ContractMissing {
        contract: &'static str,
        actual: String,
    },

    #[error("调用处理器执行失败: {source}")]
    Handler { source: BoxError },
}

/// 容器操作结果类型
pub type ContainerResult<T> = Result<T, ContainerError>;

/// 属性解析结果类型
pub type PropertyResult<T> = Result<T, PropertyError>;

/// 方法调用结果类型
pub type InvocationResult<T> = Result<T, InvocationError>;

impl ContainerError {
    /// 创建组件定义错误
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    /// 创建组件创建错误
    pub fn creation(component: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Creation {
            component: component.into(),
            source: source.into(),
        }
    }

    /// 创建依赖无法满足错误
    pub fn unsatisfied(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsatisfiedDependency {
            component: component.into(),
            message: message.into(),
        }
    }

    /// 创建组件不存在错误
    pub fn no_such_component(message: impl Into<String>) -> Self {
        Self::NoSuchComponent {
            message: message.into(),
        }
    }

    /// 创建代理配置错误
    pub fn aop(message: impl Into<String>) -> Self {
        Self::Aop {
            message: message.into(),
        }
    }
}

impl PropertyError {
    /// 创建属性源加载错误
    pub fn from_source(source: impl Into<BoxError>) -> Self {
        Self::Source {
            source: source.into(),
        }
    }
}

impl InvocationError {
    /// 将目标方法返回的业务错误装箱
    pub fn target<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Target(Box::new(error))
    }

    /// 创建调用处理器错误
    pub fn handler(source: impl Into<BoxError>) -> Self {
        Self::Handler {
            source: source.into(),
        }
    }

    /// 还原为目标方法声明的错误类型
    ///
    /// 若错误来自目标方法本身且类型一致，则原样取出；否则通过 `From<InvocationError>` 转换。
    pub fn into_error<E>(self) -> E
    where
        E: std::error::Error + From<Self> + 'static,
    {
        match self {
            Self::Target(source) => match source.downcast::<E>() {
                Ok(error) => *error,
                Err(source) => E::from(Self::Target(source)),
            },
            other => E::from(other),
        }
    }
}
