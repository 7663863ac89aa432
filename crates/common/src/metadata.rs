//! 运行时类型元数据
//!
//! 组件在运行时以 [`Instance`](crate::Instance) 的形式在容器中流转。
//! [`TypeMeta`] 描述一个具体类型能以哪些视图（具体类型本身或 `dyn Trait` 契约）被访问，
//! 以及按名称调用的生命周期方法、可被代理的契约和拦截标记。

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::BoxError;
use crate::instance::Instance;
use crate::invocation::{InvocationHandler, ProxyContract};

/// 类型擦除后的视图，内部保存 `Arc<U>`
pub type View = Box<dyn Any + Send + Sync>;

/// 从擦除值中取出某个视图
pub type Caster = Arc<dyn Fn(&Arc<dyn Any + Send + Sync>) -> Option<View> + Send + Sync>;

/// 可按名称调用的无参方法
pub type NamedOperation = Arc<dyn Fn(&Instance) -> Result<(), BoxError> + Send + Sync>;

/// 为某个可拦截契约生成代理视图
pub type ProxyBuilder = Arc<dyn Fn(&Instance, &Arc<dyn InvocationHandler>) -> View + Send + Sync>;

/// 类型标识
///
/// 比较与哈希只依赖 [`TypeId`]，名称用于日志和错误信息。
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// 获取类型 `T` 的标识，`T` 可以是 `dyn Trait`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 类型 ID
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 去掉模块路径后的简单名称
    pub fn short_name(&self) -> &'static str {
        let name = self.name.split('<').next().unwrap_or(self.name);
        name.rsplit("::").next().unwrap_or(name)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 可被容器管理的组件类型
///
/// 实现者通过 [`TypeMeta::builder`] 声明自己对外暴露的契约。
pub trait Managed: Send + Sync + 'static {
    /// 构建该类型的运行时元数据
    fn type_meta() -> TypeMeta
    where
        Self: Sized;
}

/// 类型的运行时元数据
pub struct TypeMeta {
    key: TypeKey,
    pub(crate) casters: Vec<(TypeKey, Caster)>,
    pub(crate) operations: HashMap<String, NamedOperation>,
    pub(crate) proxies: Vec<(TypeKey, ProxyBuilder)>,
    pub(crate) markers: BTreeMap<String, String>,
}

impl TypeMeta {
    /// 为具体类型 `T` 创建元数据构建器，具体类型视图会自动注册
    pub fn builder<T: Send + Sync + 'static>() -> TypeMetaBuilder<T> {
        TypeMetaBuilder::new()
    }

    /// 仅包含具体类型视图的元数据
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self::builder::<T>().build()
    }

    /// 所描述的具体类型
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// 该类型可被访问的全部视图
    pub fn contracts(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.casters.iter().map(|(key, _)| *key)
    }

    /// 可被代理的契约
    pub fn interceptable_contracts(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.proxies.iter().map(|(key, _)| *key)
    }

    /// 是否声明了某个按名称调用的方法
    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// 拦截标记对应的处理器组件名称
    pub fn marker(&self, marker: &str) -> Option<&str> {
        self.markers.get(marker).map(String::as_str)
    }
}

impl fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMeta")
            .field("key", &self.key)
            .field("contracts", &self.contracts().collect::<Vec<_>>())
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("markers", &self.markers)
            .finish()
    }
}

/// [`TypeMeta`] 构建器
pub struct TypeMetaBuilder<T> {
    meta: TypeMeta,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeMetaBuilder<T> {
    fn new() -> Self {
        let key = TypeKey::of::<T>();
        let concrete: Caster = Arc::new(|value: &Arc<dyn Any + Send + Sync>| -> Option<View> {
            let typed = Arc::clone(value).downcast::<T>().ok()?;
            Some(Box::new(typed) as View)
        });
        Self {
            meta: TypeMeta {
                key,
                casters: vec![(key, concrete)],
                operations: HashMap::new(),
                proxies: Vec::new(),
                markers: BTreeMap::new(),
            },
            _marker: PhantomData,
        }
    }

    /// 声明一个契约视图，例如 `.contract::<dyn Repository>(|it| it)`
    #[must_use]
    pub fn contract<U>(mut self, cast: fn(Arc<T>) -> Arc<U>) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |value: &Arc<dyn Any + Send + Sync>| -> Option<View> {
            let typed = Arc::clone(value).downcast::<T>().ok()?;
            Some(Box::new(cast(typed)) as View)
        });
        self.meta.casters.push((TypeKey::of::<U>(), caster));
        self
    }

    /// 声明一个可被代理的契约视图
    ///
    /// 契约需由 `#[interceptable]` 生成 [`ProxyContract`] 实现。
    #[must_use]
    pub fn interceptable<U>(mut self, cast: fn(Arc<T>) -> Arc<U>) -> Self
    where
        U: ProxyContract + ?Sized,
    {
        self = self.contract::<U>(cast);
        let builder: ProxyBuilder = Arc::new(|target: &Instance, handler: &Arc<dyn InvocationHandler>| -> View {
            Box::new(U::create_proxy(target.clone(), Arc::clone(handler))) as View
        });
        self.meta.proxies.push((TypeKey::of::<U>(), builder));
        self
    }

    /// 注册一个可按名称调用的无参方法（用于 init / destroy 方法名）
    #[must_use]
    pub fn operation<F>(mut self, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let call: NamedOperation = Arc::new(move |instance: &Instance| -> Result<(), BoxError> {
            let target = instance.cast::<T>().ok_or_else(|| {
                format!(
                    "实例 {} 无法作为 {} 调用方法 '{}'",
                    instance.type_name(),
                    std::any::type_name::<T>(),
                    label
                )
            })?;
            operation(&target)
        });
        self.meta.operations.insert(name, call);
        self
    }

    /// 打上拦截标记，值为处理器组件名称
    #[must_use]
    pub fn marker(mut self, marker: impl Into<String>, handler: impl Into<String>) -> Self {
        self.meta.markers.insert(marker.into(), handler.into());
        self
    }

    /// 完成构建
    pub fn build(self) -> TypeMeta {
        self.meta
    }
}

/// 声明类型
///
/// 组件定义上记录的类型：一个主类型加上它满足的全部契约。
#[derive(Debug, Clone)]
pub struct DeclaredType {
    key: TypeKey,
    satisfies: Vec<TypeKey>,
}

impl DeclaredType {
    /// 由托管类型的元数据推导声明类型
    pub fn of<T: Managed>() -> Self {
        let meta = T::type_meta();
        Self::from_meta(&meta)
    }

    /// 由已构建的元数据推导声明类型
    pub fn from_meta(meta: &TypeMeta) -> Self {
        Self {
            key: meta.key(),
            satisfies: meta.contracts().collect(),
        }
    }

    /// 只满足自身的声明类型，例如工厂方法声明返回一个 `dyn Trait`
    pub fn contract<U: ?Sized + 'static>() -> Self {
        let key = TypeKey::of::<U>();
        Self {
            key,
            satisfies: vec![key],
        }
    }

    /// 主类型
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// 主类型名称
    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    /// 是否满足某个类型
    pub fn satisfies(&self, key: &TypeKey) -> bool {
        self.satisfies.contains(key)
    }

    /// 满足的全部类型
    pub fn satisfied(&self) -> &[TypeKey] {
        &self.satisfies
    }

    /// 是否为单元类型 `()`
    pub fn is_unit(&self) -> bool {
        self.key.id() == TypeId::of::<()>()
    }

    /// 是否为原始类型
    pub fn is_primitive(&self) -> bool {
        let id = self.key.id();
        [
            TypeId::of::<bool>(),
            TypeId::of::<char>(),
            TypeId::of::<i8>(),
            TypeId::of::<i16>(),
            TypeId::of::<i32>(),
            TypeId::of::<i64>(),
            TypeId::of::<i128>(),
            TypeId::of::<isize>(),
            TypeId::of::<u8>(),
            TypeId::of::<u16>(),
            TypeId::of::<u32>(),
            TypeId::of::<u64>(),
            TypeId::of::<u128>(),
            TypeId::of::<usize>(),
            TypeId::of::<f32>(),
            TypeId::of::<f64>(),
        ]
        .contains(&id)
    }
}
