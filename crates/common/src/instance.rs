//! 组件实例
//!
//! [`Instance`] 是容器中组件实例的统一句柄。克隆句柄不会复制组件本身，
//! 两个句柄是否指向同一实例通过 [`Instance::ptr_eq`] 判断。

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::errors::BoxError;
use crate::metadata::{Managed, NamedOperation, ProxyBuilder, TypeKey, TypeMeta, View};

/// 组件实例句柄
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

struct InstanceInner {
    type_name: String,
    views: HashMap<TypeId, View>,
    contracts: Vec<TypeKey>,
    operations: HashMap<String, NamedOperation>,
    proxies: Vec<(TypeKey, ProxyBuilder)>,
    markers: BTreeMap<String, String>,
}

impl Instance {
    /// 包装一个托管类型的值
    pub fn new<T: Managed>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// 包装一个已共享的托管类型的值
    pub fn from_arc<T: Managed>(value: Arc<T>) -> Self {
        Self::with_meta(value, T::type_meta())
    }

    /// 使用显式给出的元数据包装任意值
    pub fn with_meta<T: Send + Sync + 'static>(value: Arc<T>, meta: TypeMeta) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = value;
        let mut views = HashMap::with_capacity(meta.casters.len());
        let mut contracts = Vec::with_capacity(meta.casters.len());
        for (key, caster) in &meta.casters {
            if let Some(view) = caster(&erased) {
                views.insert(key.id(), view);
                contracts.push(*key);
            }
        }
        Self {
            inner: Arc::new(InstanceInner {
                type_name: meta.key().name().to_string(),
                views,
                contracts,
                operations: meta.operations,
                proxies: meta.proxies,
                markers: meta.markers,
            }),
        }
    }

    /// 由代理视图组装一个代理实例
    ///
    /// 代理实例沿用原实例的拦截标记和代理构建器，因此可以被再次代理；
    /// 它不暴露原实例的具体类型，也不携带按名称调用的方法。
    pub fn proxy_of(origin: &Self, views: Vec<(TypeKey, View)>) -> Self {
        let mut map = HashMap::with_capacity(views.len());
        let mut contracts = Vec::with_capacity(views.len());
        for (key, view) in views {
            map.insert(key.id(), view);
            contracts.push(key);
        }
        Self {
            inner: Arc::new(InstanceInner {
                type_name: format!("Proxy<{}>", origin.type_name()),
                views: map,
                contracts,
                operations: HashMap::new(),
                proxies: origin.inner.proxies.clone(),
                markers: origin.inner.markers.clone(),
            }),
        }
    }

    /// 运行时类型名称
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    /// 以类型 `U` 访问实例，`U` 可以是具体类型或 `dyn Trait`
    pub fn cast<U: ?Sized + 'static>(&self) -> Option<Arc<U>> {
        self.inner
            .views
            .get(&TypeId::of::<U>())
            .and_then(|view| view.downcast_ref::<Arc<U>>())
            .cloned()
    }

    /// 是否能以某个类型被访问
    pub fn provides(&self, key: &TypeKey) -> bool {
        self.inner.views.contains_key(&key.id())
    }

    /// 可访问的全部类型
    pub fn contracts(&self) -> &[TypeKey] {
        &self.inner.contracts
    }

    /// 拦截标记对应的处理器组件名称
    pub fn marker(&self, marker: &str) -> Option<&str> {
        self.inner.markers.get(marker).map(String::as_str)
    }

    /// 按名称查找无参方法
    pub fn operation(&self, name: &str) -> Option<NamedOperation> {
        self.inner.operations.get(name).cloned()
    }

    /// 按名称调用无参方法，方法不存在时返回 `None`
    pub fn invoke_operation(&self, name: &str) -> Option<Result<(), BoxError>> {
        self.operation(name).map(|operation| operation(self))
    }

    /// 可被代理的契约及其代理构建器
    pub fn proxy_builders(&self) -> &[(TypeKey, ProxyBuilder)] {
        &self.inner.proxies
    }

    /// 两个句柄是否指向同一个实例
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.inner.type_name, Arc::as_ptr(&self.inner))
    }
}
