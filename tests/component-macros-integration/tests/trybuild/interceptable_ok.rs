use std::sync::Arc;

use component_macros::interceptable;
use sprig_common::{Instance, InvocationError, Managed, ProxyContract, TypeMeta};

#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error("键不存在: {0}")]
    Missing(String),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

#[interceptable]
trait Store {
    /// 读取
    #[tag(readonly)]
    fn get(&self, key: String) -> Result<Option<String>, StoreError>;

    fn put(&self, mut key: String, value: Vec<u8>) -> Result<usize, StoreError> {
        key.push('!');
        Ok(key.len() + value.len())
    }
}

struct MemoryStore;

impl Store for MemoryStore {
    fn get(&self, key: String) -> Result<Option<String>, StoreError> {
        Err(StoreError::Missing(key))
    }
}

impl Managed for MemoryStore {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>().interceptable::<dyn Store>(|it| it).build()
    }
}

fn assert_proxy_contract<T: ProxyContract + ?Sized>() {}

fn main() {
    assert_proxy_contract::<dyn Store>();
    let instance = Instance::new(MemoryStore);
    let store: Arc<dyn Store> = instance.cast::<dyn Store>().unwrap();
    assert!(store.get("a".into()).is_err());
}
