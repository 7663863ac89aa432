//! 类型目录
//!
//! 扫描阶段的类型来源：按完整类型名称登记 [`TypeDescriptor`]。

use std::collections::BTreeMap;

use crate::descriptor::TypeDescriptor;

/// 类型目录
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: BTreeMap<String, TypeDescriptor>,
}

impl TypeCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个类型，同名类型会被替换
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        if let Some(previous) = self.types.insert(descriptor.type_name.clone(), descriptor) {
            tracing::warn!("类型 {} 被重复登记, 已替换", previous.type_name);
        }
        self
    }

    /// 登记一个类型并返回目录本身
    #[must_use]
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// 按完整类型名称查找
    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    /// 是否登记了某个类型
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// 按名称排序的全部类型名称
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// 位于某个包（含子包）下的类型名称
    pub fn names_in_package<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.type_names()
            .filter(move |name| in_package(name, package))
    }

    /// 登记的类型数量
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// 类型是否位于某个包（含子包）下，空包名匹配全部类型
pub fn in_package(type_name: &str, package: &str) -> bool {
    if package.is_empty() {
        return true;
    }
    type_name
        .strip_prefix(package)
        .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_common::{Managed, TypeMeta};

    struct Service;

    impl Managed for Service {
        fn type_meta() -> TypeMeta {
            TypeMeta::of::<Self>()
        }
    }

    #[test]
    fn package_prefix_requires_segment_boundary() {
        assert!(in_package("app.service.UserService", "app.service"));
        assert!(in_package("app.service.impl.UserServiceImpl", "app"));
        assert!(!in_package("app.services.Other", "app.service"));
        assert!(in_package("anything", ""));
    }

    #[test]
    fn names_in_package_are_sorted() {
        let catalog = TypeCatalog::new()
            .with(TypeDescriptor::component::<Service>("app.b.Second"))
            .with(TypeDescriptor::component::<Service>("app.a.First"))
            .with(TypeDescriptor::component::<Service>("other.Third"));
        let names: Vec<_> = catalog.names_in_package("app").collect();
        assert_eq!(names, ["app.a.First", "app.b.Second"]);
        assert_eq!(catalog.len(), 3);
    }
}
