//! 类型描述符
//!
//! 描述一个可能成为组件的类型：它的种类、组件标记、构造函数、生命周期钩子、
//! 工厂方法以及注入点。描述符由类型目录提供，容器在注册阶段据此生成组件定义。

use std::fmt;
use std::sync::Arc;

use sprig_common::{BoxError, DeclaredType, FromPropertyValue, Instance, Managed, TypeKey, ValueType};

use crate::args::{Argument, ResolvedArgs};

/// 构造函数
pub type ConstructorFn = Arc<dyn Fn(&ResolvedArgs) -> Result<Instance, BoxError> + Send + Sync>;

/// 工厂方法，第一个参数为工厂所有者实例
pub type FactoryFn = Arc<dyn Fn(&Instance, &ResolvedArgs) -> Result<Instance, BoxError> + Send + Sync>;

/// 生命周期钩子
pub type HookFn = Arc<dyn Fn(&Instance) -> Result<(), BoxError> + Send + Sync>;

/// 注入函数
pub type InjectFn = Arc<dyn Fn(&Instance, Argument) -> Result<(), BoxError> + Send + Sync>;

/// 类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// 可实例化的普通类型
    Class,
    /// 抽象类型
    Abstract,
    /// 接口
    Interface,
    /// 枚举
    Enum,
    /// 注解
    Annotation,
    /// 记录类型
    Record,
}

impl TypeKind {
    /// 扫描时是否直接跳过
    pub fn is_skipped(self) -> bool {
        matches!(self, Self::Interface | Self::Enum | Self::Annotation | Self::Record)
    }
}

/// 修饰符
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_private: bool,
}

impl Modifiers {
    /// 静态
    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// 不可变或不可覆盖
    #[must_use]
    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// 抽象
    #[must_use]
    pub fn with_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// 私有
    #[must_use]
    pub fn with_private(mut self) -> Self {
        self.is_private = true;
        self
    }
}

/// 值标记：`${key}` / `${key:default}` 表达式及目标类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMarker {
    pub expression: String,
    pub value_type: ValueType,
}

impl ValueMarker {
    /// 为类型 `T` 创建值标记
    pub fn of<T: FromPropertyValue>(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            value_type: T::VALUE_TYPE,
        }
    }
}

/// 依赖标记
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutowiredMarker {
    /// 指定依赖的组件名称
    pub name: Option<String>,
    /// 是否必须存在
    pub required: bool,
    /// 依赖类型
    pub target: TypeKey,
}

impl AutowiredMarker {
    /// 按类型注入必需依赖
    pub fn of<U: ?Sized + 'static>() -> Self {
        Self {
            name: None,
            required: true,
            target: TypeKey::of::<U>(),
        }
    }

    /// 指定依赖的组件名称
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 设为可选依赖
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// 构造函数或工厂方法的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub value: Option<ValueMarker>,
    pub autowired: Option<AutowiredMarker>,
}

impl ParamSpec {
    /// 没有任何标记的参数
    pub fn unmarked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            autowired: None,
        }
    }

    /// 值参数
    pub fn value<T: FromPropertyValue>(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::unmarked(name).with_value(ValueMarker::of::<T>(expression))
    }

    /// 按类型注入的必需依赖参数
    pub fn autowired<U: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::unmarked(name).with_autowired(AutowiredMarker::of::<U>())
    }

    /// 按名称注入的必需依赖参数
    pub fn autowired_named<U: ?Sized + 'static>(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self::unmarked(name).with_autowired(AutowiredMarker::of::<U>().named(component))
    }

    /// 按类型注入的可选依赖参数
    pub fn optional<U: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::unmarked(name).with_autowired(AutowiredMarker::of::<U>().optional())
    }

    /// 附加值标记
    #[must_use]
    pub fn with_value(mut self, marker: ValueMarker) -> Self {
        self.value = Some(marker);
        self
    }

    /// 附加依赖标记
    #[must_use]
    pub fn with_autowired(mut self, marker: AutowiredMarker) -> Self {
        self.autowired = Some(marker);
        self
    }
}

/// 构造函数描述
#[derive(Clone)]
pub struct Constructor {
    pub params: Vec<ParamSpec>,
    create: ConstructorFn,
}

impl Constructor {
    /// 创建构造函数描述
    pub fn new<F>(params: Vec<ParamSpec>, create: F) -> Self
    where
        F: Fn(&ResolvedArgs) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Self {
            params,
            create: Arc::new(create),
        }
    }

    /// 无参构造函数
    pub fn no_args<T, F>(create: F) -> Self
    where
        T: Managed,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(Vec::new(), move |_| Ok(Instance::new(create())))
    }

    /// 调用构造函数
    pub fn invoke(&self, args: &ResolvedArgs) -> Result<Instance, BoxError> {
        (self.create)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// 绑定到具体类型的生命周期钩子
#[derive(Clone)]
pub struct BoundHook {
    pub name: String,
    call: HookFn,
}

impl BoundHook {
    /// 为类型 `T` 绑定钩子方法
    pub fn of<T, F>(name: impl Into<String>, hook: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self {
            name,
            call: Arc::new(move |instance: &Instance| -> Result<(), BoxError> {
                let target = instance.cast::<T>().ok_or_else(|| {
                    format!(
                        "实例 {} 无法作为 {} 调用钩子 '{}'",
                        instance.type_name(),
                        std::any::type_name::<T>(),
                        label
                    )
                })?;
                hook(&target)
            }),
        }
    }

    /// 在实例上调用钩子
    pub fn call(&self, instance: &Instance) -> Result<(), BoxError> {
        (self.call)(instance)
    }
}

impl fmt::Debug for BoundHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", self.name)
    }
}

/// 工厂方法描述
#[derive(Clone)]
pub struct FactoryMethod {
    pub method_name: String,
    /// 显式指定的组件名称，缺省为方法名
    pub component_name: Option<String>,
    pub returns: DeclaredType,
    pub params: Vec<ParamSpec>,
    pub order: Option<i32>,
    pub primary: bool,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
    pub modifiers: Modifiers,
    produce: FactoryFn,
}

impl FactoryMethod {
    /// 创建工厂方法描述
    pub fn new<F>(method_name: impl Into<String>, returns: DeclaredType, produce: F) -> Self
    where
        F: Fn(&Instance, &ResolvedArgs) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Self {
            method_name: method_name.into(),
            component_name: None,
            returns,
            params: Vec::new(),
            order: None,
            primary: false,
            init_method: None,
            destroy_method: None,
            modifiers: Modifiers::default(),
            produce: Arc::new(produce),
        }
    }

    /// 由所有者类型 `O` 上的方法生产托管类型 `T`
    pub fn producing<O, T, F>(method_name: impl Into<String>, produce: F) -> Self
    where
        O: Send + Sync + 'static,
        T: Managed,
        F: Fn(&O, &ResolvedArgs) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(
            method_name,
            DeclaredType::of::<T>(),
            move |owner: &Instance, args: &ResolvedArgs| -> Result<Instance, BoxError> {
                let owner = owner.cast::<O>().ok_or_else(|| {
                    format!(
                        "工厂所有者 {} 不是 {}",
                        owner.type_name(),
                        std::any::type_name::<O>()
                    )
                })?;
                produce(&owner, args).map(Instance::new)
            },
        )
    }

    /// 增加一个参数
    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// 指定组件名称
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.component_name = Some(name.into());
        self
    }

    /// 指定排序值
    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// 标记为首选
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// 指定初始化方法名
    #[must_use]
    pub fn init_method(mut self, name: impl Into<String>) -> Self {
        self.init_method = Some(name.into());
        self
    }

    /// 指定销毁方法名
    #[must_use]
    pub fn destroy_method(mut self, name: impl Into<String>) -> Self {
        self.destroy_method = Some(name.into());
        self
    }

    /// 指定修饰符
    #[must_use]
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// 在所有者实例上调用工厂方法
    pub fn invoke(&self, owner: &Instance, args: &ResolvedArgs) -> Result<Instance, BoxError> {
        (self.produce)(owner, args)
    }
}

impl fmt::Debug for FactoryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryMethod")
            .field("method_name", &self.method_name)
            .field("component_name", &self.component_name)
            .field("returns", &self.returns.name())
            .field("params", &self.params)
            .field("order", &self.order)
            .field("primary", &self.primary)
            .finish_non_exhaustive()
    }
}

/// 注入点种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    /// 字段
    Field,
    /// setter 方法，记录其参数个数
    Setter { arity: usize },
}

/// 注入点
#[derive(Clone)]
pub struct InjectionPoint {
    pub name: String,
    pub kind: InjectionKind,
    pub modifiers: Modifiers,
    pub value: Option<ValueMarker>,
    pub autowired: Option<AutowiredMarker>,
    apply: InjectFn,
}

impl InjectionPoint {
    fn typed<T, F>(name: impl Into<String>, kind: InjectionKind, apply: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, Argument) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self {
            name,
            kind,
            modifiers: Modifiers::default(),
            value: None,
            autowired: None,
            apply: Arc::new(move |instance: &Instance, argument: Argument| -> Result<(), BoxError> {
                let target = instance.cast::<T>().ok_or_else(|| {
                    format!(
                        "实例 {} 无法作为 {} 注入 '{}'",
                        instance.type_name(),
                        std::any::type_name::<T>(),
                        label
                    )
                })?;
                apply(&target, argument)
            }),
        }
    }

    /// 字段注入点
    pub fn field<T, F>(name: impl Into<String>, apply: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, Argument) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::typed(name, InjectionKind::Field, apply)
    }

    /// 单参数 setter 注入点
    pub fn setter<T, F>(name: impl Into<String>, apply: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, Argument) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::typed(name, InjectionKind::Setter { arity: 1 }, apply)
    }

    /// 附加值标记
    #[must_use]
    pub fn value<V: FromPropertyValue>(mut self, expression: impl Into<String>) -> Self {
        self.value = Some(ValueMarker::of::<V>(expression));
        self
    }

    /// 附加按类型的必需依赖标记
    #[must_use]
    pub fn autowired<U: ?Sized + 'static>(mut self) -> Self {
        self.autowired = Some(AutowiredMarker::of::<U>());
        self
    }

    /// 附加依赖标记
    #[must_use]
    pub fn with_autowired(mut self, marker: AutowiredMarker) -> Self {
        self.autowired = Some(marker);
        self
    }

    /// 指定修饰符
    #[must_use]
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// 修改 setter 的声明参数个数
    #[must_use]
    pub fn arity(mut self, arity: usize) -> Self {
        if let InjectionKind::Setter { .. } = self.kind {
            self.kind = InjectionKind::Setter { arity };
        }
        self
    }

    /// 是否带有任何注入标记
    pub fn is_marked(&self) -> bool {
        self.value.is_some() || self.autowired.is_some()
    }

    /// 将参数注入目标实例
    pub fn apply(&self, target: &Instance, argument: Argument) -> Result<(), BoxError> {
        (self.apply)(target, argument)
    }
}

impl fmt::Debug for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("modifiers", &self.modifiers)
            .field("value", &self.value)
            .field("autowired", &self.autowired)
            .finish_non_exhaustive()
    }
}

/// 组件标记
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMarker {
    /// 显式指定的组件名称
    pub name: Option<String>,
}

/// 类型描述符
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// 完整类型名称，以 `.` 分隔包路径，例如 `app.service.UserService`
    pub type_name: String,
    pub kind: TypeKind,
    pub declared: DeclaredType,
    pub component: Option<ComponentMarker>,
    /// 是否为工厂所有者（其方法可以生产组件）
    pub factory_owner: bool,
    pub order: Option<i32>,
    pub primary: bool,
    pub constructors: Vec<Constructor>,
    pub init_hooks: Vec<BoundHook>,
    pub destroy_hooks: Vec<BoundHook>,
    pub factory_methods: Vec<FactoryMethod>,
    pub injections: Vec<InjectionPoint>,
}

impl TypeDescriptor {
    /// 创建一个没有组件标记的描述符
    pub fn new(type_name: impl Into<String>, kind: TypeKind, declared: DeclaredType) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
            declared,
            component: None,
            factory_owner: false,
            order: None,
            primary: false,
            constructors: Vec::new(),
            init_hooks: Vec::new(),
            destroy_hooks: Vec::new(),
            factory_methods: Vec::new(),
            injections: Vec::new(),
        }
    }

    /// 带组件标记的托管类型描述符
    pub fn component<T: Managed>(type_name: impl Into<String>) -> Self {
        let mut descriptor = Self::new(type_name, TypeKind::Class, DeclaredType::of::<T>());
        descriptor.component = Some(ComponentMarker::default());
        descriptor
    }

    /// 工厂所有者描述符，工厂所有者同时带有组件标记
    pub fn configuration<T: Managed>(type_name: impl Into<String>) -> Self {
        let mut descriptor = Self::component::<T>(type_name);
        descriptor.factory_owner = true;
        descriptor
    }

    /// 类型的简单名称
    pub fn simple_name(&self) -> &str {
        self.type_name
            .rsplit(['.', ':'])
            .next()
            .unwrap_or(&self.type_name)
    }

    /// 包路径
    pub fn package(&self) -> &str {
        self.type_name
            .rfind('.')
            .map_or("", |index| &self.type_name[..index])
    }

    /// 指定组件名称
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.component = Some(ComponentMarker {
            name: Some(name.into()),
        });
        self
    }

    /// 指定类型种类
    #[must_use]
    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// 指定排序值
    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// 标记为首选
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// 增加构造函数
    #[must_use]
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// 增加初始化钩子
    #[must_use]
    pub fn post_construct<T, F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.init_hooks.push(BoundHook::of(name, hook));
        self
    }

    /// 增加销毁钩子
    #[must_use]
    pub fn pre_destroy<T, F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.destroy_hooks.push(BoundHook::of(name, hook));
        self
    }

    /// 增加工厂方法
    #[must_use]
    pub fn factory(mut self, method: FactoryMethod) -> Self {
        self.factory_methods.push(method);
        self
    }

    /// 增加注入点
    #[must_use]
    pub fn inject(mut self, point: InjectionPoint) -> Self {
        self.injections.push(point);
        self
    }

    /// 继承父类型的注入点和钩子
    ///
    /// 子类型自己的注入点排在前面，父类型的排在后面。
    #[must_use]
    pub fn extends(mut self, parent: &Self) -> Self {
        self.injections.extend(parent.injections.iter().cloned());
        if self.init_hooks.is_empty() {
            self.init_hooks.extend(parent.init_hooks.iter().cloned());
        }
        if self.destroy_hooks.is_empty() {
            self.destroy_hooks.extend(parent.destroy_hooks.iter().cloned());
        }
        self
    }
}
