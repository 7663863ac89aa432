//! 容器构建的跨 crate 集成测试

mod common;

use std::sync::Arc;

use common::build;
use di_abstractions::{BuildContext, ComponentLookup, Constructor, ParamSpec, TypeCatalog, TypeDescriptor};
use parking_lot::Mutex;
use sprig_common::{ContainerError, Instance, Managed, TypeMeta};

#[derive(Debug)]
struct X;

impl Managed for X {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

#[derive(Debug)]
struct Y {
    x: Arc<X>,
}

impl Managed for Y {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

fn x() -> TypeDescriptor {
    TypeDescriptor::component::<X>("app.X").constructor(Constructor::no_args(|| X))
}

fn y() -> TypeDescriptor {
    TypeDescriptor::component::<Y>("app.Y").constructor(Constructor::new(
        vec![ParamSpec::autowired::<X>("x")],
        |args| Ok(Instance::new(Y { x: args.component::<X>(0)? })),
    ))
}

#[test]
fn dependent_holds_exactly_its_dependency() -> anyhow::Result<()> {
    let container = build(TypeCatalog::new().with(x()).with(y()))?;
    let x = container.get::<X>("x")?;
    let y = container.get::<Y>("y")?;
    assert!(Arc::ptr_eq(&y.x, &x));
    Ok(())
}

#[test]
fn missing_dependency_names_the_dependent() {
    match build(TypeCatalog::new().with(y())) {
        Err(ContainerError::UnsatisfiedDependency { component, .. }) => assert_eq!(component, "y"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[derive(Debug)]
struct A;

#[derive(Debug)]
struct B;

impl Managed for A {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

impl Managed for B {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

#[test]
fn constructor_cycles_are_fatal() {
    let catalog = TypeCatalog::new()
        .with(
            TypeDescriptor::component::<A>("app.A").constructor(Constructor::new(
                vec![ParamSpec::autowired::<B>("b")],
                |_| Ok(Instance::new(A)),
            )),
        )
        .with(
            TypeDescriptor::component::<B>("app.B").constructor(Constructor::new(
                vec![ParamSpec::autowired::<A>("a")],
                |_| Ok(Instance::new(B)),
            )),
        );
    assert!(matches!(
        build(catalog),
        Err(ContainerError::UnsatisfiedDependency { .. })
    ));
}

trait Codec: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Debug)]
struct NamedCodec(&'static str);

impl Codec for NamedCodec {
    fn name(&self) -> &'static str {
        self.0
    }
}

impl Managed for NamedCodec {
    fn type_meta() -> TypeMeta {
        TypeMeta::builder::<Self>().contract::<dyn Codec>(|it| it).build()
    }
}

fn codec(type_name: &str, label: &'static str) -> TypeDescriptor {
    TypeDescriptor::component::<NamedCodec>(type_name).constructor(Constructor::no_args(move || NamedCodec(label)))
}

#[test]
fn type_lookup_without_primary_is_ambiguous() -> anyhow::Result<()> {
    let container = build(
        TypeCatalog::new()
            .with(codec("app.Json", "json"))
            .with(codec("app.Yaml", "yaml")),
    )?;
    assert!(matches!(
        container.get_by_type::<dyn Codec>(),
        Err(ContainerError::Ambiguous { .. })
    ));
    assert_eq!(container.get_all::<dyn Codec>()?.len(), 2);
    Ok(())
}

#[test]
fn unique_primary_wins_regardless_of_registration_order() -> anyhow::Result<()> {
    for primary_first in [true, false] {
        let (json, yaml) = (codec("app.Json", "json"), codec("app.Yaml", "yaml").primary());
        let catalog = if primary_first {
            TypeCatalog::new().with(yaml).with(json)
        } else {
            TypeCatalog::new().with(json).with(yaml)
        };
        let container = build(catalog)?;
        assert_eq!(container.get_by_type::<dyn Codec>()?.name(), "yaml");
    }
    Ok(())
}

#[test]
fn two_primaries_are_ambiguous() -> anyhow::Result<()> {
    let container = build(
        TypeCatalog::new()
            .with(codec("app.Json", "json").primary())
            .with(codec("app.Yaml", "yaml").primary()),
    )?;
    assert!(matches!(
        container.get_by_type::<dyn Codec>(),
        Err(ContainerError::Ambiguous { .. })
    ));
    Ok(())
}

#[test]
fn lookups_report_missing_and_mismatched_components() -> anyhow::Result<()> {
    let container = build(TypeCatalog::new().with(x()).with(y()))?;
    assert!(container.contains_component("x"));
    assert!(matches!(
        container.get_instance("z"),
        Err(ContainerError::NoSuchComponent { .. })
    ));
    assert!(matches!(container.get::<Y>("x"), Err(ContainerError::TypeMismatch { .. })));
    assert!(matches!(
        container.get_by_type::<dyn Codec>(),
        Err(ContainerError::NoSuchComponent { .. })
    ));
    assert!(container.get_all::<dyn Codec>()?.is_empty());
    Ok(())
}

static CREATED: Mutex<Vec<&'static str>> = parking_lot::const_mutex(Vec::new());

#[derive(Debug)]
struct Step(&'static str);

impl Managed for Step {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}

fn step(type_name: &str, label: &'static str, order: Option<i32>) -> TypeDescriptor {
    let descriptor = TypeDescriptor::component::<Step>(type_name).constructor(Constructor::no_args(move || {
        CREATED.lock().push(label);
        Step(label)
    }));
    match order {
        Some(order) => descriptor.order(order),
        None => descriptor,
    }
}

#[test]
fn remaining_components_are_created_by_order_then_name() -> anyhow::Result<()> {
    let container = build(
        TypeCatalog::new()
            .with(step("app.Zeta", "zeta", Some(1)))
            .with(step("app.Alpha", "alpha", None))
            .with(step("app.Beta", "beta", Some(5)))
            .with(step("app.Gamma", "gamma", None)),
    )?;
    assert_eq!(CREATED.lock().as_slice(), ["zeta", "beta", "alpha", "gamma"]);

    for name in container.component_names() {
        let definition = container.find_definition(&name).expect("definition");
        let instance = definition.instance().expect("instance");
        assert!(definition
            .declared()
            .satisfied()
            .iter()
            .all(|key| instance.provides(key)));
    }
    Ok(())
}

#[test]
fn global_handle_follows_the_container() -> anyhow::Result<()> {
    common::init_logger();
    let container = di_impl::ContainerBuilder::new(TypeCatalog::new().with(x()))
        .with_value_resolver(Arc::new(config_impl::PropertyResolver::empty()))
        .install_global(true)
        .build()?;
    let installed = di_impl::global::required()?;
    assert!(Arc::ptr_eq(&installed, &container));
    assert!(installed.get::<X>("x").is_ok());
    drop(installed);

    container.close()?;
    assert!(di_impl::global::current().is_none());
    assert!(!container.contains_component("x"));
    Ok(())
}
