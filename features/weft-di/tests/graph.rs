use std::sync::Arc;

use weft_di::{
    ConfigError, Container, InterfaceDecl, Lifetime, Registers, Registry, TypeCollection, Warning,
};

// --- Test Fixtures ---

struct ServiceA;
struct ServiceB;
struct ServiceC;

// --- Cycle Detection ---

#[test]
fn construction_cycle_fails_the_build_naming_every_member() {
    let services = TypeCollection::new("cyclic")
        .add(Registers::<ServiceA>::singleton(|_| Ok(ServiceA)).requires::<ServiceB>())
        .add(Registers::<ServiceB>::singleton(|_| Ok(ServiceB)).requires::<ServiceC>())
        .add(Registers::<ServiceC>::singleton(|_| Ok(ServiceC)).requires::<ServiceA>());

    let mut registry = Registry::new();
    registry.discover(&[services]).unwrap();

    let error = registry.ensure_acyclic().unwrap_err();
    let message = error.to_string();
    assert!(message.contains("ServiceA"), "missing ServiceA: {message}");
    assert!(message.contains("ServiceB"), "missing ServiceB: {message}");
    assert!(message.contains("ServiceC"), "missing ServiceC: {message}");

    // The build performs the same check before exposing the container.
    assert!(Container::build(registry).is_err());
}

#[test]
fn self_dependency_is_a_cycle() {
    let mut registry = Registry::new();
    registry
        .add(Registers::<ServiceA>::singleton(|_| Ok(ServiceA)).requires::<ServiceA>())
        .unwrap();

    let error = registry.ensure_acyclic().unwrap_err();
    assert_eq!(error.chain.len(), 2, "chain closes on the repeated node");
}

#[test]
fn acyclic_graph_validates_cleanly() {
    let services = TypeCollection::new("acyclic")
        .add(Registers::<ServiceA>::singleton(|_| Ok(ServiceA)))
        .add(Registers::<ServiceB>::singleton(|_| Ok(ServiceB)).requires::<ServiceA>())
        .add(
            Registers::<ServiceC>::singleton(|_| Ok(ServiceC))
                .requires::<ServiceA>()
                .requires::<ServiceB>(),
        );

    let mut registry = Registry::new();
    registry.discover(&[services]).unwrap();

    assert!(registry.ensure_acyclic().is_ok());
}

#[test]
fn unregistered_parameters_are_assumed_external() {
    struct ExternalClock;

    let mut registry = Registry::new();
    registry
        .add(Registers::<ServiceA>::singleton(|_| Ok(ServiceA)).requires::<ExternalClock>())
        .unwrap();

    // No edge is produced for the unknown type, so the graph stays valid.
    assert!(registry.ensure_acyclic().is_ok());
}

// --- Diagnostics ---

#[test]
fn lifetime_captivity_produces_exactly_one_warning() {
    struct Captor;
    struct Captive;

    let mut registry = Registry::new();
    registry
        .add(Registers::<Captive>::scoped(|_| Ok(Captive)))
        .unwrap();
    registry
        .add(Registers::<Captor>::singleton(|_| Ok(Captor)).requires::<Captive>())
        .unwrap();

    let report = registry.diagnostics();
    let captivity: Vec<_> = report
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::LifetimeCaptivity { .. }))
        .collect();

    assert_eq!(captivity.len(), 1);
    let message = captivity[0].to_string();
    assert!(message.contains("Captor"), "missing owner: {message}");
    assert!(message.contains("Captive"), "missing dependency: {message}");
    assert!(message.contains("Singleton"), "missing lifetime: {message}");
    assert!(message.contains("Scoped"), "missing lifetime: {message}");
}

#[test]
fn narrower_owner_is_not_captivity() {
    struct Short;
    struct Long;

    let mut registry = Registry::new();
    registry
        .add(Registers::<Long>::singleton(|_| Ok(Long)))
        .unwrap();
    registry
        .add(Registers::<Short>::transient(|_| Ok(Short)).requires::<Long>())
        .unwrap();

    assert!(registry.diagnostics().warnings.is_empty());
}

#[test]
fn duplicate_registration_is_reported_with_both_implementations() {
    struct Dup {
        #[allow(dead_code)]
        tag: &'static str,
    }

    let mut registry = Registry::new();
    registry
        .add(Registers::<Dup>::singleton(|_| Ok(Dup { tag: "first" })))
        .unwrap();
    registry
        .add(Registers::<Dup>::scoped(|_| Ok(Dup { tag: "second" })))
        .unwrap();

    let report = registry.diagnostics();
    let duplicates: Vec<_> = report
        .warnings
        .iter()
        .filter_map(|w| match w {
            Warning::DuplicateRegistration { entries, .. } => Some(entries),
            _ => None,
        })
        .collect();

    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].len(), 2);
    assert_eq!(duplicates[0][0].lifetime, Lifetime::Singleton);
    assert_eq!(duplicates[0][1].lifetime, Lifetime::Scoped);
}

#[test]
fn distinct_keys_are_not_duplicates() {
    struct Keyed;

    let mut registry = Registry::new();
    registry
        .add(Registers::<Keyed>::singleton(|_| Ok(Keyed)).keyed("a"))
        .unwrap();
    registry
        .add(Registers::<Keyed>::singleton(|_| Ok(Keyed)).keyed("b"))
        .unwrap();

    assert!(registry.diagnostics().warnings.is_empty());
}

#[test]
fn report_counts_by_lifetime() {
    let mut registry = Registry::new();
    registry
        .add(Registers::<ServiceA>::singleton(|_| Ok(ServiceA)))
        .unwrap();
    registry
        .add(Registers::<ServiceB>::scoped(|_| Ok(ServiceB)))
        .unwrap();
    registry
        .add(Registers::<ServiceC>::transient(|_| Ok(ServiceC)))
        .unwrap();

    let report = registry.diagnostics();
    assert_eq!(report.total, 3);
    assert_eq!(report.singletons, 1);
    assert_eq!(report.scoped, 1);
    assert_eq!(report.transients, 1);
}

// --- Discovery Errors ---

trait Exposed: Send + Sync {}

#[test]
fn exposing_an_undeclared_service_fails_fast() {
    let services = TypeCollection::new("bad")
        .add(Registers::<ServiceA>::singleton(|_| Ok(ServiceA)).exposes::<dyn Exposed>());

    let mut registry = Registry::new();
    let error = registry.discover(&[services]).unwrap_err();

    assert!(matches!(error, ConfigError::ServiceNotImplemented { .. }));
}

#[test]
fn explicit_service_list_suppresses_undeclared_interfaces() {
    trait Shown: Send + Sync {}
    trait Hidden: Send + Sync {}
    struct Both;
    impl Shown for Both {}
    impl Hidden for Both {}

    let services = TypeCollection::new("explicit").add(
        Registers::<Both>::singleton(|_| Ok(Both))
            .implements::<dyn Shown>(|b| b as Arc<dyn Shown>)
            .implements::<dyn Hidden>(|b| b as Arc<dyn Hidden>)
            .exposes::<dyn Shown>(),
    );

    let mut registry = Registry::new();
    registry.discover(&[services]).unwrap();
    let container = Container::build(registry).unwrap();

    assert!(container.resolve::<dyn Shown>().is_ok());
    assert!(container.resolve::<dyn Hidden>().is_err());
}

// --- Open Generic Convention ---

trait IRepository: Send + Sync {
    fn kind(&self) -> &'static str;
}

struct Repository;
impl IRepository for Repository {
    fn kind(&self) -> &'static str {
        "generic"
    }
}

fn repository_collection() -> TypeCollection {
    TypeCollection::new("data").add(
        Registers::<Repository>::singleton(|_| Ok(Repository))
            .named("Repository", 1)
            .implements::<dyn IRepository>(|r| r as Arc<dyn IRepository>),
    )
}

#[test]
fn open_generic_binds_by_stripped_name() {
    let collection = repository_collection();

    let mut registry = Registry::new();
    registry.discover(std::slice::from_ref(&collection)).unwrap();
    registry
        .bind_open_generic::<dyn IRepository>(
            &collection,
            &InterfaceDecl {
                simple_name: "IRepository",
                generic_arity: 1,
            },
        )
        .unwrap();

    let container = Container::build(registry).unwrap();
    assert_eq!(container.resolve::<dyn IRepository>().unwrap().kind(), "generic");
}

#[test]
fn open_generic_without_a_match_names_both_types() {
    let collection = repository_collection();

    let mut registry = Registry::new();
    let error = registry
        .bind_open_generic::<dyn IRepository>(
            &collection,
            &InterfaceDecl {
                simple_name: "IWarehouse",
                generic_arity: 1,
            },
        )
        .unwrap_err();

    match error {
        ConfigError::ImplementationNotFound { interface, derived, .. } => {
            assert_eq!(interface, "IWarehouse");
            assert_eq!(derived, "Warehouse");
        }
        other => panic!("expected ImplementationNotFound, got {other}"),
    }
}

#[test]
fn open_generic_arity_mismatch_is_rejected() {
    let collection = repository_collection();

    let mut registry = Registry::new();
    let error = registry
        .bind_open_generic::<dyn IRepository>(
            &collection,
            &InterfaceDecl {
                simple_name: "IRepository",
                generic_arity: 2,
            },
        )
        .unwrap_err();

    match error {
        ConfigError::GenericArityMismatch {
            interface_arity,
            implementation_arity,
            ..
        } => {
            assert_eq!(interface_arity, 2);
            assert_eq!(implementation_arity, 1);
        }
        other => panic!("expected GenericArityMismatch, got {other}"),
    }
}
