use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use weft_di::{Container, Ctx, Lifetime, Registers, Registry, RequireError, TypeCollection};

// --- Test Fixtures ---

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct EnglishGreeter;
impl Greeter for EnglishGreeter {
    fn greet(&self) -> String {
        "Hello!".to_string()
    }
}

struct GermanGreeter;
impl Greeter for GermanGreeter {
    fn greet(&self) -> String {
        "Hallo!".to_string()
    }
}

struct Database {
    url: String,
}

struct UserService {
    db: Arc<Database>,
}

fn build(registry: Registry) -> Container {
    Container::build(registry).expect("graph must be acyclic")
}

// --- Basic Tests ---

#[test]
fn singleton_resolves_to_the_same_instance() {
    let mut registry = Registry::new();
    registry
        .add(Registers::<Database>::singleton(|_| {
            Ok(Database {
                url: "postgres://localhost".into(),
            })
        }))
        .unwrap();
    let container = build(registry);

    let first = container.resolve::<Database>().unwrap();
    let second = container.resolve::<Database>().unwrap();

    assert_eq!(first.url, "postgres://localhost");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn transient_resolves_to_a_fresh_instance() {
    let mut registry = Registry::new();
    registry
        .add(Registers::<Database>::transient(|_| {
            Ok(Database {
                url: "sqlite://memory".into(),
            })
        }))
        .unwrap();
    let container = build(registry);

    let first = container.resolve::<Database>().unwrap();
    let second = container.resolve::<Database>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn constructor_dependencies_resolve_through_the_context() {
    let services = TypeCollection::new("app")
        .add(Registers::<Database>::singleton(|_| {
            Ok(Database {
                url: "postgres://primary".into(),
            })
        }))
        .add(
            Registers::<UserService>::singleton(|ctx: &Ctx| {
                Ok(UserService {
                    db: ctx.get::<Database>()?,
                })
            })
            .requires::<Database>(),
        );

    let mut registry = Registry::new();
    registry.discover(&[services]).unwrap();
    let container = build(registry);

    let users = container.resolve::<UserService>().unwrap();
    let db = container.resolve::<Database>().unwrap();

    // The service shares the container's singleton, not a private copy.
    assert!(Arc::ptr_eq(&users.db, &db));
}

#[test]
fn last_registration_wins_for_single_resolution() {
    struct Tagged {
        tag: &'static str,
    }

    let mut registry = Registry::new();
    registry
        .add(Registers::<Tagged>::singleton(|_| Ok(Tagged { tag: "first" })))
        .unwrap();
    registry
        .add(Registers::<Tagged>::singleton(|_| Ok(Tagged { tag: "second" })))
        .unwrap();
    let container = build(registry);

    assert_eq!(container.resolve::<Tagged>().unwrap().tag, "second");
}

#[test]
fn enumerable_resolution_returns_all_registrations_in_order() {
    let mut registry = Registry::new();
    registry
        .add(
            Registers::<EnglishGreeter>::singleton(|_| Ok(EnglishGreeter))
                .implements::<dyn Greeter>(|g| g as Arc<dyn Greeter>),
        )
        .unwrap();
    registry
        .add(
            Registers::<GermanGreeter>::singleton(|_| Ok(GermanGreeter))
                .implements::<dyn Greeter>(|g| g as Arc<dyn Greeter>),
        )
        .unwrap();
    let container = build(registry);

    let all = container.resolve_all::<dyn Greeter>().unwrap();
    let greetings: Vec<String> = all.iter().map(|g| g.greet()).collect();

    assert_eq!(greetings, vec!["Hello!".to_string(), "Hallo!".to_string()]);
}

#[test]
fn multi_interface_aliases_share_one_instance() {
    trait Reads: Send + Sync {
        fn id(&self) -> usize;
    }
    trait Writes: Send + Sync {
        fn id(&self) -> usize;
    }
    struct Store {
        id: usize,
    }
    impl Reads for Store {
        fn id(&self) -> usize {
            self.id
        }
    }
    impl Writes for Store {
        fn id(&self) -> usize {
            self.id
        }
    }

    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();

    let mut registry = Registry::new();
    registry
        .add(
            Registers::<Store>::singleton(move |_| {
                Ok(Store {
                    id: counter.fetch_add(1, Ordering::SeqCst),
                })
            })
            .implements::<dyn Reads>(|s| s as Arc<dyn Reads>)
            .implements::<dyn Writes>(|s| s as Arc<dyn Writes>),
        )
        .unwrap();
    let container = build(registry);

    let reader = container.resolve::<dyn Reads>().unwrap();
    let writer = container.resolve::<dyn Writes>().unwrap();
    let concrete = container.resolve::<Store>().unwrap();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert_eq!(reader.id(), writer.id());
    assert_eq!(reader.id(), concrete.id);
}

#[test]
fn keyed_registrations_resolve_by_key() {
    struct Channel {
        label: &'static str,
    }

    let mut registry = Registry::new();
    registry
        .add(Registers::<Channel>::singleton(|_| Ok(Channel { label: "primary" })).keyed("primary"))
        .unwrap();
    registry
        .add(Registers::<Channel>::singleton(|_| Ok(Channel { label: "backup" })).keyed("backup"))
        .unwrap();
    let container = build(registry);

    assert_eq!(
        container.resolve_with_key::<Channel>("primary").unwrap().label,
        "primary"
    );
    assert_eq!(
        container.resolve_with_key::<Channel>("backup").unwrap().label,
        "backup"
    );
    // No unkeyed registration exists.
    assert!(matches!(
        container.resolve::<Channel>(),
        Err(RequireError::TypeMissing(_))
    ));
}

#[test]
fn missing_type_is_an_error() {
    struct Unregistered;

    let container = build(Registry::new());
    let result = container.resolve::<Unregistered>();

    assert!(matches!(result, Err(RequireError::TypeMissing(_))));
}

#[test]
fn factory_failure_surfaces_the_product() {
    struct Flaky;

    let mut registry = Registry::new();
    registry.add_factory::<Flaky, _>(Lifetime::Transient, |_| Err("disk on fire".into()));
    let container = build(registry);

    match container.resolve::<Flaky>() {
        Err(RequireError::FactoryFailed { product, error }) => {
            assert!(product.contains("Flaky"));
            assert!(error.to_string().contains("disk on fire"));
        }
        other => panic!("expected FactoryFailed, got {:?}", other.map(|_| ())),
    }
}

// --- Scope Tests ---

#[test]
fn scoped_services_are_cached_per_scope() {
    struct Session;

    let mut registry = Registry::new();
    registry
        .add(Registers::<Session>::scoped(|_| Ok(Session)))
        .unwrap();
    let container = build(registry);

    let scope_a = container.scope();
    let scope_b = container.scope();

    let first = scope_a.resolve::<Session>().unwrap();
    let second = scope_a.resolve::<Session>().unwrap();
    let other = scope_b.resolve::<Session>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));
}

#[test]
fn scoped_resolution_from_the_root_is_rejected() {
    struct Session;

    let mut registry = Registry::new();
    registry
        .add(Registers::<Session>::scoped(|_| Ok(Session)))
        .unwrap();
    let container = build(registry);

    assert!(matches!(
        container.resolve::<Session>(),
        Err(RequireError::ScopedFromRoot(_))
    ));
}

#[test]
fn dropping_a_scope_releases_its_instances() {
    struct Session;

    let mut registry = Registry::new();
    registry
        .add(Registers::<Session>::scoped(|_| Ok(Session)))
        .unwrap();
    let container = build(registry);

    let scope = container.scope();
    let session = scope.resolve::<Session>().unwrap();
    let weak = Arc::downgrade(&session);

    drop(session);
    assert!(weak.upgrade().is_some(), "scope still holds the instance");

    drop(scope);
    assert!(weak.upgrade().is_none(), "teardown must release the instance");
}

#[test]
fn singletons_resolved_in_a_scope_come_from_the_container() {
    struct Session {
        db: Arc<Database>,
    }

    let mut registry = Registry::new();
    registry
        .add(Registers::<Database>::singleton(|_| {
            Ok(Database {
                url: "postgres://shared".into(),
            })
        }))
        .unwrap();
    registry
        .add(
            Registers::<Session>::scoped(|ctx: &Ctx| {
                Ok(Session {
                    db: ctx.get::<Database>()?,
                })
            })
            .requires::<Database>(),
        )
        .unwrap();
    let container = build(registry);

    let scope = container.scope();
    let session = scope.resolve::<Session>().unwrap();
    let shared = container.resolve::<Database>().unwrap();

    assert!(Arc::ptr_eq(&session.db, &shared));
}
