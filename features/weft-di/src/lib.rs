//! # weft-di
//!
//! A dependency-injection composition engine: a registry of service
//! descriptors with marker-driven discovery, structural validation of the
//! object graph before first use, and an ordered, fail-fast asynchronous
//! startup sequence.
//!
//! ## Core concepts
//!
//! - **Registration**: concrete types are declared through [`Registers`],
//!   carrying a lifetime, a constructor, declared dependencies and the
//!   interfaces they implement; [`TypeCollection`]s group declarations and
//!   [`Registry::discover`] turns them into descriptors.
//! - **Validation**: [`Registry::diagnostics`] reports lifetime captivity and
//!   duplicate registrations; [`Container::build`] rejects cyclic graphs
//!   before any service can be resolved.
//! - **Resolution**: singletons construct exactly once, scoped services live
//!   inside an explicit [`Scope`], transients construct per request, and
//!   keyed lazy factories realize at most once on first access.
//! - **Startup**: services exposing [`Initializable`] are planned into a
//!   dependency-safe, priority-biased order and executed strictly one after
//!   another.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use weft_di::{Container, Ctx, Registers, Registry, TypeCollection};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let services = TypeCollection::new("app")
//!     .add(Registers::<Database>::singleton(|_| {
//!         Ok(Database { url: "sqlite://memory".into() })
//!     }))
//!     .add(
//!         Registers::<UserService>::singleton(|ctx: &Ctx| {
//!             Ok(UserService { db: ctx.get::<Database>()? })
//!         })
//!         .requires::<Database>(),
//!     );
//!
//! let mut registry = Registry::new();
//! registry.discover(&[services]).unwrap();
//!
//! let container = Container::build(registry).unwrap();
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.db.url, "sqlite://memory");
//! ```

pub mod container;
pub mod dependency_graph;
pub mod descriptor;
pub mod diagnostics;
pub mod discovery;
pub mod errors;
pub mod initiator;
pub mod lazy;
pub mod types;

pub use container::{Container, Ctx, Scope};
pub use dependency_graph::DependencyGraph;
pub use descriptor::{DescriptorStore, ServiceDescriptor, ServiceSource};
pub use diagnostics::{DiagnosticsReport, DuplicateEntry, Warning};
pub use discovery::{InterfaceDecl, Registers, Registry, TypeCollection};
pub use errors::{ConfigError, CycleError, InitError, RequireError};
pub use initiator::{InitPlan, InitStep, Initializable};
pub use lazy::LazyKeyed;
pub use types::{DynError, Injectable, Instance, Lifetime, ServiceKey, TypeInfo};
