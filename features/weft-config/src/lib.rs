//! Weft Config provides a typed registry of configs that can be injected
//! into the rest of the modules.
//!
//! It is split into two major parts:
//! 1. [`ConfigProvider`]: the registry all configs are added to, registered
//!    with the container as a pre-built instance.
//! 2. [`Config<T>`]: a wrapper type to resolve and retrieve configs during
//!    construction, through the [`ConfigResolve`] extension on the
//!    resolution context.
//!
//! # Example
//!
//! ```
//! use weft_config::{Config, ConfigProvider, ConfigResolve};
//! use weft_di::{Container, Ctx, Registers, Registry};
//!
//! #[derive(Clone)]
//! struct AppConfig {
//!     app_name: String,
//! }
//!
//! struct Banner {
//!     text: String,
//! }
//!
//! let mut provider = ConfigProvider::initialize();
//! provider
//!     .add_config(AppConfig { app_name: "weft".into() })
//!     .unwrap();
//!
//! let mut registry = Registry::new();
//! registry.add_instance(provider);
//! registry
//!     .add(Registers::<Banner>::singleton(|ctx: &Ctx| {
//!         let config = ctx.config::<AppConfig>()?;
//!         Ok(Banner { text: config.app_name.clone() })
//!     }))
//!     .unwrap();
//!
//! let container = Container::build(registry).unwrap();
//! let banner = container.resolve::<Banner>().unwrap();
//! assert_eq!(banner.text, "weft");
//! ```

pub mod config;
pub mod errors;
pub mod provider;

pub use config::{Config, ConfigResolve};
pub use errors::{ConfigResolveError, GetConfigError, RegisterConfigError};
pub use provider::ConfigProvider;
