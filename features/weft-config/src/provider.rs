use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use weft_di::TypeInfo;

use crate::errors::RegisterConfigError;

/// A provider to register all configs.
///
/// Configs can be registered and retrieved based on type. Register the
/// populated provider with the container as a pre-built instance so
/// constructors can reach it.
#[derive(Default)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, Arc<dyn Any + Send + Sync + 'static>>,
}

impl ConfigProvider {
    /// Initializes an empty Config Provider.
    pub fn initialize() -> Self {
        Self::default()
    }

    /// Retrieve a config with the specified type.
    pub fn get_config<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.configs
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.clone().downcast().ok())
    }

    /// Add a config to the registry.
    ///
    /// If the config type is already registered, it will return a
    /// [`RegisterConfigError`] runtime error.
    pub fn add_config<T: Send + Sync + 'static>(
        &mut self,
        config: T,
    ) -> Result<&mut Self, RegisterConfigError> {
        let type_id = TypeId::of::<T>();

        if self.configs.contains_key(&type_id) {
            return Err(RegisterConfigError::AlreadyRegistered(TypeInfo::of::<T>()));
        }

        self.configs.insert(type_id, Arc::new(config));
        Ok(self)
    }

    /// Can optionally add a config to the registry.
    ///
    /// With `Some(T)` this is the same as calling [`ConfigProvider::add_config`];
    /// with `None` the call is a no-op so chaining keeps working.
    pub fn maybe_add_config<T: Send + Sync + 'static>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, RegisterConfigError> {
        match config {
            Some(config) => self.add_config(config),
            None => Ok(self),
        }
    }
}
