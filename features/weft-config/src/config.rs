use std::{ops::Deref, sync::Arc};

use weft_di::{Ctx, TypeInfo};

use crate::{
    errors::{ConfigResolveError, GetConfigError},
    provider::ConfigProvider,
};

/// A wrapper type to allow for config injections.
///
/// This provides a simple way to retrieve configs from the config registry
/// and inject them into a constructor as a dependency.
pub struct Config<T> {
    inner: Arc<T>,
}

impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

/// Extends the resolution context with typed config lookup.
pub trait ConfigResolve {
    fn config<T: Send + Sync + 'static>(&self) -> Result<Config<T>, ConfigResolveError>;
}

impl ConfigResolve for Ctx<'_> {
    fn config<T: Send + Sync + 'static>(&self) -> Result<Config<T>, ConfigResolveError> {
        let provider = self.get::<ConfigProvider>()?;
        let inner = provider
            .get_config::<T>()
            .ok_or(GetConfigError::Missing(TypeInfo::of::<T>()))?;
        Ok(Config { inner })
    }
}
