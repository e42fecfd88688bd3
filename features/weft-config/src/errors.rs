use weft_di::{RequireError, TypeInfo};

/// Errors when trying to acquire a config.
#[derive(thiserror::Error, Debug, Clone)]
pub enum GetConfigError {
    /// The required Config is not known.
    #[error("the required config type '{0}' is not registered")]
    Missing(TypeInfo),
}

/// Errors when trying to register a config.
#[derive(thiserror::Error, Debug, Clone)]
pub enum RegisterConfigError {
    /// The required Config is already registered.
    #[error("the config type '{0}' is already registered")]
    AlreadyRegistered(TypeInfo),
}

/// Errors when resolving a config through the container.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigResolveError {
    /// The [`crate::ConfigProvider`] itself could not be resolved.
    #[error(transparent)]
    Require(#[from] RequireError),

    #[error(transparent)]
    Get(#[from] GetConfigError),
}
