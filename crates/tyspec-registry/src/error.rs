use thiserror::Error;

use tyspec_core::{ClassId, InterfaceId};

/// Errors raised while populating the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate class: {0}")]
    DuplicateClass(String),

    #[error("duplicate interface: {0}")]
    DuplicateInterface(String),

    #[error("duplicate field '{field}' in class '{class}'")]
    DuplicateField { class: String, field: String },

    #[error("class not found: {0}")]
    UnknownClass(ClassId),

    #[error("interface not found: {0}")]
    UnknownInterface(InterfaceId),
}
