use dagflow_core::error::DagError;
use dagflow_registry::RegistryError;

use crate::schema::SchemaLevel;

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("{message}\nFor example, as in:\n{sample}")]
    Schema { level: SchemaLevel, message: String, sample: String },

    #[error("unsupported callback type {found:?}: only \"Function\" or \"Plugin\" are accepted (case-insensitive)")]
    UnsupportedCallbackType { found: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Dag(#[from] DagError),

    #[error("could not parse workflow document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl LoaderError {
    pub fn schema(level: SchemaLevel, message: impl Into<String>) -> Self {
        Self::Schema {
            level,
            message: message.into(),
            sample: level.sample(),
        }
    }
}
