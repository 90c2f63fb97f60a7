use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("mutation root not found: {selector}")]
    RootNotFound { selector: String },
}

impl FilterError {
    pub fn root_not_found(selector: impl Into<String>) -> Self {
        Self::RootNotFound {
            selector: selector.into(),
        }
    }

    /// Stable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::RootNotFound { .. } => "mutation_root_not_found",
        }
    }
}
