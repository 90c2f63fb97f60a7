use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("unknown node: {0}")]
    UnknownNode(u64),
}

impl DomError {
    pub fn invalid(selector: impl Into<String>) -> Self {
        Self::InvalidSelector(selector.into())
    }

    pub fn unsupported(selector: impl Into<String>) -> Self {
        Self::UnsupportedSelector(selector.into())
    }
}
