use mutation_filter::FilterError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown subscription preset: {0}")]
    UnknownPreset(String),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error(transparent)]
    Watch(#[from] FilterError),
    #[error("engine runtime has shut down")]
    RuntimeClosed,
}
