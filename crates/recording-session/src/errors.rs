use dom_model::DomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("host capability missing: {0}")]
    CapabilityMissing(&'static str),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("context runtime stopped")]
    Stopped,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl From<RuntimeError> for actiontrail_core_types::TrailError {
    fn from(value: RuntimeError) -> Self {
        actiontrail_core_types::TrailError::new(value.to_string())
    }
}
