use crate::domain::synthesis::model::TaskTransitionError;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<AppError> for SynthesisServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => SynthesisServiceError::Invalid(msg),
            AppError::NotFound(msg) => SynthesisServiceError::NotFound(msg),
            _ => SynthesisServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<TaskTransitionError> for SynthesisServiceError {
    fn from(err: TaskTransitionError) -> Self {
        SynthesisServiceError::Dependency(err.to_string())
    }
}

impl From<SynthesisServiceError> for AppError {
    fn from(err: SynthesisServiceError) -> Self {
        match err {
            SynthesisServiceError::Invalid(msg) => AppError::BadRequest(msg),
            SynthesisServiceError::NotFound(what) => AppError::NotFound(what),
            SynthesisServiceError::Dependency(msg) => AppError::ExternalService(msg),
            SynthesisServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
