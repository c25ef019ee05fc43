use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum MergeServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("no synthesized segments to merge")]
    NoEligibleSegments,
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("segment audio is not mergeable: {0}")]
    InvalidAudio(String),
}

impl From<AppError> for MergeServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => MergeServiceError::Invalid(msg),
            AppError::NotFound(msg) => MergeServiceError::NotFound(msg),
            _ => MergeServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<MergeServiceError> for AppError {
    fn from(err: MergeServiceError) -> Self {
        match err {
            MergeServiceError::NoEligibleSegments => {
                AppError::BadRequest("no synthesized segments to merge".to_string())
            }
            MergeServiceError::Invalid(msg) => AppError::BadRequest(msg),
            MergeServiceError::InvalidAudio(msg) => AppError::BadRequest(msg),
            MergeServiceError::NotFound(what) => AppError::NotFound(what),
            MergeServiceError::Dependency(msg) => AppError::Internal(msg),
        }
    }
}
