use std::time::Duration;
use thiserror::Error;

/// Request-fatal errors. Backend failures inside a single prefix or table
/// never surface here; they are absorbed into `Outcome::Failed`.
#[derive(Debug, Error)]
pub enum SizeError {
    #[error("Missing task_id parameter.")]
    MissingTaskId,

    #[error("Unknown workflow_type: {0}")]
    UnknownWorkflow(String),

    #[error("S3 bucket configuration missing.")]
    MissingStorageConfig,

    #[error("Error calculating data sizes: deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("Error calculating data sizes: {0}")]
    Internal(String),
}

impl SizeError {
    pub fn status_code(&self) -> u16 {
        match self {
            SizeError::MissingTaskId | SizeError::UnknownWorkflow(_) => 400,
            SizeError::MissingStorageConfig
            | SizeError::DeadlineExceeded(_)
            | SizeError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_input_errors_are_400() {
        assert_eq!(SizeError::MissingTaskId.status_code(), 400);
        assert_eq!(SizeError::UnknownWorkflow("x".into()).status_code(), 400);
    }

    #[test]
    fn configuration_and_deadline_errors_are_500() {
        assert_eq!(SizeError::MissingStorageConfig.status_code(), 500);
        assert_eq!(
            SizeError::DeadlineExceeded(Duration::from_secs(1)).status_code(),
            500
        );
    }

    #[test]
    fn unknown_workflow_message_names_the_token() {
        let msg = SizeError::UnknownWorkflow("audio".into()).to_string();
        assert_eq!(msg, "Unknown workflow_type: audio");
    }
}
