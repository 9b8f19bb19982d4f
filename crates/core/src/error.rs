use crate::job::JobState;
use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No such job: {0}")]
    JobNotFound(JobId),

    #[error("No such process: {0}")]
    ProcessNotFound(String),

    #[error("Job {job_id} is not finished yet (state: {state})")]
    JobNotReady { job_id: JobId, state: JobState },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
