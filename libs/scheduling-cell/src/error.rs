use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Slot conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment already in a terminal state: {0}")]
    AlreadyTerminal(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl SchedulingError {
    /// Message suitable for showing to the person who triggered the action.
    pub fn user_message(&self) -> String {
        match self {
            SchedulingError::Conflict(_) => {
                "slot no longer available, please pick another".to_string()
            }
            SchedulingError::InvalidTransition(_) | SchedulingError::AlreadyTerminal(_) => {
                "this action is not allowed in the current state".to_string()
            }
            SchedulingError::NotFound(what) => what.clone(),
            SchedulingError::ValidationError(msg) => msg.clone(),
            SchedulingError::Unauthorized(_) => {
                "you are not allowed to act on this appointment".to_string()
            }
            SchedulingError::Backend(_) => {
                "the scheduling service is unavailable, please try again".to_string()
            }
        }
    }
}
