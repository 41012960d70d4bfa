use thiserror::Error;

use crate::domain::OrderStatus;
use crate::error::ApiError;
use crate::order_machine::TransitionError;
use crate::policy::Denied;
use crate::session::SessionError;

/// How a view should react to a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Send the user to the sign-in screen.
    SignIn,
    NoPermission,
    /// Tell the user the order changed and offer a refresh.
    OrderChanged,
    Retryable,
    Invalid,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Please sign in: {0}")]
    Unauthenticated(String),
    #[error("No permission: {0}")]
    Unauthorized(String),
    #[error("Order {order_id} changed, please refresh")]
    Conflict {
        order_id: String,
        expected: OrderStatus,
        actual: Option<OrderStatus>,
    },
    #[error("Temporary failure, please try again: {0}")]
    Transient(String),
    #[error("{0}")]
    Validation(String),
}

impl WorkflowError {
    pub fn class(&self) -> ErrorClass {
        match self {
            WorkflowError::Unauthenticated(_) => ErrorClass::SignIn,
            WorkflowError::Unauthorized(_) => ErrorClass::NoPermission,
            WorkflowError::Conflict { .. } => ErrorClass::OrderChanged,
            WorkflowError::Transient(_) => ErrorClass::Retryable,
            WorkflowError::Validation(_) => ErrorClass::Invalid,
        }
    }

    /// Retrying is up to the user; nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }
}

impl From<ApiError> for WorkflowError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthenticated => {
                WorkflowError::Unauthenticated("credential rejected".to_string())
            }
            ApiError::Locked(message) => WorkflowError::Unauthenticated(message),
            ApiError::Forbidden(message) => WorkflowError::Unauthorized(message),
            ApiError::StatusMismatch {
                order_id,
                expected,
                actual,
            } => WorkflowError::Conflict {
                order_id,
                expected,
                actual: Some(actual),
            },
            ApiError::NotFound(what) => WorkflowError::Validation(format!("{} not found", what)),
            ApiError::Rejected(message) => WorkflowError::Validation(message),
            ApiError::ActorCommunicationError(message) => WorkflowError::Transient(message),
        }
    }
}

impl From<Denied> for WorkflowError {
    fn from(denied: Denied) -> Self {
        WorkflowError::Unauthorized(denied.to_string())
    }
}

impl From<TransitionError> for WorkflowError {
    fn from(err: TransitionError) -> Self {
        WorkflowError::Validation(err.to_string())
    }
}

impl From<SessionError> for WorkflowError {
    fn from(err: SessionError) -> Self {
        WorkflowError::Unauthenticated(err.to_string())
    }
}
