use thiserror::Error;

use crate::domain::OrderStatus;

/// Errors returned by the Menu, Orders and Auth APIs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("Missing, invalid or expired bearer credential")]
    Unauthenticated,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Order {order_id} is {actual}, expected {expected}")]
    StatusMismatch {
        order_id: String,
        expected: OrderStatus,
        actual: OrderStatus,
    },
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Account locked: {0}")]
    Locked(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
