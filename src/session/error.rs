use thiserror::Error;

use crate::token::TokenError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Not signed in")]
    SignedOut,
    #[error("Session expired, please sign in again")]
    Expired,
    #[error(transparent)]
    Token(#[from] TokenError),
}
