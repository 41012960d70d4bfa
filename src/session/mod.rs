//! Client-side credential context: the stored bearer token and the identity
//! decoded from it.

mod context;
mod error;
mod store;

pub use context::{watch_expiry, Session};
pub use error::SessionError;
pub use store::{MemoryTokenStore, TokenStore};
