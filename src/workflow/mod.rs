//! Client-side coordinators used by the views.

mod access;
mod catalog;
mod error;
mod orders;

pub use access::{register, sign_in};
pub use catalog::CatalogWorkflow;
pub use error::{ErrorClass, WorkflowError};
pub use orders::{sort_orders, OrderWorkflow};
