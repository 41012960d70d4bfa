//! Menu-specific domain logic, including stock management actions.

mod actions;
pub mod entity;

pub use actions::*;
