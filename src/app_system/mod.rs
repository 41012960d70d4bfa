//! System orchestration, startup, and shutdown logic.

pub mod cafe_system;
pub mod telemetry;

pub use cafe_system::*;
pub use telemetry::*;
