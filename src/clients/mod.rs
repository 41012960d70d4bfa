//! Typed handles for talking to the Menu, Orders and Auth APIs.

#[macro_use]
mod macros;

pub mod auth_client;
pub mod menu_client;
pub mod order_client;

pub use auth_client::AuthClient;
pub use menu_client::MenuClient;
pub use order_client::OrderClient;
