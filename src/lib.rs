//! Ordering core for a café counter: who may do what, how an order moves
//! from payment to pickup, and how client views stay in step with the
//! server.

pub mod actor_framework;
pub mod app_system;
pub mod auth_actor;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod menu_actor;
pub mod messages;
pub mod order_actor;
pub mod order_machine;
pub mod policy;
pub mod session;
pub mod token;
pub mod workflow;

#[cfg(test)]
mod mock_framework;
