//! The Orders API: order records, stock reservation and status transitions.

mod service;

pub use service::OrderService;
