//! The Auth API: accounts, login with lockout, cashier management.

mod lockout;
mod password;
mod service;

pub use lockout::LoginAttempts;
pub use password::{PasswordError, Passwords};
pub use service::AuthService;
