pub mod account;
pub mod identity;
pub mod menu;
pub mod order;

pub use account::*;
pub use identity::*;
pub use menu::*;
pub use order::*;
