//! Request handlers.

pub mod analyze;
pub mod health;
pub mod views;

pub use analyze::*;
pub use health::*;
pub use views::*;
