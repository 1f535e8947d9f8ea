//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod export;
pub mod health;
pub mod reports;
pub mod session;
pub mod subscriptions;
pub mod transactions;

// Re-export all handlers for use in router
pub use export::*;
pub use health::*;
pub use reports::*;
pub use session::*;
pub use subscriptions::*;
pub use transactions::*;
