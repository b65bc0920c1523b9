// Application layer - use cases orchestrating the entity store, the billing
// ledger and the notifier.

pub mod error;
pub mod notifier;
pub mod service;

pub use error::*;
pub use notifier::*;
pub use service::*;
