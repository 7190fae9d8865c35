//! campvoice/crates/cv-core/src/lib.rs
//!
//! Domain models, ports and the optimistic vote bookkeeping for the
//! campvoice client.

pub mod cache;
pub mod error;
pub mod ledger;
pub mod models;
pub mod session;
pub mod traits;
pub mod vote;

// Re-exporting for easier access in other crates
pub use cache::*;
pub use error::*;
pub use ledger::*;
pub use models::*;
pub use session::*;
pub use traits::*;
pub use vote::*;
