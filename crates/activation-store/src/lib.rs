//! Real-time store for SMS activation sessions.
//!
//! Holds every active rental session (phone number, service, device push
//! subscription and received messages) and broadcasts a child-level
//! change event after each write. Optionally mirrors its contents to a
//! JSON snapshot so monitoring can resume after a restart.

mod error;
mod snapshot;
mod store;
mod types;

pub use error::StoreError;
pub use snapshot::SnapshotFile;
pub use store::ActivationStore;
pub use types::*;
