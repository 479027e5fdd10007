//! SMS code relay.
//!
//! Polls an SMS rental provider for verification codes on behalf of every
//! active activation, merges them with codes submitted by client devices
//! and pushes at most one notification per code to the device's Web Push
//! subscription.

pub mod api;
pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod notification;
pub mod poller;
pub mod relay;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use dedup::DedupGuard;
pub use dispatcher::{ChangeDispatcher, DispatchSummary};
pub use error::{RelayError, RelayResult};
pub use poller::{ProbeOutcome, ProviderPoller};
pub use relay::Relay;
