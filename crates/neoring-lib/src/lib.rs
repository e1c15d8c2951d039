//! neoring: runtime core for a network-controlled addressable LED ring.

pub mod config;
pub mod context;
pub mod device;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod led;
pub mod listener;
pub mod queue;
pub mod reconnect;
pub mod transport;
pub mod worker;

pub use error::NeoringError;
