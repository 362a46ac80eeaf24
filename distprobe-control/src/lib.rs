//! Client side of the server management control plane.

pub mod client;
pub mod errors;
pub mod protocol;

pub use client::{ControlPlane, HttpControlPlane};
pub use errors::ControlError;
pub use protocol::{Address, Operation, Outcome, ServerIdentity, ServerStatus};
