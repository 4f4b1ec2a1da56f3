//! Ports module for the Lock Manager

pub mod inbound;
pub mod outbound;

pub use inbound::DistributedLockApi;
pub use outbound::LockBackend;
