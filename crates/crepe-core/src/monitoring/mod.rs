//! Background monitoring tasks for locally held orders.

pub mod expiry;

pub use expiry::{ExpiryMonitor, ExpirySweep};
