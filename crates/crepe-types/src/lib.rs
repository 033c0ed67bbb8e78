//! Common types for the crepe shop ordering system.
//!
//! This crate defines the data types shared by every other crate in the
//! workspace: orders and their line items, pricing rules, payment references,
//! local storage keys, events and the configuration validation framework used
//! by pluggable implementations.

/// Events published when orders change state.
pub mod events;
/// Orders, line items, statuses and statistics.
pub mod order;
/// Payment reference text shown to the customer.
pub mod payment;
/// Crepe pricing rules.
pub mod pricing;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secret string wrapper for API keys.
pub mod secret_string;
/// Local storage keys.
pub mod storage;
/// Display helpers.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use events::*;
pub use order::*;
pub use payment::*;
pub use pricing::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::truncate_id;
pub use validation::*;
