//! Core order handling for the crepe shop.
//!
//! This crate reconciles the draft and pending orders held in local storage
//! with the remote order store. It contains the order reconciler, the cart
//! used to assemble orders, the order lifecycle rules, the periodic expiry
//! monitor and the engine and builder that wire these together from
//! configuration.

pub mod builder;
pub mod cart;
pub mod engine;
pub mod monitoring;
pub mod reconciler;
pub mod state;

pub use builder::{BuilderError, ShopBuilder, ShopFactories};
pub use cart::Cart;
pub use engine::{event_bus::EventBus, CheckoutReceipt, EngineError, ShopEngine};
pub use reconciler::{
	OrderReconciler, PaymentRequest, ReconcilerError, ReconcilerSettings, RemoteOutcome,
};
pub use state::{LifecycleError, OrderLifecycle};
