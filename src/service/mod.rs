//! Workflow service modules
//!
//! This module contains the order monitor, the swap workflow orchestrator and the
//! market-lifecycle flow built on top of it.

pub mod lifecycle;
pub mod market;
pub mod monitor;
pub mod workflow;

// Re-export for convenience
pub use lifecycle::{LifecycleOutcome, MarketLifecycle};
pub use market::OutcomeSide;
pub use monitor::{OrderAccount, OrderMonitor};
pub use workflow::{SwapOutcome, SwapWorkflow};
