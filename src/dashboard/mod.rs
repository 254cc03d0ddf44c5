pub mod filter;
pub mod notifications;
pub mod orchestrator;
pub mod reconcile;
pub mod stats;
