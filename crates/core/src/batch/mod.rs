//! Batch orchestration
//!
//! Fans out independent item-level operations and aggregates their outcomes
//! into a partial-failure report. Two execution policies are provided:
//!
//! - [`settle_all`]: every item runs concurrently and the call waits for all
//!   of them; one failure never cancels its siblings.
//! - [`run_sequential`]: items run one at a time in input order, reporting
//!   progress after each item; failures are recorded and execution continues.
//!
//! Both return a [`BatchResult`] whose per-item entries follow input order.

pub mod orchestrator;
pub mod outcome;

pub use orchestrator::{run_sequential, settle_all, BatchProgress};
pub use outcome::{BatchResult, Outcome};
