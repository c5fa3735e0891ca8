//! Plan Service: structural parsing, scope validation, partition
//! derivation, canonical plan-hash computation, the ordered gate, and PIT
//! resolution, run in that order for every dry-run request.

pub mod action_counts;
pub mod error;
pub mod gate;
pub mod hash;
pub mod partitions;
pub mod pit;
pub mod request;
pub mod service;
pub mod store;

pub use error::PlanError;
pub use request::{DryRunPlanRequest, PlanOutcome};
pub use service::PlanService;
pub use store::PlanStoreState;
