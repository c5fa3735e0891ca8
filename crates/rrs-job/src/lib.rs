//! Job Service: the admission/queueing/lifecycle state machine built on top
//! of the table-scope lock manager and the append-only per-job audit
//! stream.

pub mod error;
pub mod request;
pub mod service;
pub mod store;
pub mod transition;

pub use error::JobError;
pub use request::{
    CompleteJobOutcome, CompleteJobRequest, CreateJobOutcome, CreateJobRequest, TerminalStatus,
};
pub use service::JobService;
pub use store::JobStoreState;
