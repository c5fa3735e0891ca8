//! Shared domain and wire types for the Restore Request Service.
//!
//! Every entity here derives `Serialize`/`Deserialize` with field names
//! matching the wire contract verbatim, since several of them (rows,
//! conflicts, media candidates, pit, scope, execution_options) enter the
//! plan-hash canonicalization and must round-trip byte-for-byte.

mod audit;
mod job;
mod lock;
mod plan;
mod reason_code;
mod scope;
mod watermark;

pub use audit::*;
pub use job::*;
pub use lock::*;
pub use plan::*;
pub use reason_code::*;
pub use scope::*;
pub use watermark::*;
