#![forbid(unsafe_code)]

pub mod certification;
pub mod common;
pub mod competition;
pub mod ids;
pub mod progress;
pub mod role;

pub use common::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};
