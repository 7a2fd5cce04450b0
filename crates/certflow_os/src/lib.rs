#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod final_cert;
pub mod ledger;
pub mod notify;
pub mod progress;
pub mod reset;
pub mod stage_gate;

#[cfg(test)]
mod test_support;

pub use config::{load_config, CertflowConfig, ConfigError};
pub use error::{CertificationError, ErrorKind};
pub use final_cert::{Confirmations, FinalCertificationCoordinator};
pub use ledger::CertificationLedger;
pub use notify::{CertificationChanged, CertificationEventSink};
pub use progress::ProgressAggregator;
pub use reset::{BulkResetCoordinator, ResetRequest, ResetScope};
pub use stage_gate::StageGateEvaluator;
