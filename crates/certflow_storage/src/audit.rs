#![forbid(unsafe_code)]

use certflow_kernel_contracts::certification::CertificationAuditInput;
use tracing::debug;

use crate::store::CertStore;

/// Append-only writer into the `certification_audit` table.
///
/// Runtimes call this inside the same transaction as the ledger write it describes,
/// so an audit row never survives a rolled-back transition.
#[derive(Debug, Default)]
pub struct CertAuditWriter;

impl CertAuditWriter {
    pub fn emit(store: &mut CertStore, input: CertificationAuditInput) -> u64 {
        debug!(
            action = ?input.action,
            actor = %input.actor,
            category_id = ?input.category_id.as_ref().map(|c| c.as_str()),
            reason_code = input.reason_code.0,
            "certification audit"
        );
        store.append_audit_row(input)
    }
}
