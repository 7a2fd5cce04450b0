#![forbid(unsafe_code)]

use std::sync::Arc;

use certflow_kernel_contracts::certification::{
    CertificationAuditAction, CertificationAuditInput, InsertOutcome, RoleCertification,
};
use certflow_kernel_contracts::ids::{CategoryId, UserId};
use certflow_kernel_contracts::role::Role;
use certflow_kernel_contracts::MonotonicTimeNs;
use certflow_storage::audit::CertAuditWriter;
use certflow_storage::store::{CertStore, RoleSignoffKey};
use tracing::{info, warn};

use crate::config::CertflowConfig;
use crate::error::CertificationError;
use crate::notify::{CertificationChanged, CertificationEventSink};
use crate::stage_gate::StageGateEvaluator;

pub mod reason_codes {
    use certflow_kernel_contracts::ReasonCodeId;

    pub const FINAL_CERT_OK_LOCKED: ReasonCodeId = ReasonCodeId(0x4600_0001);
}

/// The two explicit acknowledgements the auditor must give before scores lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confirmations {
    pub c1: bool,
    pub c2: bool,
}

impl Confirmations {
    pub fn both() -> Self {
        Self { c1: true, c2: true }
    }

    fn confirmed(&self) -> bool {
        self.c1 && self.c2
    }
}

/// Creates the AUDIT sign-off and locks the category's scores in one unit.
pub struct FinalCertificationCoordinator {
    config: Arc<CertflowConfig>,
    gate: StageGateEvaluator,
    sink: Arc<dyn CertificationEventSink>,
}

impl FinalCertificationCoordinator {
    pub fn new(config: Arc<CertflowConfig>, sink: Arc<dyn CertificationEventSink>) -> Self {
        let gate = StageGateEvaluator::new(config.roles.clone());
        Self { config, gate, sink }
    }

    pub fn submit(
        &self,
        store: &mut CertStore,
        category_id: &CategoryId,
        user_id: &UserId,
        confirmations: Confirmations,
        at: MonotonicTimeNs,
    ) -> Result<RoleCertification, CertificationError> {
        if !confirmations.confirmed() {
            return Err(CertificationError::validation(
                "both final certification confirmations are required",
            ));
        }

        let status = self.gate.final_certification_status(store, category_id)?;
        if status.already_certified {
            return Err(CertificationError::conflict(format!(
                "category {category_id} is already certified"
            )));
        }
        if !status.can_certify {
            return Err(CertificationError::validation(format!(
                "category {category_id} is missing {} tally certification(s)",
                status.tally_certifications.missing
            )));
        }
        if status.score_status.uncertified > 0 {
            return Err(CertificationError::validation(format!(
                "category {category_id} has {} uncertified score(s)",
                status.score_status.uncertified
            )));
        }

        let audit_role = &self.config.roles.audit_role;
        let caller_role = store
            .get_user(user_id)
            .map(|u| u.role.as_str().to_string())
            .unwrap_or_default();
        if caller_role != *audit_role {
            warn!(
                category_id = %category_id,
                user_id = %user_id,
                role = %caller_role,
                "final certification refused for role"
            );
            return Err(CertificationError::Forbidden {
                role: caller_role,
                action: "final_certification",
            });
        }
        let role = Role::new(audit_role)?;

        let before = self.gate.current_stage(store, category_id)?;
        let row = store.transaction(|tx| -> Result<_, CertificationError> {
            let key = RoleSignoffKey::per_role(category_id.clone(), role.clone());
            let row = match tx.insert_role_certification_if_absent(key, user_id.clone(), at)? {
                InsertOutcome::Inserted(row) => row,
                InsertOutcome::AlreadyPresent(_) => {
                    return Err(CertificationError::conflict(format!(
                        "category {category_id} is already certified"
                    )));
                }
            };
            let newly_certified = tx.lock_category_scores(category_id, at, user_id);
            self.gate.refresh_workflow_status(tx, category_id, at)?;
            CertAuditWriter::emit(
                tx,
                CertificationAuditInput {
                    at,
                    actor: user_id.to_string(),
                    category_id: Some(category_id.clone()),
                    action: CertificationAuditAction::FinalCertification,
                    reason_code: reason_codes::FINAL_CERT_OK_LOCKED,
                    detail: format!("scores_certified_on_lock={newly_certified}"),
                },
            );
            Ok(row)
        })?;

        info!(
            category_id = %category_id,
            user_id = %user_id,
            "category certified and scores locked"
        );
        let after = self.gate.current_stage(store, category_id)?;
        if after != before {
            self.sink.emit(&CertificationChanged {
                category_id: category_id.clone(),
                new_stage: after,
            });
        }
        Ok(row)
    }
}
