#![forbid(unsafe_code)]

use std::sync::Arc;

use certflow_kernel_contracts::certification::{
    CertificationAuditAction, CertificationAuditInput, InsertOutcome,
    JudgeContestantCertification, ReviewSignoff, RoleCertification, WorkflowStage,
};
use certflow_kernel_contracts::ids::{CategoryId, ContestantId, JudgeId, UserId};
use certflow_kernel_contracts::progress::{
    CertificationProgress, JudgeStageProgress, RoleStageProgress,
};
use certflow_kernel_contracts::role::Role;
use certflow_kernel_contracts::MonotonicTimeNs;
use certflow_storage::audit::CertAuditWriter;
use certflow_storage::store::{CertStore, RoleSignoffKey};
use tracing::{debug, info};

use crate::config::CertflowConfig;
use crate::error::CertificationError;
use crate::notify::{CertificationChanged, CertificationEventSink};
use crate::stage_gate::StageGateEvaluator;

pub mod reason_codes {
    use certflow_kernel_contracts::ReasonCodeId;

    pub const LEDGER_OK_JUDGE_CONTESTANT_SIGNOFF: ReasonCodeId = ReasonCodeId(0x4C00_0001);
    pub const LEDGER_OK_ROLE_SIGNOFF: ReasonCodeId = ReasonCodeId(0x4C00_0002);
    pub const LEDGER_OK_REVIEW_SIGNOFF: ReasonCodeId = ReasonCodeId(0x4C00_0003);
}

/// Judge-stage completeness: exact count of sign-off rows against
/// `contestants × judges`.
pub(crate) fn judge_stage_progress(
    store: &CertStore,
    category_id: &CategoryId,
) -> JudgeStageProgress {
    let total_contestants = store.category_contestants(category_id).len() as u32;
    let total_judges = store.category_judges(category_id).len() as u32;
    let contestants_certified = store
        .judge_contestant_certifications_for_category(category_id)
        .len() as u32;
    let expected_signoffs = total_contestants.saturating_mul(total_judges);
    JudgeStageProgress {
        contestants_certified,
        total_contestants,
        total_judges,
        expected_signoffs,
        is_category_certified: contestants_certified == expected_signoffs,
    }
}

fn role_stage_progress<F>(
    store: &CertStore,
    category_id: &CategoryId,
    matches: F,
) -> RoleStageProgress
where
    F: Fn(&Role) -> bool,
{
    let signers: Vec<UserId> = store
        .role_certifications_for_category(category_id)
        .into_iter()
        .filter(|r| matches(&r.role))
        .map(|r| r.user_id.clone())
        .collect();
    RoleStageProgress {
        completed: signers.len() as u32,
        is_certified: !signers.is_empty(),
        signers,
    }
}

/// Records sign-off facts. Each write runs in one store transaction together
/// with the projection refresh and its audit row.
pub struct CertificationLedger {
    config: Arc<CertflowConfig>,
    gate: StageGateEvaluator,
    sink: Arc<dyn CertificationEventSink>,
}

impl CertificationLedger {
    pub fn new(config: Arc<CertflowConfig>, sink: Arc<dyn CertificationEventSink>) -> Self {
        let gate = StageGateEvaluator::new(config.roles.clone());
        Self { config, gate, sink }
    }

    fn require_category(
        store: &CertStore,
        category_id: &CategoryId,
    ) -> Result<(), CertificationError> {
        if store.get_category(category_id).is_none() {
            return Err(CertificationError::not_found("category", category_id));
        }
        Ok(())
    }

    fn notify_if_moved(
        &self,
        category_id: &CategoryId,
        before: WorkflowStage,
        after: WorkflowStage,
    ) {
        if before != after {
            self.sink.emit(&CertificationChanged {
                category_id: category_id.clone(),
                new_stage: after,
            });
        }
    }

    /// Idempotent on (judge, contestant, category): a repeat call returns the
    /// existing row as `AlreadyPresent` and writes nothing.
    pub fn record_judge_contestant_signoff(
        &self,
        store: &mut CertStore,
        judge_id: &JudgeId,
        contestant_id: &ContestantId,
        category_id: &CategoryId,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<JudgeContestantCertification>, CertificationError> {
        Self::require_category(store, category_id)?;
        if !store.is_judge_assigned(category_id, judge_id) {
            return Err(CertificationError::validation(format!(
                "judge {judge_id} is not assigned to category {category_id}"
            )));
        }
        if !store.is_contestant_assigned(category_id, contestant_id) {
            return Err(CertificationError::validation(format!(
                "contestant {contestant_id} is not assigned to category {category_id}"
            )));
        }
        let before = self.gate.current_stage(store, category_id)?;
        let signer = UserId::new(judge_id.as_str())?;

        let outcome = store.transaction(|tx| -> Result<_, CertificationError> {
            let outcome = tx.insert_judge_contestant_certification_if_absent(
                category_id.clone(),
                judge_id.clone(),
                contestant_id.clone(),
                at,
            )?;
            if !outcome.was_inserted() {
                return Ok(outcome);
            }
            let certified =
                tx.certify_contestant_scores(category_id, judge_id, contestant_id, at, &signer);
            self.gate.refresh_workflow_status(tx, category_id, at)?;
            CertAuditWriter::emit(
                tx,
                CertificationAuditInput {
                    at,
                    actor: judge_id.to_string(),
                    category_id: Some(category_id.clone()),
                    action: CertificationAuditAction::JudgeContestantSignoff,
                    reason_code: reason_codes::LEDGER_OK_JUDGE_CONTESTANT_SIGNOFF,
                    detail: format!("contestant={contestant_id} scores_certified={certified}"),
                },
            );
            Ok(outcome)
        })?;

        if outcome.was_inserted() {
            info!(
                category_id = %category_id,
                judge_id = %judge_id,
                contestant_id = %contestant_id,
                "judge contestant signoff recorded"
            );
            let after = self.gate.current_stage(store, category_id)?;
            self.notify_if_moved(category_id, before, after);
        } else {
            debug!(
                category_id = %category_id,
                judge_id = %judge_id,
                contestant_id = %contestant_id,
                "judge contestant signoff already present"
            );
        }
        Ok(outcome)
    }

    /// TALLY sign-offs are unique per signer (one expected per assigned judge);
    /// every other role is unique per category. AUDIT is refused here because it
    /// is only created by final certification, and board roles wait for it.
    pub fn record_role_signoff(
        &self,
        store: &mut CertStore,
        category_id: &CategoryId,
        role: &Role,
        user_id: &UserId,
        at: MonotonicTimeNs,
    ) -> Result<RoleCertification, CertificationError> {
        Self::require_category(store, category_id)?;
        let roles = &self.config.roles;
        if roles.is_audit_role(role.as_str()) {
            return Err(CertificationError::validation(
                "audit sign-off is recorded by final certification",
            ));
        }
        let before = self.gate.current_stage(store, category_id)?;
        if roles.is_board_role(role.as_str()) && before < WorkflowStage::Board {
            return Err(CertificationError::validation(format!(
                "board sign-off requires audit certification; category {category_id} is at {}",
                before.as_str()
            )));
        }

        let key = if roles.is_tally_role(role.as_str()) {
            RoleSignoffKey::per_signer(category_id.clone(), role.clone(), user_id.clone())
        } else {
            RoleSignoffKey::per_role(category_id.clone(), role.clone())
        };

        let row = store.transaction(|tx| -> Result<_, CertificationError> {
            let row = match tx.insert_role_certification_if_absent(key, user_id.clone(), at)? {
                InsertOutcome::Inserted(row) => row,
                InsertOutcome::AlreadyPresent(existing) => {
                    return Err(CertificationError::conflict(format!(
                        "{} already signed off category {category_id} as {}",
                        existing.user_id, existing.role
                    )));
                }
            };
            self.gate.refresh_workflow_status(tx, category_id, at)?;
            CertAuditWriter::emit(
                tx,
                CertificationAuditInput {
                    at,
                    actor: user_id.to_string(),
                    category_id: Some(category_id.clone()),
                    action: CertificationAuditAction::RoleSignoff,
                    reason_code: reason_codes::LEDGER_OK_ROLE_SIGNOFF,
                    detail: format!("role={role}"),
                },
            );
            Ok(row)
        })?;

        info!(
            category_id = %category_id,
            role = %role,
            user_id = %user_id,
            "role signoff recorded"
        );
        let after = self.gate.current_stage(store, category_id)?;
        self.notify_if_moved(category_id, before, after);
        Ok(row)
    }

    pub fn record_review_signoff(
        &self,
        store: &mut CertStore,
        category_id: &CategoryId,
        reviewer_id: &UserId,
        reviewer_role: &Role,
        contestant_id: Option<&ContestantId>,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<ReviewSignoff>, CertificationError> {
        Self::require_category(store, category_id)?;
        if let Some(c) = contestant_id {
            if !store.is_contestant_assigned(category_id, c) {
                return Err(CertificationError::validation(format!(
                    "contestant {c} is not assigned to category {category_id}"
                )));
            }
        }

        store.transaction(|tx| -> Result<_, CertificationError> {
            let outcome = tx.insert_review_signoff_if_absent(
                category_id.clone(),
                reviewer_id.clone(),
                reviewer_role.clone(),
                contestant_id.cloned(),
                at,
            )?;
            if outcome.was_inserted() {
                self.gate.refresh_workflow_status(tx, category_id, at)?;
                CertAuditWriter::emit(
                    tx,
                    CertificationAuditInput {
                        at,
                        actor: reviewer_id.to_string(),
                        category_id: Some(category_id.clone()),
                        action: CertificationAuditAction::ReviewSignoff,
                        reason_code: reason_codes::LEDGER_OK_REVIEW_SIGNOFF,
                        detail: format!(
                            "role={reviewer_role} contestant={}",
                            contestant_id.map(|c| c.as_str()).unwrap_or("*")
                        ),
                    },
                );
            }
            Ok(outcome)
        })
    }

    pub fn certification_progress(
        &self,
        store: &CertStore,
        category_id: &CategoryId,
    ) -> Result<CertificationProgress, CertificationError> {
        Self::require_category(store, category_id)?;
        let roles = &self.config.roles;
        Ok(CertificationProgress {
            category_id: category_id.clone(),
            judge_progress: judge_stage_progress(store, category_id),
            tally_progress: role_stage_progress(store, category_id, |r| {
                roles.is_tally_role(r.as_str())
            }),
            audit_progress: role_stage_progress(store, category_id, |r| {
                roles.is_audit_role(r.as_str())
            }),
            board_progress: role_stage_progress(store, category_id, |r| {
                roles.is_board_role(r.as_str())
            }),
        })
    }
}
