#![forbid(unsafe_code)]

use certflow_kernel_contracts::certification::{
    RoleCertification, WorkflowScope, WorkflowStage, WorkflowState, WorkflowStatusRecord,
    CERTIFICATION_CONTRACT_VERSION,
};
use certflow_kernel_contracts::ids::{CategoryId, ContestId};
use certflow_kernel_contracts::progress::{
    FinalCertificationStatus, ScoreCertificationStatus, StageReadiness, TallyCertificationCounts,
};
use certflow_kernel_contracts::MonotonicTimeNs;
use certflow_storage::store::{CertStore, StorageError};
use tracing::debug;

use crate::config::RoleConfig;
use crate::error::CertificationError;
use crate::ledger::judge_stage_progress;

/// Ledger facts for one category, read in one pass.
#[derive(Debug, Clone)]
struct StageFacts {
    judge_complete: bool,
    scoring_complete: bool,
    tally: TallyCertificationCounts,
    scores: ScoreCertificationStatus,
    audit: Option<RoleCertification>,
    board_complete: bool,
    has_ledger_rows: bool,
}

impl StageFacts {
    fn can_certify(&self) -> bool {
        self.tally.completed >= self.tally.required
    }

    fn stage(&self) -> WorkflowStage {
        if !self.judge_complete {
            WorkflowStage::Judge
        } else if !self.can_certify() {
            WorkflowStage::Tally
        } else if self.audit.is_none() {
            WorkflowStage::Audit
        } else if !self.board_complete {
            WorkflowStage::Board
        } else {
            WorkflowStage::Locked
        }
    }

    fn ready_for_final_certification(&self) -> bool {
        self.can_certify() && self.scores.uncertified == 0 && self.audit.is_none()
    }
}

/// Derives the workflow stage of a category from ledger rows and keeps the
/// `WorkflowStatus` / `totals_certified` projections in step with them.
#[derive(Debug, Clone)]
pub struct StageGateEvaluator {
    roles: RoleConfig,
}

impl StageGateEvaluator {
    pub fn new(roles: RoleConfig) -> Self {
        Self { roles }
    }

    fn facts(&self, store: &CertStore, category_id: &CategoryId) -> StageFacts {
        let judge = judge_stage_progress(store, category_id);
        let role_rows = store.role_certifications_for_category(category_id);

        let required = store.category_judges(category_id).len() as u32;
        let completed = role_rows
            .iter()
            .filter(|r| self.roles.is_tally_role(r.role.as_str()))
            .count() as u32;

        let mut total = 0u32;
        let mut uncertified = 0u32;
        for s in store.scores_for_category(category_id) {
            if !s.counts_for_certification() {
                continue;
            }
            total += 1;
            if !s.is_certified {
                uncertified += 1;
            }
        }

        let judges = store.category_judges(category_id);
        let contestants = store.category_contestants(category_id);
        let scored = store.scores_for_category(category_id);
        let scoring_complete = judges.iter().all(|j| {
            contestants.iter().all(|c| {
                scored.iter().any(|s| {
                    &s.judge_id == j && &s.contestant_id == c && s.counts_for_certification()
                })
            })
        });

        StageFacts {
            judge_complete: judge.is_category_certified,
            scoring_complete,
            tally: TallyCertificationCounts {
                required,
                completed,
                missing: required.saturating_sub(completed),
            },
            scores: ScoreCertificationStatus {
                total,
                uncertified,
                completed: total - uncertified,
            },
            audit: role_rows
                .iter()
                .find(|r| self.roles.is_audit_role(r.role.as_str()))
                .map(|r| (*r).clone()),
            board_complete: role_rows
                .iter()
                .any(|r| self.roles.is_board_role(r.role.as_str())),
            has_ledger_rows: judge.contestants_certified > 0
                || !role_rows.is_empty()
                || !store.review_signoffs_for_category(category_id).is_empty(),
        }
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

    pub fn current_stage(
        &self,
        store: &CertStore,
        category_id: &CategoryId,
    ) -> Result<WorkflowStage, CertificationError> {
        Self::require_category(store, category_id)?;
        Ok(self.facts(store, category_id).stage())
    }

    /// `ready_for_next_stage` reports whether the action that closes the current
    /// stage may be taken now: complete scoring for JUDGE, ready-for-final for
    /// AUDIT. TALLY and BOARD are ready as soon as they are reached.
    pub fn stage_readiness(
        &self,
        store: &CertStore,
        category_id: &CategoryId,
    ) -> Result<StageReadiness, CertificationError> {
        Self::require_category(store, category_id)?;
        let f = self.facts(store, category_id);
        let stage = f.stage();
        let ready_for_next_stage = match stage {
            WorkflowStage::Judge => f.scoring_complete,
            WorkflowStage::Tally => true,
            WorkflowStage::Audit => f.ready_for_final_certification(),
            WorkflowStage::Board => true,
            WorkflowStage::Locked => false,
        };
        Ok(StageReadiness {
            category_id: category_id.clone(),
            stage,
            judge_complete: f.judge_complete,
            tally_complete: f.can_certify(),
            audit_complete: f.audit.is_some(),
            board_complete: f.board_complete,
            ready_for_next_stage,
        })
    }

    pub fn final_certification_status(
        &self,
        store: &CertStore,
        category_id: &CategoryId,
    ) -> Result<FinalCertificationStatus, CertificationError> {
        Self::require_category(store, category_id)?;
        let f = self.facts(store, category_id);
        Ok(FinalCertificationStatus {
            category_id: category_id.clone(),
            can_certify: f.can_certify(),
            ready_for_final_certification: f.ready_for_final_certification(),
            already_certified: f.audit.is_some(),
            tally_certifications: f.tally,
            score_status: f.scores,
            audit_certified: f.audit.is_some(),
            audit_certification: f.audit,
        })
    }

    fn category_projection(
        &self,
        store: &CertStore,
        category_id: &CategoryId,
        at: MonotonicTimeNs,
    ) -> WorkflowStatusRecord {
        let f = self.facts(store, category_id);
        let stage = f.stage();
        let scope = WorkflowScope::Category(category_id.clone());
        let (rejection_reason, comments) = store
            .workflow_status(&scope)
            .map(|r| (r.rejection_reason.clone(), r.comments.clone()))
            .unwrap_or((None, None));
        WorkflowStatusRecord {
            schema_version: CERTIFICATION_CONTRACT_VERSION,
            scope,
            status: if stage == WorkflowStage::Locked {
                WorkflowState::Complete
            } else if f.has_ledger_rows {
                WorkflowState::InProgress
            } else {
                WorkflowState::Pending
            },
            current_step: stage.step(),
            judge_certified: f.judge_complete,
            tally_certified: f.can_certify(),
            audit_certified: f.audit.is_some(),
            board_approved: f.board_complete,
            certified_at: f.audit.as_ref().map(|a| a.certified_at),
            certified_by: f.audit.as_ref().map(|a| a.user_id.clone()),
            rejection_reason,
            comments,
            updated_at: at,
        }
    }

    /// Recomputes the category projection, `totals_certified`, and the contest and
    /// event roll-ups above it. Call inside the transaction of the ledger write.
    pub fn refresh_workflow_status(
        &self,
        store: &mut CertStore,
        category_id: &CategoryId,
        at: MonotonicTimeNs,
    ) -> Result<WorkflowStatusRecord, CertificationError> {
        let contest_id = store
            .get_category(category_id)
            .map(|c| c.contest_id.clone())
            .ok_or_else(|| CertificationError::not_found("category", category_id))?;

        let row = self.category_projection(store, category_id, at);
        store.set_category_totals_certified(category_id, row.tally_certified)?;
        store.upsert_workflow_status(row.clone());
        self.refresh_rollups(store, &contest_id, at)?;
        debug!(
            category_id = %category_id,
            current_step = row.current_step,
            status = ?row.status,
            "workflow status refreshed"
        );
        Ok(row)
    }

    /// Recomputes the contest row and the event row above `contest_id` from the
    /// current category facts.
    pub(crate) fn refresh_rollups(
        &self,
        store: &mut CertStore,
        contest_id: &ContestId,
        at: MonotonicTimeNs,
    ) -> Result<(), StorageError> {
        let Some(event_id) = store.get_contest(contest_id).map(|c| c.event_id.clone()) else {
            return Err(StorageError::ForeignKeyViolation {
                table: "categories.contest_id",
                key: contest_id.to_string(),
            });
        };

        let contest_rows: Vec<WorkflowStatusRecord> = store
            .categories_for_contest(contest_id)
            .into_iter()
            .map(|c| self.category_projection(store, &c.category_id, at))
            .collect();
        let contest_row = rollup(
            store,
            WorkflowScope::Contest(contest_id.clone()),
            &contest_rows,
            at,
        );

        let event_category_ids: Vec<CategoryId> = store
            .contests_for_event(&event_id)
            .into_iter()
            .flat_map(|c| store.categories_for_contest(&c.contest_id))
            .map(|c| c.category_id.clone())
            .collect();
        let event_rows: Vec<WorkflowStatusRecord> = event_category_ids
            .iter()
            .map(|c| self.category_projection(store, c, at))
            .collect();
        let event_row = rollup(store, WorkflowScope::Event(event_id), &event_rows, at);

        if let Some(r) = contest_row {
            store.upsert_workflow_status(r);
        }
        if let Some(r) = event_row {
            store.upsert_workflow_status(r);
        }
        Ok(())
    }
}

/// A parent scope sits at the least advanced step of its categories and carries
/// a stage flag only when every category does.
fn rollup(
    store: &CertStore,
    scope: WorkflowScope,
    children: &[WorkflowStatusRecord],
    at: MonotonicTimeNs,
) -> Option<WorkflowStatusRecord> {
    if children.is_empty() {
        return None;
    }
    let all = |f: fn(&WorkflowStatusRecord) -> bool| children.iter().all(f);
    let status = if all(|c| c.status == WorkflowState::Complete) {
        WorkflowState::Complete
    } else if all(|c| c.status == WorkflowState::Pending) {
        WorkflowState::Pending
    } else {
        WorkflowState::InProgress
    };
    let (rejection_reason, comments) = store
        .workflow_status(&scope)
        .map(|r| (r.rejection_reason.clone(), r.comments.clone()))
        .unwrap_or((None, None));
    Some(WorkflowStatusRecord {
        schema_version: CERTIFICATION_CONTRACT_VERSION,
        scope,
        status,
        current_step: children.iter().map(|c| c.current_step).min().unwrap_or(1),
        judge_certified: all(|c| c.judge_certified),
        tally_certified: all(|c| c.tally_certified),
        audit_certified: all(|c| c.audit_certified),
        board_approved: all(|c| c.board_approved),
        certified_at: None,
        certified_by: None,
        rejection_reason,
        comments,
        updated_at: at,
    })
}
