#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use certflow_kernel_contracts::certification::{
    CertificationAuditInput, CertificationAuditRow, InsertOutcome, JudgeContestantCertification,
    ReviewSignoff, RoleCertification, WorkflowScope, WorkflowStatusRecord,
};
use certflow_kernel_contracts::competition::{
    CategoryRecord, ContestRecord, EventRecord, ScoreInput, ScoreRecord, UserRecord,
};
use certflow_kernel_contracts::ids::{
    CategoryId, ContestId, ContestantId, EventId, JudgeId, UserId,
};
use certflow_kernel_contracts::role::Role;
use certflow_kernel_contracts::MonotonicTimeNs;

use crate::store::{CategoryFilter, CertStore, LedgerDeleteCounts, RoleSignoffKey, StorageError};

/// Typed repository interface for the event → contest → category hierarchy and its scores.
pub trait CompetitionRepo {
    fn insert_event_row(&mut self, record: EventRecord) -> Result<(), StorageError>;
    fn insert_contest_row(&mut self, record: ContestRecord) -> Result<(), StorageError>;
    fn insert_category_row(&mut self, record: CategoryRecord) -> Result<(), StorageError>;
    fn insert_user_row(&mut self, record: UserRecord) -> Result<(), StorageError>;
    fn assign_judge_row(
        &mut self,
        category_id: &CategoryId,
        judge_id: JudgeId,
    ) -> Result<bool, StorageError>;
    fn assign_contestant_row(
        &mut self,
        category_id: &CategoryId,
        contestant_id: ContestantId,
    ) -> Result<bool, StorageError>;
    fn insert_score_row(&mut self, input: ScoreInput) -> Result<u64, StorageError>;
    fn update_score_value_row(&mut self, score_id: u64, value: f64) -> Result<(), StorageError>;

    fn event_row(&self, event_id: &EventId) -> Option<&EventRecord>;
    fn contest_row(&self, contest_id: &ContestId) -> Option<&ContestRecord>;
    fn category_row(&self, category_id: &CategoryId) -> Option<&CategoryRecord>;
    fn score_row(&self, score_id: u64) -> Option<&ScoreRecord>;
    fn score_rows_for_category(&self, category_id: &CategoryId) -> Vec<&ScoreRecord>;
}

/// Typed repository interface for the sign-off ledger. Every insert is insert-if-absent
/// against a unique index.
pub trait CertificationLedgerRepo {
    fn insert_judge_contestant_certification_row(
        &mut self,
        category_id: CategoryId,
        judge_id: JudgeId,
        contestant_id: ContestantId,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<JudgeContestantCertification>, StorageError>;
    fn insert_role_certification_row(
        &mut self,
        key: RoleSignoffKey,
        user_id: UserId,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<RoleCertification>, StorageError>;
    fn insert_review_signoff_row(
        &mut self,
        category_id: CategoryId,
        reviewer_id: UserId,
        reviewer_role: Role,
        contestant_id: Option<ContestantId>,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<ReviewSignoff>, StorageError>;
    fn delete_ledger_rows_for(&mut self, filter: &CategoryFilter) -> LedgerDeleteCounts;

    fn judge_contestant_certification_rows(
        &self,
        category_id: &CategoryId,
    ) -> Vec<&JudgeContestantCertification>;
    fn role_certification_rows(&self, category_id: &CategoryId) -> Vec<&RoleCertification>;
    fn review_signoff_rows(&self, category_id: &CategoryId) -> Vec<&ReviewSignoff>;
}

/// Typed repository interface for the workflow status projection.
pub trait WorkflowStatusRepo {
    fn upsert_workflow_status_row(&mut self, row: WorkflowStatusRecord);
    fn workflow_status_row(&self, scope: &WorkflowScope) -> Option<&WorkflowStatusRecord>;
    fn workflow_status_rows_all(&self) -> &BTreeMap<WorkflowScope, WorkflowStatusRecord>;
}

/// Typed repository interface for the append-only certification audit trail.
pub trait CertificationAuditRepo {
    fn append_audit_row_input(&mut self, input: CertificationAuditInput) -> u64;
    fn audit_rows_all(&self) -> &[CertificationAuditRow];
    fn audit_rows_by_category(&self, category_id: &CategoryId) -> Vec<&CertificationAuditRow>;
    fn attempt_overwrite_audit_row_by_id(&mut self, audit_id: u64) -> Result<(), StorageError>;
}

impl CompetitionRepo for CertStore {
    fn insert_event_row(&mut self, record: EventRecord) -> Result<(), StorageError> {
        self.insert_event(record)
    }

    fn insert_contest_row(&mut self, record: ContestRecord) -> Result<(), StorageError> {
        self.insert_contest(record)
    }

    fn insert_category_row(&mut self, record: CategoryRecord) -> Result<(), StorageError> {
        self.insert_category(record)
    }

    fn insert_user_row(&mut self, record: UserRecord) -> Result<(), StorageError> {
        self.insert_user(record)
    }

    fn assign_judge_row(
        &mut self,
        category_id: &CategoryId,
        judge_id: JudgeId,
    ) -> Result<bool, StorageError> {
        self.assign_judge(category_id, judge_id)
    }

    fn assign_contestant_row(
        &mut self,
        category_id: &CategoryId,
        contestant_id: ContestantId,
    ) -> Result<bool, StorageError> {
        self.assign_contestant(category_id, contestant_id)
    }

    fn insert_score_row(&mut self, input: ScoreInput) -> Result<u64, StorageError> {
        self.insert_score(input)
    }

    fn update_score_value_row(&mut self, score_id: u64, value: f64) -> Result<(), StorageError> {
        self.update_score_value(score_id, value)
    }

    fn event_row(&self, event_id: &EventId) -> Option<&EventRecord> {
        self.get_event(event_id)
    }

    fn contest_row(&self, contest_id: &ContestId) -> Option<&ContestRecord> {
        self.get_contest(contest_id)
    }

    fn category_row(&self, category_id: &CategoryId) -> Option<&CategoryRecord> {
        self.get_category(category_id)
    }

    fn score_row(&self, score_id: u64) -> Option<&ScoreRecord> {
        self.get_score(score_id)
    }

    fn score_rows_for_category(&self, category_id: &CategoryId) -> Vec<&ScoreRecord> {
        self.scores_for_category(category_id)
    }
}

impl CertificationLedgerRepo for CertStore {
    fn insert_judge_contestant_certification_row(
        &mut self,
        category_id: CategoryId,
        judge_id: JudgeId,
        contestant_id: ContestantId,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<JudgeContestantCertification>, StorageError> {
        self.insert_judge_contestant_certification_if_absent(
            category_id,
            judge_id,
            contestant_id,
            at,
        )
    }

    fn insert_role_certification_row(
        &mut self,
        key: RoleSignoffKey,
        user_id: UserId,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<RoleCertification>, StorageError> {
        self.insert_role_certification_if_absent(key, user_id, at)
    }

    fn insert_review_signoff_row(
        &mut self,
        category_id: CategoryId,
        reviewer_id: UserId,
        reviewer_role: Role,
        contestant_id: Option<ContestantId>,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<ReviewSignoff>, StorageError> {
        self.insert_review_signoff_if_absent(
            category_id,
            reviewer_id,
            reviewer_role,
            contestant_id,
            at,
        )
    }

    fn delete_ledger_rows_for(&mut self, filter: &CategoryFilter) -> LedgerDeleteCounts {
        self.delete_ledger_rows(filter)
    }

    fn judge_contestant_certification_rows(
        &self,
        category_id: &CategoryId,
    ) -> Vec<&JudgeContestantCertification> {
        self.judge_contestant_certifications_for_category(category_id)
    }

    fn role_certification_rows(&self, category_id: &CategoryId) -> Vec<&RoleCertification> {
        self.role_certifications_for_category(category_id)
    }

    fn review_signoff_rows(&self, category_id: &CategoryId) -> Vec<&ReviewSignoff> {
        self.review_signoffs_for_category(category_id)
    }
}

impl WorkflowStatusRepo for CertStore {
    fn upsert_workflow_status_row(&mut self, row: WorkflowStatusRecord) {
        self.upsert_workflow_status(row)
    }

    fn workflow_status_row(&self, scope: &WorkflowScope) -> Option<&WorkflowStatusRecord> {
        self.workflow_status(scope)
    }

    fn workflow_status_rows_all(&self) -> &BTreeMap<WorkflowScope, WorkflowStatusRecord> {
        self.workflow_status_rows()
    }
}

impl CertificationAuditRepo for CertStore {
    fn append_audit_row_input(&mut self, input: CertificationAuditInput) -> u64 {
        self.append_audit_row(input)
    }

    fn audit_rows_all(&self) -> &[CertificationAuditRow] {
        self.audit_rows()
    }

    fn audit_rows_by_category(&self, category_id: &CategoryId) -> Vec<&CertificationAuditRow> {
        self.audit_rows_for_category(category_id)
    }

    fn attempt_overwrite_audit_row_by_id(&mut self, audit_id: u64) -> Result<(), StorageError> {
        self.attempt_overwrite_audit_row(audit_id)
    }
}
