#![forbid(unsafe_code)]

use serde::Serialize;

use crate::ids::{CategoryId, ContestId, ContestantId, EventId, JudgeId, UserId};
use crate::role::Role;
use crate::{MonotonicTimeNs, ReasonCodeId, SchemaVersion};

pub const CERTIFICATION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Judge-stage sign-off for one contestant in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeContestantCertification {
    pub schema_version: SchemaVersion,
    pub certification_id: u64,
    pub judge_id: JudgeId,
    pub contestant_id: ContestantId,
    pub category_id: CategoryId,
    pub certified_at: MonotonicTimeNs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCertification {
    pub schema_version: SchemaVersion,
    pub certification_id: u64,
    pub category_id: CategoryId,
    pub role: Role,
    pub user_id: UserId,
    pub certified_at: MonotonicTimeNs,
}

/// Reviewer acknowledgment of a whole category (`contestant_id == None`) or one contestant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSignoff {
    pub schema_version: SchemaVersion,
    pub review_id: u64,
    pub category_id: CategoryId,
    pub reviewer_id: UserId,
    pub reviewer_role: Role,
    pub contestant_id: Option<ContestantId>,
    pub reviewed_at: MonotonicTimeNs,
}

/// Result of an insert-if-absent write against a unique index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    Inserted(T),
    AlreadyPresent(T),
}

impl<T> InsertOutcome<T> {
    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }

    pub fn row(&self) -> &T {
        match self {
            InsertOutcome::Inserted(r) | InsertOutcome::AlreadyPresent(r) => r,
        }
    }

    pub fn into_row(self) -> T {
        match self {
            InsertOutcome::Inserted(r) | InsertOutcome::AlreadyPresent(r) => r,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    Judge,
    Tally,
    Audit,
    Board,
    Locked,
}

impl WorkflowStage {
    pub fn step(self) -> u8 {
        match self {
            WorkflowStage::Judge => 1,
            WorkflowStage::Tally => 2,
            WorkflowStage::Audit => 3,
            WorkflowStage::Board => 4,
            WorkflowStage::Locked => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::Judge => "JUDGE",
            WorkflowStage::Tally => "TALLY",
            WorkflowStage::Audit => "AUDIT",
            WorkflowStage::Board => "BOARD",
            WorkflowStage::Locked => "LOCKED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Pending,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum WorkflowScope {
    Category(CategoryId),
    Contest(ContestId),
    Event(EventId),
}

/// Cached projection of ledger facts for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStatusRecord {
    pub schema_version: SchemaVersion,
    pub scope: WorkflowScope,
    pub status: WorkflowState,
    pub current_step: u8,
    pub judge_certified: bool,
    pub tally_certified: bool,
    pub audit_certified: bool,
    pub board_approved: bool,
    pub certified_at: Option<MonotonicTimeNs>,
    pub certified_by: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub comments: Option<String>,
    pub updated_at: MonotonicTimeNs,
}

impl WorkflowStatusRecord {
    pub fn pending(scope: WorkflowScope, updated_at: MonotonicTimeNs) -> Self {
        Self {
            schema_version: CERTIFICATION_CONTRACT_VERSION,
            scope,
            status: WorkflowState::Pending,
            current_step: WorkflowStage::Judge.step(),
            judge_certified: false,
            tally_certified: false,
            audit_certified: false,
            board_approved: false,
            certified_at: None,
            certified_by: None,
            rejection_reason: None,
            comments: None,
            updated_at,
        }
    }

    pub fn reset_to_pending(&mut self, updated_at: MonotonicTimeNs) {
        let scope = self.scope.clone();
        *self = Self::pending(scope, updated_at);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificationAuditAction {
    JudgeContestantSignoff,
    RoleSignoff,
    ReviewSignoff,
    FinalCertification,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificationAuditInput {
    pub at: MonotonicTimeNs,
    pub actor: String,
    pub category_id: Option<CategoryId>,
    pub action: CertificationAuditAction,
    pub reason_code: ReasonCodeId,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificationAuditRow {
    pub schema_version: SchemaVersion,
    pub audit_id: u64,
    pub at: MonotonicTimeNs,
    pub actor: String,
    pub category_id: Option<CategoryId>,
    pub action: CertificationAuditAction,
    pub reason_code: ReasonCodeId,
    pub detail: String,
}

impl CertificationAuditRow {
    pub fn from_input_v1(audit_id: u64, input: CertificationAuditInput) -> Self {
        Self {
            schema_version: CERTIFICATION_CONTRACT_VERSION,
            audit_id,
            at: input.at,
            actor: input.actor,
            category_id: input.category_id,
            action: input.action,
            reason_code: input.reason_code,
            detail: input.detail,
        }
    }
}
