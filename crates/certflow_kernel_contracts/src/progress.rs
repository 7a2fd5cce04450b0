#![forbid(unsafe_code)]

use serde::Serialize;

use crate::certification::{RoleCertification, WorkflowStage};
use crate::ids::{CategoryId, ContestId, EventId, JudgeId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeScoringProgress {
    pub judge_id: JudgeId,
    pub completed: u32,
    pub total_contestants: u32,
    pub completion_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryScoringProgress {
    pub category_id: CategoryId,
    pub category_name: String,
    pub total_contestants: u32,
    pub total_judges: u32,
    pub total_scores: u32,
    pub expected_scores: u32,
    pub completion_percentage: u32,
    pub judges: Vec<JudgeScoringProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContestScoringProgress {
    pub contest_id: ContestId,
    pub contest_name: String,
    pub categories: Vec<CategoryScoringProgress>,
    pub overall_completion: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventScoringProgress {
    pub event_id: EventId,
    pub event_name: String,
    pub contests: Vec<ContestScoringProgress>,
    pub overall_completion: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeStageProgress {
    pub contestants_certified: u32,
    pub total_contestants: u32,
    pub total_judges: u32,
    pub expected_signoffs: u32,
    /// Exact-count comparison against `expected_signoffs`.
    pub is_category_certified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleStageProgress {
    pub completed: u32,
    pub signers: Vec<UserId>,
    pub is_certified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificationProgress {
    pub category_id: CategoryId,
    pub judge_progress: JudgeStageProgress,
    pub tally_progress: RoleStageProgress,
    pub audit_progress: RoleStageProgress,
    pub board_progress: RoleStageProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TallyCertificationCounts {
    pub required: u32,
    pub completed: u32,
    pub missing: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreCertificationStatus {
    pub total: u32,
    pub uncertified: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalCertificationStatus {
    pub category_id: CategoryId,
    pub can_certify: bool,
    pub ready_for_final_certification: bool,
    pub already_certified: bool,
    pub tally_certifications: TallyCertificationCounts,
    pub score_status: ScoreCertificationStatus,
    pub audit_certified: bool,
    pub audit_certification: Option<RoleCertification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReadiness {
    pub category_id: CategoryId,
    pub stage: WorkflowStage,
    pub judge_complete: bool,
    pub tally_complete: bool,
    pub audit_complete: bool,
    pub board_complete: bool,
    pub ready_for_next_stage: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetOutcome {
    pub reset_count: u64,
    pub categories: Vec<CategoryId>,
    pub message: String,
}
