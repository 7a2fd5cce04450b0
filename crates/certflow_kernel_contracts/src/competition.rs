#![forbid(unsafe_code)]

use serde::Serialize;

use crate::common::validate_text;
use crate::ids::{CategoryId, ContestId, ContestantId, CriterionId, EventId, JudgeId, UserId};
use crate::role::Role;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const COMPETITION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub schema_version: SchemaVersion,
    pub event_id: EventId,
    pub name: String,
}

impl EventRecord {
    pub fn v1(event_id: EventId, name: impl Into<String>) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: COMPETITION_CONTRACT_VERSION,
            event_id,
            name: name.into(),
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for EventRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.event_id.validate()?;
        validate_text("event_record.name", &self.name, 256)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContestRecord {
    pub schema_version: SchemaVersion,
    pub contest_id: ContestId,
    pub event_id: EventId,
    pub name: String,
}

impl ContestRecord {
    pub fn v1(
        contest_id: ContestId,
        event_id: EventId,
        name: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: COMPETITION_CONTRACT_VERSION,
            contest_id,
            event_id,
            name: name.into(),
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for ContestRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.contest_id.validate()?;
        self.event_id.validate()?;
        validate_text("contest_record.name", &self.name, 256)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub schema_version: SchemaVersion,
    pub category_id: CategoryId,
    pub contest_id: ContestId,
    pub name: String,
    /// Cached "tally stage complete". Refreshed from ledger rows, never authority.
    pub totals_certified: bool,
}

impl CategoryRecord {
    pub fn v1(
        category_id: CategoryId,
        contest_id: ContestId,
        name: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: COMPETITION_CONTRACT_VERSION,
            category_id,
            contest_id,
            name: name.into(),
            totals_certified: false,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for CategoryRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.category_id.validate()?;
        self.contest_id.validate()?;
        validate_text("category_record.name", &self.name, 256)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub schema_version: SchemaVersion,
    pub user_id: UserId,
    /// Persisted role; final certification trusts this, not the session claim.
    pub role: Role,
}

impl UserRecord {
    pub fn v1(user_id: UserId, role: Role) -> Self {
        Self {
            schema_version: COMPETITION_CONTRACT_VERSION,
            user_id,
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreInput {
    pub category_id: CategoryId,
    pub judge_id: JudgeId,
    pub contestant_id: ContestantId,
    pub criterion_id: Option<CriterionId>,
    pub value: f64,
}

impl Validate for ScoreInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !self.value.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "score_input.value",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub schema_version: SchemaVersion,
    pub score_id: u64,
    pub category_id: CategoryId,
    pub judge_id: JudgeId,
    pub contestant_id: ContestantId,
    /// `None` marks a non-scoring artifact, excluded from completeness checks.
    pub criterion_id: Option<CriterionId>,
    pub value: f64,
    pub is_certified: bool,
    pub is_locked: bool,
    pub certified_at: Option<MonotonicTimeNs>,
    pub certified_by: Option<UserId>,
}

impl ScoreRecord {
    pub fn from_input_v1(score_id: u64, input: ScoreInput) -> Result<Self, ContractViolation> {
        input.validate()?;
        Ok(Self {
            schema_version: COMPETITION_CONTRACT_VERSION,
            score_id,
            category_id: input.category_id,
            judge_id: input.judge_id,
            contestant_id: input.contestant_id,
            criterion_id: input.criterion_id,
            value: input.value,
            is_certified: false,
            is_locked: false,
            certified_at: None,
            certified_by: None,
        })
    }

    pub fn counts_for_certification(&self) -> bool {
        self.criterion_id.is_some()
    }
}
