#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use certflow_kernel_contracts::certification::{
    CertificationAuditInput, CertificationAuditRow, InsertOutcome, JudgeContestantCertification,
    ReviewSignoff, RoleCertification, WorkflowScope, WorkflowStatusRecord,
    CERTIFICATION_CONTRACT_VERSION,
};
use certflow_kernel_contracts::competition::{
    CategoryRecord, ContestRecord, EventRecord, ScoreInput, ScoreRecord, UserRecord,
};
use certflow_kernel_contracts::ids::{
    CategoryId, ContestId, ContestantId, EventId, JudgeId, UserId,
};
use certflow_kernel_contracts::role::Role;
use certflow_kernel_contracts::{ContractViolation, MonotonicTimeNs, Validate};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("foreign key violation on {table}: {key}")]
    ForeignKeyViolation { table: &'static str, key: String },
    #[error("duplicate key on {table}: {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("append-only table {table} cannot be overwritten")]
    AppendOnlyViolation { table: &'static str },
    #[error("row {key} in {table} is locked")]
    LockedRow { table: &'static str, key: String },
    #[error("store unavailable: {details}")]
    Unavailable { details: String },
    #[error("contract violation: {0}")]
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// Category selection for fan-out deletes and updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(BTreeSet<CategoryId>),
}

impl CategoryFilter {
    pub fn contains(&self, category_id: &CategoryId) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(ids) => ids.contains(category_id),
        }
    }
}

/// Unique-index key for role sign-offs. `signer == None` allows one row per
/// (category, role); `Some(user)` allows one row per signer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoleSignoffKey {
    pub category_id: CategoryId,
    pub role: Role,
    pub signer: Option<UserId>,
}

impl RoleSignoffKey {
    pub fn per_role(category_id: CategoryId, role: Role) -> Self {
        Self {
            category_id,
            role,
            signer: None,
        }
    }

    pub fn per_signer(category_id: CategoryId, role: Role, signer: UserId) -> Self {
        Self {
            category_id,
            role,
            signer: Some(signer),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerDeleteCounts {
    pub role_certifications: u64,
    pub judge_contestant_certifications: u64,
    pub review_signoffs: u64,
}

impl LedgerDeleteCounts {
    pub fn total(&self) -> u64 {
        self.role_certifications
            .saturating_add(self.judge_contestant_certifications)
            .saturating_add(self.review_signoffs)
    }
}

type ReviewSignoffIndexKey = (CategoryId, UserId, Role, Option<ContestantId>);

#[derive(Debug, Clone)]
pub struct CertStore {
    events: BTreeMap<EventId, EventRecord>,
    contests: BTreeMap<ContestId, ContestRecord>,
    categories: BTreeMap<CategoryId, CategoryRecord>,
    users: BTreeMap<UserId, UserRecord>,
    category_judges: BTreeSet<(CategoryId, JudgeId)>,
    category_contestants: BTreeSet<(CategoryId, ContestantId)>,
    scores: BTreeMap<u64, ScoreRecord>,

    // Ledger tables. Each carries a unique index so that the existence check and
    // the insert happen in one call.
    judge_contestant_certifications: BTreeMap<u64, JudgeContestantCertification>,
    // (category_id, judge_id, contestant_id) -> certification_id
    judge_contestant_unique_index: BTreeMap<(CategoryId, JudgeId, ContestantId), u64>,
    role_certifications: BTreeMap<u64, RoleCertification>,
    role_signoff_unique_index: BTreeMap<RoleSignoffKey, u64>,
    review_signoffs: BTreeMap<u64, ReviewSignoff>,
    review_signoff_unique_index: BTreeMap<ReviewSignoffIndexKey, u64>,

    // Projections over the ledger.
    workflow_status: BTreeMap<WorkflowScope, WorkflowStatusRecord>,

    // Append-only.
    audit_rows: Vec<CertificationAuditRow>,

    next_score_id: u64,
    next_certification_id: u64,
    next_review_id: u64,
    next_audit_id: u64,
}

impl Default for CertStore {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl CertStore {
    pub fn new_in_memory() -> Self {
        Self {
            events: BTreeMap::new(),
            contests: BTreeMap::new(),
            categories: BTreeMap::new(),
            users: BTreeMap::new(),
            category_judges: BTreeSet::new(),
            category_contestants: BTreeSet::new(),
            scores: BTreeMap::new(),
            judge_contestant_certifications: BTreeMap::new(),
            judge_contestant_unique_index: BTreeMap::new(),
            role_certifications: BTreeMap::new(),
            role_signoff_unique_index: BTreeMap::new(),
            review_signoffs: BTreeMap::new(),
            review_signoff_unique_index: BTreeMap::new(),
            workflow_status: BTreeMap::new(),
            audit_rows: Vec::new(),
            next_score_id: 1,
            next_certification_id: 1,
            next_review_id: 1,
            next_audit_id: 1,
        }
    }

    /// Runs `f` against the live store and restores the pre-call state if it
    /// returns `Err`. All writes made by `f` become visible together or not at all.
    pub fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut CertStore) -> Result<T, E>,
    {
        let snapshot = self.clone();
        match f(self) {
            Ok(v) => Ok(v),
            Err(e) => {
                debug!("cert store transaction rolled back");
                *self = snapshot;
                Err(e)
            }
        }
    }

    // ------------------------
    // Competition hierarchy.
    // ------------------------

    pub fn insert_event(&mut self, record: EventRecord) -> Result<(), StorageError> {
        record.validate()?;
        if self.events.contains_key(&record.event_id) {
            return Err(StorageError::DuplicateKey {
                table: "events",
                key: record.event_id.to_string(),
            });
        }
        self.events.insert(record.event_id.clone(), record);
        Ok(())
    }

    pub fn insert_contest(&mut self, record: ContestRecord) -> Result<(), StorageError> {
        record.validate()?;
        if !self.events.contains_key(&record.event_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "contests.event_id",
                key: record.event_id.to_string(),
            });
        }
        if self.contests.contains_key(&record.contest_id) {
            return Err(StorageError::DuplicateKey {
                table: "contests",
                key: record.contest_id.to_string(),
            });
        }
        self.contests.insert(record.contest_id.clone(), record);
        Ok(())
    }

    pub fn insert_category(&mut self, record: CategoryRecord) -> Result<(), StorageError> {
        record.validate()?;
        if !self.contests.contains_key(&record.contest_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "categories.contest_id",
                key: record.contest_id.to_string(),
            });
        }
        if self.categories.contains_key(&record.category_id) {
            return Err(StorageError::DuplicateKey {
                table: "categories",
                key: record.category_id.to_string(),
            });
        }
        self.categories.insert(record.category_id.clone(), record);
        Ok(())
    }

    pub fn insert_user(&mut self, record: UserRecord) -> Result<(), StorageError> {
        if self.users.contains_key(&record.user_id) {
            return Err(StorageError::DuplicateKey {
                table: "users",
                key: record.user_id.to_string(),
            });
        }
        self.users.insert(record.user_id.clone(), record);
        Ok(())
    }

    /// Returns `false` when the assignment already existed.
    pub fn assign_judge(
        &mut self,
        category_id: &CategoryId,
        judge_id: JudgeId,
    ) -> Result<bool, StorageError> {
        self.require_category("category_judges.category_id", category_id)?;
        Ok(self
            .category_judges
            .insert((category_id.clone(), judge_id)))
    }

    /// Returns `false` when the assignment already existed.
    pub fn assign_contestant(
        &mut self,
        category_id: &CategoryId,
        contestant_id: ContestantId,
    ) -> Result<bool, StorageError> {
        self.require_category("category_contestants.category_id", category_id)?;
        Ok(self
            .category_contestants
            .insert((category_id.clone(), contestant_id)))
    }

    pub fn insert_score(&mut self, input: ScoreInput) -> Result<u64, StorageError> {
        self.require_category("scores.category_id", &input.category_id)?;
        let score_id = self.next_score_id;
        let row = ScoreRecord::from_input_v1(score_id, input)?;
        self.next_score_id = self.next_score_id.saturating_add(1);
        self.scores.insert(score_id, row);
        Ok(score_id)
    }

    pub fn update_score_value(&mut self, score_id: u64, value: f64) -> Result<(), StorageError> {
        if !value.is_finite() {
            return Err(StorageError::ContractViolation(
                ContractViolation::NotFinite {
                    field: "scores.value",
                },
            ));
        }
        let row = self
            .scores
            .get_mut(&score_id)
            .ok_or(StorageError::ForeignKeyViolation {
                table: "scores.score_id",
                key: score_id.to_string(),
            })?;
        if row.is_locked {
            return Err(StorageError::LockedRow {
                table: "scores",
                key: score_id.to_string(),
            });
        }
        row.value = value;
        Ok(())
    }

    pub fn get_event(&self, event_id: &EventId) -> Option<&EventRecord> {
        self.events.get(event_id)
    }

    pub fn get_contest(&self, contest_id: &ContestId) -> Option<&ContestRecord> {
        self.contests.get(contest_id)
    }

    pub fn get_category(&self, category_id: &CategoryId) -> Option<&CategoryRecord> {
        self.categories.get(category_id)
    }

    pub fn get_user(&self, user_id: &UserId) -> Option<&UserRecord> {
        self.users.get(user_id)
    }

    pub fn get_score(&self, score_id: u64) -> Option<&ScoreRecord> {
        self.scores.get(&score_id)
    }

    pub fn contests_for_event(&self, event_id: &EventId) -> Vec<&ContestRecord> {
        self.contests
            .values()
            .filter(|c| &c.event_id == event_id)
            .collect()
    }

    pub fn categories_for_contest(&self, contest_id: &ContestId) -> Vec<&CategoryRecord> {
        self.categories
            .values()
            .filter(|c| &c.contest_id == contest_id)
            .collect()
    }

    pub fn category_ids(&self) -> BTreeSet<CategoryId> {
        self.categories.keys().cloned().collect()
    }

    pub fn category_judges(&self, category_id: &CategoryId) -> Vec<JudgeId> {
        self.category_judges
            .iter()
            .filter(|(c, _)| c == category_id)
            .map(|(_, j)| j.clone())
            .collect()
    }

    pub fn category_contestants(&self, category_id: &CategoryId) -> Vec<ContestantId> {
        self.category_contestants
            .iter()
            .filter(|(c, _)| c == category_id)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn is_judge_assigned(&self, category_id: &CategoryId, judge_id: &JudgeId) -> bool {
        self.category_judges
            .contains(&(category_id.clone(), judge_id.clone()))
    }

    pub fn is_contestant_assigned(
        &self,
        category_id: &CategoryId,
        contestant_id: &ContestantId,
    ) -> bool {
        self.category_contestants
            .contains(&(category_id.clone(), contestant_id.clone()))
    }

    pub fn scores_for_category(&self, category_id: &CategoryId) -> Vec<&ScoreRecord> {
        self.scores
            .values()
            .filter(|s| &s.category_id == category_id)
            .collect()
    }

    pub fn set_category_totals_certified(
        &mut self,
        category_id: &CategoryId,
        totals_certified: bool,
    ) -> Result<(), StorageError> {
        let row =
            self.categories
                .get_mut(category_id)
                .ok_or(StorageError::ForeignKeyViolation {
                    table: "categories.category_id",
                    key: category_id.to_string(),
                })?;
        row.totals_certified = totals_certified;
        Ok(())
    }

    pub fn reset_category_totals_certified(&mut self, filter: &CategoryFilter) -> u64 {
        let mut n = 0;
        for row in self.categories.values_mut() {
            if filter.contains(&row.category_id) && row.totals_certified {
                row.totals_certified = false;
                n += 1;
            }
        }
        n
    }

    fn require_category(
        &self,
        table: &'static str,
        category_id: &CategoryId,
    ) -> Result<(), StorageError> {
        if !self.categories.contains_key(category_id) {
            return Err(StorageError::ForeignKeyViolation {
                table,
                key: category_id.to_string(),
            });
        }
        Ok(())
    }

    // ------------------------
    // Score certification flags.
    // ------------------------

    /// Certifies one judge's unlocked scores for one contestant. Returns the number of
    /// rows changed.
    pub fn certify_contestant_scores(
        &mut self,
        category_id: &CategoryId,
        judge_id: &JudgeId,
        contestant_id: &ContestantId,
        at: MonotonicTimeNs,
        by: &UserId,
    ) -> u64 {
        let mut n = 0;
        for row in self.scores.values_mut() {
            if &row.category_id != category_id
                || &row.judge_id != judge_id
                || &row.contestant_id != contestant_id
                || row.is_locked
                || row.is_certified
            {
                continue;
            }
            row.is_certified = true;
            row.certified_at = Some(at);
            row.certified_by = Some(by.clone());
            n += 1;
        }
        n
    }

    /// Locks every score in the category, certifying the ones still uncertified.
    /// Returns the number of rows whose certification flag changed.
    pub fn lock_category_scores(
        &mut self,
        category_id: &CategoryId,
        at: MonotonicTimeNs,
        by: &UserId,
    ) -> u64 {
        let mut certified = 0;
        for row in self.scores.values_mut() {
            if &row.category_id != category_id {
                continue;
            }
            if !row.is_certified {
                row.is_certified = true;
                row.certified_at = Some(at);
                row.certified_by = Some(by.clone());
                certified += 1;
            }
            row.is_locked = true;
        }
        certified
    }

    pub fn reset_score_certification(&mut self, filter: &CategoryFilter, unlock: bool) -> u64 {
        let mut n = 0;
        for row in self.scores.values_mut() {
            if !filter.contains(&row.category_id) {
                continue;
            }
            row.is_certified = false;
            row.certified_at = None;
            row.certified_by = None;
            if unlock {
                row.is_locked = false;
            }
            n += 1;
        }
        n
    }

    // ------------------------
    // Certification ledger.
    // ------------------------

    pub fn insert_judge_contestant_certification_if_absent(
        &mut self,
        category_id: CategoryId,
        judge_id: JudgeId,
        contestant_id: ContestantId,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<JudgeContestantCertification>, StorageError> {
        self.require_category("judge_contestant_certifications.category_id", &category_id)?;
        let idx = (category_id.clone(), judge_id.clone(), contestant_id.clone());
        if let Some(existing_id) = self.judge_contestant_unique_index.get(&idx) {
            let existing = self
                .judge_contestant_certifications
                .get(existing_id)
                .cloned()
                .ok_or(StorageError::ForeignKeyViolation {
                    table: "judge_contestant_certifications.certification_id",
                    key: existing_id.to_string(),
                })?;
            return Ok(InsertOutcome::AlreadyPresent(existing));
        }

        let certification_id = self.next_certification_id;
        self.next_certification_id = self.next_certification_id.saturating_add(1);
        let row = JudgeContestantCertification {
            schema_version: CERTIFICATION_CONTRACT_VERSION,
            certification_id,
            judge_id,
            contestant_id,
            category_id,
            certified_at: at,
        };
        self.judge_contestant_unique_index
            .insert(idx, certification_id);
        self.judge_contestant_certifications
            .insert(certification_id, row.clone());
        Ok(InsertOutcome::Inserted(row))
    }

    pub fn judge_contestant_certifications_for_category(
        &self,
        category_id: &CategoryId,
    ) -> Vec<&JudgeContestantCertification> {
        self.judge_contestant_certifications
            .values()
            .filter(|r| &r.category_id == category_id)
            .collect()
    }

    pub fn insert_role_certification_if_absent(
        &mut self,
        key: RoleSignoffKey,
        user_id: UserId,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<RoleCertification>, StorageError> {
        self.require_category("role_certifications.category_id", &key.category_id)?;
        if let Some(signer) = &key.signer {
            if signer != &user_id {
                return Err(StorageError::ContractViolation(
                    ContractViolation::InvalidValue {
                        field: "role_signoff_key.signer",
                        reason: "must match user_id",
                    },
                ));
            }
        }
        if let Some(existing_id) = self.role_signoff_unique_index.get(&key) {
            let existing = self
                .role_certifications
                .get(existing_id)
                .cloned()
                .ok_or(StorageError::ForeignKeyViolation {
                    table: "role_certifications.certification_id",
                    key: existing_id.to_string(),
                })?;
            return Ok(InsertOutcome::AlreadyPresent(existing));
        }

        let certification_id = self.next_certification_id;
        self.next_certification_id = self.next_certification_id.saturating_add(1);
        let row = RoleCertification {
            schema_version: CERTIFICATION_CONTRACT_VERSION,
            certification_id,
            category_id: key.category_id.clone(),
            role: key.role.clone(),
            user_id,
            certified_at: at,
        };
        self.role_signoff_unique_index.insert(key, certification_id);
        self.role_certifications
            .insert(certification_id, row.clone());
        Ok(InsertOutcome::Inserted(row))
    }

    pub fn role_certifications_for_category(
        &self,
        category_id: &CategoryId,
    ) -> Vec<&RoleCertification> {
        self.role_certifications
            .values()
            .filter(|r| &r.category_id == category_id)
            .collect()
    }

    pub fn insert_review_signoff_if_absent(
        &mut self,
        category_id: CategoryId,
        reviewer_id: UserId,
        reviewer_role: Role,
        contestant_id: Option<ContestantId>,
        at: MonotonicTimeNs,
    ) -> Result<InsertOutcome<ReviewSignoff>, StorageError> {
        self.require_category("review_signoffs.category_id", &category_id)?;
        let idx = (
            category_id.clone(),
            reviewer_id.clone(),
            reviewer_role.clone(),
            contestant_id.clone(),
        );
        if let Some(existing_id) = self.review_signoff_unique_index.get(&idx) {
            let existing = self.review_signoffs.get(existing_id).cloned().ok_or(
                StorageError::ForeignKeyViolation {
                    table: "review_signoffs.review_id",
                    key: existing_id.to_string(),
                },
            )?;
            return Ok(InsertOutcome::AlreadyPresent(existing));
        }

        let review_id = self.next_review_id;
        self.next_review_id = self.next_review_id.saturating_add(1);
        let row = ReviewSignoff {
            schema_version: CERTIFICATION_CONTRACT_VERSION,
            review_id,
            category_id,
            reviewer_id,
            reviewer_role,
            contestant_id,
            reviewed_at: at,
        };
        self.review_signoff_unique_index.insert(idx, review_id);
        self.review_signoffs.insert(review_id, row.clone());
        Ok(InsertOutcome::Inserted(row))
    }

    pub fn review_signoffs_for_category(&self, category_id: &CategoryId) -> Vec<&ReviewSignoff> {
        self.review_signoffs
            .values()
            .filter(|r| &r.category_id == category_id)
            .collect()
    }

    /// Deletes every ledger row in the filter, keeping the unique indexes in step.
    pub fn delete_ledger_rows(&mut self, filter: &CategoryFilter) -> LedgerDeleteCounts {
        let mut counts = LedgerDeleteCounts::default();

        let before = self.role_certifications.len();
        self.role_certifications
            .retain(|_, r| !filter.contains(&r.category_id));
        self.role_signoff_unique_index
            .retain(|k, _| !filter.contains(&k.category_id));
        counts.role_certifications = (before - self.role_certifications.len()) as u64;

        let before = self.judge_contestant_certifications.len();
        self.judge_contestant_certifications
            .retain(|_, r| !filter.contains(&r.category_id));
        self.judge_contestant_unique_index
            .retain(|(c, _, _), _| !filter.contains(c));
        counts.judge_contestant_certifications =
            (before - self.judge_contestant_certifications.len()) as u64;

        let before = self.review_signoffs.len();
        self.review_signoffs
            .retain(|_, r| !filter.contains(&r.category_id));
        self.review_signoff_unique_index
            .retain(|(c, _, _, _), _| !filter.contains(c));
        counts.review_signoffs = (before - self.review_signoffs.len()) as u64;

        counts
    }

    // ------------------------
    // Workflow status projection.
    // ------------------------

    pub fn upsert_workflow_status(&mut self, row: WorkflowStatusRecord) {
        self.workflow_status.insert(row.scope.clone(), row);
    }

    pub fn workflow_status(&self, scope: &WorkflowScope) -> Option<&WorkflowStatusRecord> {
        self.workflow_status.get(scope)
    }

    pub fn workflow_status_rows(&self) -> &BTreeMap<WorkflowScope, WorkflowStatusRecord> {
        &self.workflow_status
    }

    pub fn reset_workflow_status_rows<F>(&mut self, in_scope: F, at: MonotonicTimeNs) -> u64
    where
        F: Fn(&WorkflowScope) -> bool,
    {
        let mut n = 0;
        for row in self.workflow_status.values_mut() {
            if in_scope(&row.scope) {
                row.reset_to_pending(at);
                n += 1;
            }
        }
        n
    }

    // ------------------------
    // Certification audit (append-only).
    // ------------------------

    pub fn append_audit_row(&mut self, input: CertificationAuditInput) -> u64 {
        let audit_id = self.next_audit_id;
        self.next_audit_id = self.next_audit_id.saturating_add(1);
        self.audit_rows
            .push(CertificationAuditRow::from_input_v1(audit_id, input));
        audit_id
    }

    pub fn audit_rows(&self) -> &[CertificationAuditRow] {
        &self.audit_rows
    }

    pub fn audit_rows_for_category(&self, category_id: &CategoryId) -> Vec<&CertificationAuditRow> {
        self.audit_rows
            .iter()
            .filter(|r| r.category_id.as_ref() == Some(category_id))
            .collect()
    }

    pub fn attempt_overwrite_audit_row(&mut self, _audit_id: u64) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "certification_audit",
        })
    }
}
