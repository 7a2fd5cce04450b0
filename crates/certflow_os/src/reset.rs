#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use certflow_kernel_contracts::certification::{
    CertificationAuditAction, CertificationAuditInput, WorkflowScope, WorkflowStage,
};
use certflow_kernel_contracts::ids::{CategoryId, ContestId, EventId};
use certflow_kernel_contracts::progress::ResetOutcome;
use certflow_kernel_contracts::MonotonicTimeNs;
use certflow_storage::audit::CertAuditWriter;
use certflow_storage::store::{CategoryFilter, CertStore};
use tracing::{info, warn};

use crate::config::CertflowConfig;
use crate::error::CertificationError;
use crate::notify::{CertificationChanged, CertificationEventSink};
use crate::stage_gate::StageGateEvaluator;

pub mod reason_codes {
    use certflow_kernel_contracts::ReasonCodeId;

    pub const RESET_OK_CATEGORY: ReasonCodeId = ReasonCodeId(0x5200_0001);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetRequest {
    pub category_id: Option<CategoryId>,
    pub contest_id: Option<ContestId>,
    pub event_id: Option<EventId>,
    pub reset_all: bool,
}

impl ResetRequest {
    pub fn category(id: CategoryId) -> Self {
        Self {
            category_id: Some(id),
            ..Self::default()
        }
    }

    pub fn contest(id: ContestId) -> Self {
        Self {
            contest_id: Some(id),
            ..Self::default()
        }
    }

    pub fn event(id: EventId) -> Self {
        Self {
            event_id: Some(id),
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            reset_all: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetScope {
    Category(CategoryId),
    Contest(ContestId),
    Event(EventId),
    All,
}

impl ResetScope {
    /// The narrowest discriminator in the request wins.
    pub fn from_request(request: &ResetRequest) -> Result<Self, CertificationError> {
        if let Some(c) = &request.category_id {
            Ok(Self::Category(c.clone()))
        } else if let Some(c) = &request.contest_id {
            Ok(Self::Contest(c.clone()))
        } else if let Some(e) = &request.event_id {
            Ok(Self::Event(e.clone()))
        } else if request.reset_all {
            Ok(Self::All)
        } else {
            Err(CertificationError::validation(
                "reset needs a category, contest, event or reset_all",
            ))
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Category(c) => format!("category {c}"),
            Self::Contest(c) => format!("contest {c}"),
            Self::Event(e) => format!("event {e}"),
            Self::All => "all categories".to_string(),
        }
    }
}

/// The category set a reset touches, plus the parent status rows it clears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    pub categories: BTreeSet<CategoryId>,
    pub contests: BTreeSet<ContestId>,
    pub events: BTreeSet<EventId>,
    pub global: bool,
}

impl ResolvedScope {
    fn filter(&self) -> CategoryFilter {
        if self.global {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(self.categories.clone())
        }
    }

    fn covers_status_row(&self, scope: &WorkflowScope) -> bool {
        if self.global {
            return true;
        }
        match scope {
            WorkflowScope::Category(c) => self.categories.contains(c),
            WorkflowScope::Contest(c) => self.contests.contains(c),
            WorkflowScope::Event(e) => self.events.contains(e),
        }
    }
}

/// Pure lookup over the current store contents; writes nothing.
pub fn resolve_scope(
    store: &CertStore,
    scope: &ResetScope,
) -> Result<ResolvedScope, CertificationError> {
    let mut resolved = ResolvedScope {
        categories: BTreeSet::new(),
        contests: BTreeSet::new(),
        events: BTreeSet::new(),
        global: false,
    };
    match scope {
        ResetScope::Category(category_id) => {
            if store.get_category(category_id).is_none() {
                return Err(CertificationError::not_found("category", category_id));
            }
            resolved.categories.insert(category_id.clone());
        }
        ResetScope::Contest(contest_id) => {
            if store.get_contest(contest_id).is_none() {
                return Err(CertificationError::not_found("contest", contest_id));
            }
            resolved.contests.insert(contest_id.clone());
            resolved.categories.extend(
                store
                    .categories_for_contest(contest_id)
                    .into_iter()
                    .map(|c| c.category_id.clone()),
            );
        }
        ResetScope::Event(event_id) => {
            if store.get_event(event_id).is_none() {
                return Err(CertificationError::not_found("event", event_id));
            }
            resolved.events.insert(event_id.clone());
            for contest in store.contests_for_event(event_id) {
                resolved.contests.insert(contest.contest_id.clone());
                resolved.categories.extend(
                    store
                        .categories_for_contest(&contest.contest_id)
                        .into_iter()
                        .map(|c| c.category_id.clone()),
                );
            }
        }
        ResetScope::All => {
            resolved.global = true;
            resolved.categories = store.category_ids();
        }
    }
    Ok(resolved)
}

/// Undoes certification for every category in a scope as one unit. Audit rows
/// are kept; each reset appends its own.
pub struct BulkResetCoordinator {
    config: Arc<CertflowConfig>,
    gate: StageGateEvaluator,
    sink: Arc<dyn CertificationEventSink>,
}

impl BulkResetCoordinator {
    pub fn new(config: Arc<CertflowConfig>, sink: Arc<dyn CertificationEventSink>) -> Self {
        let gate = StageGateEvaluator::new(config.roles.clone());
        Self { config, gate, sink }
    }

    pub fn reset(
        &self,
        store: &mut CertStore,
        request: &ResetRequest,
        caller_role: &str,
        at: MonotonicTimeNs,
    ) -> Result<ResetOutcome, CertificationError> {
        if !self.config.roles.may_reset(caller_role) {
            warn!(role = caller_role, "reset refused for role");
            return Err(CertificationError::Forbidden {
                role: caller_role.to_string(),
                action: "reset",
            });
        }
        let scope = ResetScope::from_request(request)?;
        let resolved = resolve_scope(store, &scope)?;
        let unlock = self.config.reset.unlock_scores;

        let reset_count = store.transaction(|tx| -> Result<u64, CertificationError> {
            let filter = resolved.filter();
            let deleted = tx.delete_ledger_rows(&filter);
            let statuses = tx.reset_workflow_status_rows(|s| resolved.covers_status_row(s), at);
            let scores = tx.reset_score_certification(&filter, unlock);
            tx.reset_category_totals_certified(&filter);
            for category_id in &resolved.categories {
                CertAuditWriter::emit(
                    tx,
                    CertificationAuditInput {
                        at,
                        actor: caller_role.to_string(),
                        category_id: Some(category_id.clone()),
                        action: CertificationAuditAction::Reset,
                        reason_code: reason_codes::RESET_OK_CATEGORY,
                        detail: format!("scope={}", scope.label()),
                    },
                );
            }
            // Parent rows are rolled up again from the remaining category facts.
            let parents: BTreeSet<ContestId> = resolved
                .categories
                .iter()
                .filter_map(|c| tx.get_category(c).map(|r| r.contest_id.clone()))
                .collect();
            for contest_id in &parents {
                self.gate.refresh_rollups(tx, contest_id, at)?;
            }
            info!(
                scope = %scope.label(),
                role_certifications = deleted.role_certifications,
                judge_contestant_certifications = deleted.judge_contestant_certifications,
                review_signoffs = deleted.review_signoffs,
                workflow_status_rows = statuses,
                scores,
                "certification reset"
            );
            Ok(deleted.total())
        })?;

        let categories: Vec<CategoryId> = resolved.categories.into_iter().collect();
        for category_id in &categories {
            self.sink.emit(&CertificationChanged {
                category_id: category_id.clone(),
                new_stage: WorkflowStage::Judge,
            });
        }
        Ok(ResetOutcome {
            reset_count,
            message: format!(
                "reset {reset_count} certification record(s) across {} categor{} in {}",
                categories.len(),
                if categories.len() == 1 { "y" } else { "ies" },
                scope.label()
            ),
            categories,
        })
    }
}
