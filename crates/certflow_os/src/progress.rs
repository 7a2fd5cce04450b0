#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use certflow_kernel_contracts::competition::CategoryRecord;
use certflow_kernel_contracts::ids::{CategoryId, ContestId, ContestantId, EventId, JudgeId};
use certflow_kernel_contracts::progress::{
    CategoryScoringProgress, ContestScoringProgress, EventScoringProgress, JudgeScoringProgress,
};
use certflow_storage::store::CertStore;

use crate::error::CertificationError;

/// `round(100 * numer / denom)` with halves rounded up; 0 when `denom == 0`.
pub fn percent_half_up(numer: u64, denom: u64) -> u32 {
    if denom == 0 {
        return 0;
    }
    let v = (numer.saturating_mul(200).saturating_add(denom)) / denom.saturating_mul(2);
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Unweighted mean of whole percentages, halves rounded up; 0 for an empty slice.
pub fn mean_half_up(values: &[u32]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let n = values.len() as u64;
    let sum: u64 = values.iter().map(|v| u64::from(*v)).sum();
    u32::try_from((sum * 2 + n) / (n * 2)).unwrap_or(u32::MAX)
}

/// Read-only scoring completion at category, contest and event scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressAggregator;

impl ProgressAggregator {
    pub fn category_scoring_progress(
        &self,
        store: &CertStore,
        category_id: &CategoryId,
    ) -> Result<CategoryScoringProgress, CertificationError> {
        let category = store
            .get_category(category_id)
            .ok_or_else(|| CertificationError::not_found("category", category_id))?;
        Ok(build_category_progress(store, category))
    }

    pub fn contest_scoring_progress(
        &self,
        store: &CertStore,
        contest_id: &ContestId,
    ) -> Result<ContestScoringProgress, CertificationError> {
        let contest = store
            .get_contest(contest_id)
            .ok_or_else(|| CertificationError::not_found("contest", contest_id))?;
        let categories: Vec<CategoryScoringProgress> = store
            .categories_for_contest(contest_id)
            .into_iter()
            .map(|c| build_category_progress(store, c))
            .collect();
        let percentages: Vec<u32> = categories.iter().map(|c| c.completion_percentage).collect();
        Ok(ContestScoringProgress {
            contest_id: contest.contest_id.clone(),
            contest_name: contest.name.clone(),
            overall_completion: mean_half_up(&percentages),
            categories,
        })
    }

    pub fn event_scoring_progress(
        &self,
        store: &CertStore,
        event_id: &EventId,
    ) -> Result<EventScoringProgress, CertificationError> {
        let event = store
            .get_event(event_id)
            .ok_or_else(|| CertificationError::not_found("event", event_id))?;
        let contest_ids: Vec<ContestId> = store
            .contests_for_event(event_id)
            .into_iter()
            .map(|c| c.contest_id.clone())
            .collect();
        let mut contests = Vec::with_capacity(contest_ids.len());
        for contest_id in &contest_ids {
            contests.push(self.contest_scoring_progress(store, contest_id)?);
        }
        let percentages: Vec<u32> = contests.iter().map(|c| c.overall_completion).collect();
        Ok(EventScoringProgress {
            event_id: event.event_id.clone(),
            event_name: event.name.clone(),
            overall_completion: mean_half_up(&percentages),
            contests,
        })
    }
}

fn build_category_progress(
    store: &CertStore,
    category: &CategoryRecord,
) -> CategoryScoringProgress {
    let category_id = &category.category_id;
    let judges = store.category_judges(category_id);
    let contestants = store.category_contestants(category_id);
    let total_judges = judges.len() as u32;
    let total_contestants = contestants.len() as u32;

    // Several criterion rows for one (judge, contestant) pair count once.
    let scored: BTreeSet<(&JudgeId, &ContestantId)> = store
        .scores_for_category(category_id)
        .into_iter()
        .filter(|s| {
            store.is_judge_assigned(category_id, &s.judge_id)
                && store.is_contestant_assigned(category_id, &s.contestant_id)
        })
        .map(|s| (&s.judge_id, &s.contestant_id))
        .collect();

    let total_scores = scored.len() as u32;
    let expected_scores = total_contestants.saturating_mul(total_judges);

    let judge_rows = judges
        .iter()
        .map(|judge_id| {
            let completed = scored.iter().filter(|(j, _)| *j == judge_id).count() as u32;
            JudgeScoringProgress {
                judge_id: judge_id.clone(),
                completed,
                total_contestants,
                completion_percentage: percent_half_up(
                    u64::from(completed),
                    u64::from(total_contestants),
                ),
            }
        })
        .collect();

    CategoryScoringProgress {
        category_id: category_id.clone(),
        category_name: category.name.clone(),
        total_contestants,
        total_judges,
        total_scores,
        expected_scores,
        completion_percentage: percent_half_up(
            u64::from(total_scores),
            u64::from(expected_scores),
        ),
        judges: judge_rows,
    }
}
