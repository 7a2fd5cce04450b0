#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use certflow_kernel_contracts::certification::{
    WorkflowScope, WorkflowStage, WorkflowState, WorkflowStatusRecord,
};
use certflow_kernel_contracts::competition::{
    CategoryRecord, ContestRecord, EventRecord, ScoreInput,
};
use certflow_kernel_contracts::ids::{
    CategoryId, ContestId, ContestantId, CriterionId, EventId, JudgeId, UserId,
};
use certflow_kernel_contracts::MonotonicTimeNs;
use certflow_storage::repo::WorkflowStatusRepo;
use certflow_storage::store::{CategoryFilter, CertStore};

fn cat(id: &str) -> CategoryId {
    CategoryId::new(id).unwrap()
}

fn contest(id: &str) -> ContestId {
    ContestId::new(id).unwrap()
}

fn seeded() -> CertStore {
    let mut s = CertStore::new_in_memory();
    let e = EventId::new("event_1").unwrap();
    s.insert_event(EventRecord::v1(e.clone(), "Event").unwrap()).unwrap();
    for c in ["contest_1", "contest_2"] {
        s.insert_contest(ContestRecord::v1(contest(c), e.clone(), c).unwrap())
            .unwrap();
    }
    s.insert_category(CategoryRecord::v1(cat("cat_1"), contest("contest_1"), "A").unwrap())
        .unwrap();
    s.insert_category(CategoryRecord::v1(cat("cat_2"), contest("contest_2"), "B").unwrap())
        .unwrap();
    s
}

fn advanced(scope: WorkflowScope) -> WorkflowStatusRecord {
    let mut row = WorkflowStatusRecord::pending(scope, MonotonicTimeNs(1));
    row.status = WorkflowState::InProgress;
    row.current_step = WorkflowStage::Audit.step();
    row.judge_certified = true;
    row.tally_certified = true;
    row.comments = Some("checked".to_string());
    row
}

#[test]
fn at_wf_db_01_upsert_replaces_by_scope() {
    let mut s = seeded();
    let scope = WorkflowScope::Category(cat("cat_1"));
    s.upsert_workflow_status_row(WorkflowStatusRecord::pending(scope.clone(), MonotonicTimeNs(1)));
    s.upsert_workflow_status_row(advanced(scope.clone()));

    assert_eq!(s.workflow_status_rows_all().len(), 1);
    let row = s.workflow_status_row(&scope).unwrap();
    assert_eq!(row.current_step, 3);
    assert!(row.tally_certified);
}

#[test]
fn at_wf_db_02_reset_only_touches_rows_in_scope() {
    let mut s = seeded();
    let rows = [
        WorkflowScope::Category(cat("cat_1")),
        WorkflowScope::Category(cat("cat_2")),
        WorkflowScope::Contest(contest("contest_1")),
        WorkflowScope::Contest(contest("contest_2")),
        WorkflowScope::Event(EventId::new("event_1").unwrap()),
    ];
    for scope in &rows {
        s.upsert_workflow_status_row(advanced(scope.clone()));
    }

    let n = s.reset_workflow_status_rows(
        |scope| {
            matches!(scope, WorkflowScope::Category(c) if c == &cat("cat_1"))
                || matches!(scope, WorkflowScope::Contest(c) if c == &contest("contest_1"))
        },
        MonotonicTimeNs(50),
    );
    assert_eq!(n, 2);

    let cleared = s.workflow_status_row(&rows[0]).unwrap();
    assert_eq!(
        cleared,
        &WorkflowStatusRecord::pending(rows[0].clone(), MonotonicTimeNs(50))
    );
    assert_eq!(cleared.comments, None);
    assert_eq!(
        s.workflow_status_row(&rows[2]).unwrap().status,
        WorkflowState::Pending
    );
    for untouched in [&rows[1], &rows[3], &rows[4]] {
        assert_eq!(
            s.workflow_status_row(untouched).unwrap().status,
            WorkflowState::InProgress
        );
    }
}

#[test]
fn at_wf_db_03_totals_and_score_flags_reset_by_filter() {
    let mut s = seeded();
    let by = UserId::new("audit_1").unwrap();
    for c in ["cat_1", "cat_2"] {
        s.set_category_totals_certified(&cat(c), true).unwrap();
        s.insert_score(ScoreInput {
            category_id: cat(c),
            judge_id: JudgeId::new("judge_1").unwrap(),
            contestant_id: ContestantId::new("contestant_1").unwrap(),
            criterion_id: Some(CriterionId::new("crit_a").unwrap()),
            value: 9.0,
        })
        .unwrap();
        s.lock_category_scores(&cat(c), MonotonicTimeNs(2), &by);
    }

    let only_one = CategoryFilter::Only(BTreeSet::from([cat("cat_1")]));
    assert_eq!(s.reset_category_totals_certified(&only_one), 1);
    assert_eq!(s.reset_score_certification(&only_one, true), 1);

    assert!(!s.get_category(&cat("cat_1")).unwrap().totals_certified);
    assert!(s.get_category(&cat("cat_2")).unwrap().totals_certified);
    let a = s.scores_for_category(&cat("cat_1"))[0];
    assert!(!a.is_certified && !a.is_locked && a.certified_by.is_none());
    let b = s.scores_for_category(&cat("cat_2"))[0];
    assert!(b.is_certified && b.is_locked);

    // Keeping locks leaves the row locked but uncertified.
    assert_eq!(s.reset_score_certification(&CategoryFilter::All, false), 2);
    let b = s.scores_for_category(&cat("cat_2"))[0];
    assert!(!b.is_certified && b.is_locked);
}
