#![forbid(unsafe_code)]

use certflow_kernel_contracts::competition::{
    CategoryRecord, ContestRecord, EventRecord, ScoreInput, UserRecord,
};
use certflow_kernel_contracts::ids::{
    CategoryId, ContestId, ContestantId, CriterionId, EventId, JudgeId, UserId,
};
use certflow_kernel_contracts::role::Role;
use certflow_kernel_contracts::MonotonicTimeNs;
use certflow_storage::repo::CompetitionRepo;
use certflow_storage::store::{CertStore, StorageError};

fn event(id: &str) -> EventId {
    EventId::new(id).unwrap()
}

fn contest(id: &str) -> ContestId {
    ContestId::new(id).unwrap()
}

fn cat(id: &str) -> CategoryId {
    CategoryId::new(id).unwrap()
}

fn judge(id: &str) -> JudgeId {
    JudgeId::new(id).unwrap()
}

fn contestant(id: &str) -> ContestantId {
    ContestantId::new(id).unwrap()
}

fn seed(s: &mut CertStore) {
    s.insert_event_row(EventRecord::v1(event("event_1"), "Spring Open").unwrap())
        .unwrap();
    s.insert_contest_row(ContestRecord::v1(contest("contest_1"), event("event_1"), "Solo").unwrap())
        .unwrap();
    s.insert_category_row(
        CategoryRecord::v1(cat("cat_1"), contest("contest_1"), "Junior Vocal").unwrap(),
    )
    .unwrap();
}

fn score(category: &str, j: &str, c: &str, value: f64) -> ScoreInput {
    ScoreInput {
        category_id: cat(category),
        judge_id: judge(j),
        contestant_id: contestant(c),
        criterion_id: Some(CriterionId::new("crit_a").unwrap()),
        value,
    }
}

#[test]
fn at_comp_db_01_hierarchy_foreign_keys_enforced() {
    let mut s = CertStore::new_in_memory();
    assert!(matches!(
        s.insert_contest_row(
            ContestRecord::v1(contest("contest_x"), event("missing"), "Orphan").unwrap()
        ),
        Err(StorageError::ForeignKeyViolation { .. })
    ));

    seed(&mut s);
    assert!(matches!(
        s.insert_category_row(
            CategoryRecord::v1(cat("cat_x"), contest("missing"), "Orphan").unwrap()
        ),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
    assert!(matches!(
        s.assign_judge_row(&cat("missing"), judge("judge_1")),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
    assert!(matches!(
        s.insert_score_row(score("missing", "judge_1", "contestant_1", 7.0)),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
}

#[test]
fn at_comp_db_02_duplicate_keys_rejected_and_assignments_idempotent() {
    let mut s = CertStore::new_in_memory();
    seed(&mut s);
    assert!(matches!(
        s.insert_category_row(
            CategoryRecord::v1(cat("cat_1"), contest("contest_1"), "Again").unwrap()
        ),
        Err(StorageError::DuplicateKey { .. })
    ));

    let user = UserRecord::v1(UserId::new("tally_1").unwrap(), Role::new("TALLY").unwrap());
    s.insert_user_row(user.clone()).unwrap();
    assert!(matches!(
        s.insert_user_row(user),
        Err(StorageError::DuplicateKey { .. })
    ));

    assert!(s.assign_judge_row(&cat("cat_1"), judge("judge_1")).unwrap());
    assert!(!s.assign_judge_row(&cat("cat_1"), judge("judge_1")).unwrap());
    assert!(s
        .assign_contestant_row(&cat("cat_1"), contestant("contestant_1"))
        .unwrap());
    assert_eq!(s.category_judges(&cat("cat_1")).len(), 1);
    assert_eq!(s.category_contestants(&cat("cat_1")).len(), 1);
}

#[test]
fn at_comp_db_03_scores_validate_and_lock() {
    let mut s = CertStore::new_in_memory();
    seed(&mut s);

    assert!(matches!(
        s.insert_score_row(score("cat_1", "judge_1", "contestant_1", f64::NAN)),
        Err(StorageError::ContractViolation(_))
    ));

    let id = s
        .insert_score_row(score("cat_1", "judge_1", "contestant_1", 7.5))
        .unwrap();
    s.update_score_value_row(id, 8.0).unwrap();
    assert_eq!(s.score_row(id).unwrap().value, 8.0);
    assert!(!s.score_row(id).unwrap().is_certified);

    let by = UserId::new("audit_1").unwrap();
    assert_eq!(s.lock_category_scores(&cat("cat_1"), MonotonicTimeNs(5), &by), 1);
    assert!(matches!(
        s.update_score_value_row(id, 9.0),
        Err(StorageError::LockedRow { .. })
    ));
    let row = s.score_row(id).unwrap();
    assert!(row.is_locked && row.is_certified);
    assert_eq!(row.certified_at, Some(MonotonicTimeNs(5)));
    assert_eq!(s.score_rows_for_category(&cat("cat_1")).len(), 1);
}

#[test]
fn at_comp_db_04_hierarchy_lookups() {
    let mut s = CertStore::new_in_memory();
    seed(&mut s);
    s.insert_category_row(
        CategoryRecord::v1(cat("cat_2"), contest("contest_1"), "Senior Vocal").unwrap(),
    )
    .unwrap();

    assert_eq!(s.event_row(&event("event_1")).unwrap().name, "Spring Open");
    assert_eq!(s.contest_row(&contest("contest_1")).unwrap().event_id, event("event_1"));
    assert_eq!(s.contests_for_event(&event("event_1")).len(), 1);
    let ids: Vec<_> = s
        .categories_for_contest(&contest("contest_1"))
        .into_iter()
        .map(|c| c.category_id.clone())
        .collect();
    assert_eq!(ids, vec![cat("cat_1"), cat("cat_2")]);
    assert!(!s.category_row(&cat("cat_2")).unwrap().totals_certified);
}
