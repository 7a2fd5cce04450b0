#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use certflow_kernel_contracts::certification::{
    CertificationAuditAction, CertificationAuditInput, InsertOutcome,
};
use certflow_kernel_contracts::competition::{CategoryRecord, ContestRecord, EventRecord};
use certflow_kernel_contracts::ids::{CategoryId, ContestId, ContestantId, EventId, JudgeId, UserId};
use certflow_kernel_contracts::role::Role;
use certflow_kernel_contracts::{MonotonicTimeNs, ReasonCodeId};
use certflow_storage::repo::{CertificationAuditRepo, CertificationLedgerRepo};
use certflow_storage::shared::SharedCertStore;
use certflow_storage::store::{CategoryFilter, CertStore, RoleSignoffKey, StorageError};
use proptest::prelude::*;

fn cat(id: &str) -> CategoryId {
    CategoryId::new(id).unwrap()
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn role(r: &str) -> Role {
    Role::new(r).unwrap()
}

fn judge(id: &str) -> JudgeId {
    JudgeId::new(id).unwrap()
}

fn contestant(id: &str) -> ContestantId {
    ContestantId::new(id).unwrap()
}

fn store_with(categories: &[&str]) -> CertStore {
    let mut s = CertStore::new_in_memory();
    let e = EventId::new("event_1").unwrap();
    let c = ContestId::new("contest_1").unwrap();
    s.insert_event(EventRecord::v1(e.clone(), "Event").unwrap()).unwrap();
    s.insert_contest(ContestRecord::v1(c.clone(), e, "Contest").unwrap())
        .unwrap();
    for id in categories {
        s.insert_category(CategoryRecord::v1(cat(id), c.clone(), *id).unwrap())
            .unwrap();
    }
    s
}

fn audit(category: &str, action: CertificationAuditAction) -> CertificationAuditInput {
    CertificationAuditInput {
        at: MonotonicTimeNs(10),
        actor: "admin_1".to_string(),
        category_id: Some(cat(category)),
        action,
        reason_code: ReasonCodeId(0x5200_0001),
        detail: "test".to_string(),
    }
}

#[test]
fn at_ledger_db_01_judge_signoff_unique_per_triple() {
    let mut s = store_with(&["cat_1"]);
    let first = s
        .insert_judge_contestant_certification_row(
            cat("cat_1"),
            judge("judge_1"),
            contestant("contestant_1"),
            MonotonicTimeNs(1),
        )
        .unwrap();
    let again = s
        .insert_judge_contestant_certification_row(
            cat("cat_1"),
            judge("judge_1"),
            contestant("contestant_1"),
            MonotonicTimeNs(2),
        )
        .unwrap();
    match (first, again) {
        (InsertOutcome::Inserted(a), InsertOutcome::AlreadyPresent(b)) => {
            assert_eq!(a, b);
            assert_eq!(b.certified_at, MonotonicTimeNs(1));
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }
    assert_eq!(s.judge_contestant_certification_rows(&cat("cat_1")).len(), 1);

    assert!(matches!(
        s.insert_judge_contestant_certification_row(
            cat("missing"),
            judge("judge_1"),
            contestant("contestant_1"),
            MonotonicTimeNs(3),
        ),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
}

#[test]
fn at_ledger_db_02_role_keys_per_role_and_per_signer() {
    let mut s = store_with(&["cat_1"]);
    let tally = role("TALLY");
    for u in ["tally_1", "tally_2"] {
        let out = s
            .insert_role_certification_row(
                RoleSignoffKey::per_signer(cat("cat_1"), tally.clone(), user(u)),
                user(u),
                MonotonicTimeNs(1),
            )
            .unwrap();
        assert!(out.was_inserted());
    }

    let board = role("BOARD");
    assert!(s
        .insert_role_certification_row(
            RoleSignoffKey::per_role(cat("cat_1"), board.clone()),
            user("board_1"),
            MonotonicTimeNs(2),
        )
        .unwrap()
        .was_inserted());
    let dup = s
        .insert_role_certification_row(
            RoleSignoffKey::per_role(cat("cat_1"), board),
            user("board_2"),
            MonotonicTimeNs(3),
        )
        .unwrap();
    assert!(!dup.was_inserted());
    assert_eq!(dup.into_row().user_id, user("board_1"));

    assert!(matches!(
        s.insert_role_certification_row(
            RoleSignoffKey::per_signer(cat("cat_1"), tally, user("tally_3")),
            user("someone_else"),
            MonotonicTimeNs(4),
        ),
        Err(StorageError::ContractViolation(_))
    ));
    assert_eq!(s.role_certification_rows(&cat("cat_1")).len(), 3);
}

#[test]
fn at_ledger_db_03_delete_is_scoped_and_frees_unique_keys() {
    let mut s = store_with(&["cat_1", "cat_2"]);
    for c in ["cat_1", "cat_2"] {
        s.insert_judge_contestant_certification_row(
            cat(c),
            judge("judge_1"),
            contestant("contestant_1"),
            MonotonicTimeNs(1),
        )
        .unwrap();
        s.insert_role_certification_row(
            RoleSignoffKey::per_role(cat(c), role("AUDIT")),
            user("audit_1"),
            MonotonicTimeNs(1),
        )
        .unwrap();
        s.insert_review_signoff_row(
            cat(c),
            user("board_1"),
            role("BOARD"),
            None,
            MonotonicTimeNs(1),
        )
        .unwrap();
    }

    let counts = s.delete_ledger_rows_for(&CategoryFilter::Only(BTreeSet::from([cat("cat_1")])));
    assert_eq!(counts.total(), 3);
    assert!(s.role_certification_rows(&cat("cat_1")).is_empty());
    assert_eq!(s.role_certification_rows(&cat("cat_2")).len(), 1);
    assert_eq!(s.review_signoff_rows(&cat("cat_2")).len(), 1);

    // The unique slot is free again after the delete.
    assert!(s
        .insert_role_certification_row(
            RoleSignoffKey::per_role(cat("cat_1"), role("AUDIT")),
            user("audit_2"),
            MonotonicTimeNs(5),
        )
        .unwrap()
        .was_inserted());

    assert_eq!(s.delete_ledger_rows_for(&CategoryFilter::All).total(), 4);
}

#[test]
fn at_ledger_db_04_audit_is_append_only_and_survives_delete() {
    let mut s = store_with(&["cat_1"]);
    let id = s.append_audit_row_input(audit("cat_1", CertificationAuditAction::RoleSignoff));
    s.append_audit_row_input(audit("cat_1", CertificationAuditAction::Reset));
    assert!(matches!(
        s.attempt_overwrite_audit_row_by_id(id),
        Err(StorageError::AppendOnlyViolation { .. })
    ));
    s.delete_ledger_rows_for(&CategoryFilter::All);
    let rows = s.audit_rows_by_category(&cat("cat_1"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].audit_id, id);
    assert_eq!(s.audit_rows_all().len(), 2);
}

#[test]
fn at_ledger_db_05_transaction_rolls_back_every_write() {
    let mut s = store_with(&["cat_1"]);
    let res: Result<(), StorageError> = s.transaction(|tx| {
        tx.insert_role_certification_row(
            RoleSignoffKey::per_role(cat("cat_1"), role("AUDIT")),
            user("audit_1"),
            MonotonicTimeNs(1),
        )?;
        tx.append_audit_row_input(audit("cat_1", CertificationAuditAction::FinalCertification));
        Err(StorageError::Unavailable {
            details: "forced".to_string(),
        })
    });
    assert!(res.is_err());
    assert!(s.role_certification_rows(&cat("cat_1")).is_empty());
    assert!(s.audit_rows_all().is_empty());
}

#[test]
fn at_ledger_db_06_shared_store_serializes_writers() {
    let shared = SharedCertStore::new(store_with(&["cat_1"]));
    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                shared.with_store(|s| {
                    s.insert_role_certification_row(
                        RoleSignoffKey::per_role(cat("cat_1"), role("AUDIT")),
                        user(&format!("audit_{i}")),
                        MonotonicTimeNs(i),
                    )
                    .map(|o| o.was_inserted())
                })
            })
        })
        .collect();
    let inserted = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(inserted, 1);
    let rows = shared
        .with_store(|s| Ok::<_, StorageError>(s.role_certification_rows(&cat("cat_1")).len()))
        .unwrap();
    assert_eq!(rows, 1);
}

proptest! {
    #[test]
    fn at_ledger_db_07_row_count_never_exceeds_distinct_pairs(
        picks in proptest::collection::vec((0u8..3, 0u8..5), 0..60)
    ) {
        let mut s = store_with(&["cat_p"]);
        let mut distinct = BTreeSet::new();
        for (j, c) in picks {
            s.insert_judge_contestant_certification_row(
                cat("cat_p"),
                judge(&format!("judge_{j}")),
                contestant(&format!("contestant_{c}")),
                MonotonicTimeNs(1),
            )
            .unwrap();
            distinct.insert((j, c));
            prop_assert_eq!(
                s.judge_contestant_certification_rows(&cat("cat_p")).len(),
                distinct.len()
            );
        }
    }
}
