#![forbid(unsafe_code)]

use std::sync::Arc;

use certflow_kernel_contracts::competition::{
    CategoryRecord, ContestRecord, EventRecord, ScoreInput, UserRecord,
};
use certflow_kernel_contracts::ids::{
    CategoryId, ContestId, ContestantId, CriterionId, EventId, JudgeId, UserId,
};
use certflow_kernel_contracts::role::Role;
use certflow_kernel_contracts::MonotonicTimeNs;
use certflow_storage::store::CertStore;

use crate::config::CertflowConfig;
use crate::notify::RecordingEventSink;

pub fn now() -> MonotonicTimeNs {
    MonotonicTimeNs(1_000_000_000)
}

pub fn cat(id: &str) -> CategoryId {
    CategoryId::new(id).unwrap()
}

pub fn contest(id: &str) -> ContestId {
    ContestId::new(id).unwrap()
}

pub fn event(id: &str) -> EventId {
    EventId::new(id).unwrap()
}

pub fn judge(id: &str) -> JudgeId {
    JudgeId::new(id).unwrap()
}

pub fn contestant(id: &str) -> ContestantId {
    ContestantId::new(id).unwrap()
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn role(r: &str) -> Role {
    Role::new(r).unwrap()
}

pub fn config() -> Arc<CertflowConfig> {
    Arc::new(CertflowConfig::default())
}

pub fn sink() -> Arc<RecordingEventSink> {
    Arc::new(RecordingEventSink::default())
}

/// `event_1` holding `contest_1` and its sibling `contest_2`, plus one user per role.
pub fn seed_hierarchy() -> CertStore {
    let mut s = CertStore::new_in_memory();
    s.insert_event(EventRecord::v1(event("event_1"), "Regional Finals").unwrap())
        .unwrap();
    for c in ["contest_1", "contest_2"] {
        s.insert_contest(ContestRecord::v1(contest(c), event("event_1"), c).unwrap())
            .unwrap();
    }
    for (u, r) in [
        ("audit_1", "AUDIT"),
        ("audit_2", "AUDIT"),
        ("tally_1", "TALLY"),
        ("tally_2", "TALLY"),
        ("board_1", "BOARD"),
        ("admin_1", "ADMIN"),
        ("judge_1", "JUDGE"),
    ] {
        s.insert_user(UserRecord::v1(user(u), role(r))).unwrap();
    }
    s
}

/// Creates the category and assigns `judge_1..=judges` and `contestant_1..=contestants`.
pub fn seed_category(
    s: &mut CertStore,
    contest_id: &str,
    category_id: &str,
    judges: u32,
    contestants: u32,
) {
    s.insert_category(
        CategoryRecord::v1(cat(category_id), contest(contest_id), category_id).unwrap(),
    )
    .unwrap();
    for j in 1..=judges {
        s.assign_judge(&cat(category_id), judge(&format!("judge_{j}")))
            .unwrap();
    }
    for c in 1..=contestants {
        s.assign_contestant(&cat(category_id), contestant(&format!("contestant_{c}")))
            .unwrap();
    }
}

pub fn seed_score(
    s: &mut CertStore,
    category_id: &str,
    judge_id: &str,
    contestant_id: &str,
    criterion: Option<&str>,
) -> u64 {
    s.insert_score(ScoreInput {
        category_id: cat(category_id),
        judge_id: judge(judge_id),
        contestant_id: contestant(contestant_id),
        criterion_id: criterion.map(|c| CriterionId::new(c).unwrap()),
        value: 8.0,
    })
    .unwrap()
}

/// One criterion score for every assigned (judge, contestant) pair.
pub fn seed_full_scores(s: &mut CertStore, category_id: &str) {
    let judges = s.category_judges(&cat(category_id));
    let contestants = s.category_contestants(&cat(category_id));
    for j in &judges {
        for c in &contestants {
            seed_score(s, category_id, j.as_str(), c.as_str(), Some("crit_a"));
        }
    }
}
