//! End-to-end lifecycle tests over an in-memory SQLite store.

use std::collections::HashSet;
use std::sync::Arc;

use classvote::entity::audit::{self, AuditAction};
use classvote::entity::{backup, device, vote};
use classvote::migration::Migrator;
use classvote::{Error, SessionStatus, Store, VoteEvent, VotingService};
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter,
};
use sea_orm_migration::MigratorTrait;

const KEY: &str = "test-teacher-key";

async fn setup() -> (VotingService, DatabaseConnection) {
    // One connection: a pooled sqlite::memory: would give every connection
    // its own empty database.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);
    let conn = Database::connect(opts).await.unwrap();
    Migrator::up(&conn, None).await.unwrap();

    (VotingService::new(Store::new(conn.clone()), KEY), conn)
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn open_sessions_get_pairwise_distinct_codes() {
    let (svc, _conn) = setup().await;

    let mut codes = HashSet::new();
    for _ in 0..20 {
        let opened = svc.open_session(KEY, "6B", &[]).await.unwrap();
        assert!(codes.insert(opened.session_code));
    }
}

#[tokio::test]
async fn open_requires_the_teacher_key() {
    let (svc, _conn) = setup().await;

    let err = svc.open_session("wrong", "6B", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn open_with_zero_candidates_is_allowed() {
    let (svc, _conn) = setup().await;

    let opened = svc.open_session(KEY, "6B", &[]).await.unwrap();
    assert!(svc.candidates(&opened.session_code).await.unwrap().is_empty());
}

#[tokio::test]
async fn candidates_keep_creation_order() {
    let (svc, _conn) = setup().await;

    let opened = svc
        .open_session(KEY, "6B", &names(&["Charlie", "Alice", "Bob"]))
        .await
        .unwrap();
    let listed: Vec<_> = svc
        .candidates(&opened.session_code)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(listed, ["Charlie", "Alice", "Bob"]);
}

#[tokio::test]
async fn rejoining_creates_one_device_row_but_two_audit_entries() {
    let (svc, conn) = setup().await;

    let opened = svc.open_session(KEY, "6B", &names(&["A"])).await.unwrap();
    svc.join_session(&opened.session_code, "tablet-1").await.unwrap();
    svc.join_session(&opened.session_code, "tablet-1").await.unwrap();

    let devices = device::Entity::find()
        .filter(device::Column::DeviceId.eq("tablet-1"))
        .count(&conn)
        .await
        .unwrap();
    assert_eq!(devices, 1);

    let joins = audit::Entity::find()
        .filter(audit::Column::Action.eq(AuditAction::TabletJoin))
        .count(&conn)
        .await
        .unwrap();
    assert_eq!(joins, 2);
}

#[tokio::test]
async fn join_fails_on_unknown_or_closed_sessions() {
    let (svc, _conn) = setup().await;

    let err = svc.join_session("ZZZZ", "tablet-1").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let opened = svc.open_session(KEY, "6B", &names(&["A"])).await.unwrap();
    svc.close_session(KEY, &opened.session_code).await.unwrap();
    let err = svc
        .join_session(&opened.session_code, "tablet-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn join_rechecks_status_inside_its_own_transaction() {
    let (svc, conn) = setup().await;

    let opened = svc.open_session(KEY, "6B", &names(&["A"])).await.unwrap();

    // Observe the session while it is still OPEN, then commit a close before
    // joining, as a racing tablet would.
    let observed = svc
        .store()
        .find_session(&opened.session_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(observed.status, SessionStatus::Open);
    svc.close_session(KEY, &opened.session_code).await.unwrap();

    let err = svc
        .store()
        .join_session(&observed.code, "tablet-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let devices = device::Entity::find().count(&conn).await.unwrap();
    assert_eq!(devices, 0);

    let joins = audit::Entity::find()
        .filter(audit::Column::Action.eq(AuditAction::TabletJoin))
        .count(&conn)
        .await
        .unwrap();
    assert_eq!(joins, 0);
}

#[tokio::test]
async fn every_vote_has_exactly_one_matching_backup() {
    let (svc, conn) = setup().await;

    let opened = svc
        .open_session(KEY, "6B", &names(&["Alice", "Bob"]))
        .await
        .unwrap();
    let ballot = svc.candidates(&opened.session_code).await.unwrap();

    let cast = svc
        .cast_vote(&opened.session_code, ballot[0].id, "tablet-1")
        .await
        .unwrap();

    let backups = backup::Entity::find()
        .filter(backup::Column::SessionCode.eq(opened.session_code.clone()))
        .all(&conn)
        .await
        .unwrap();
    assert_eq!(backups.len(), 1);

    let event: VoteEvent = serde_json::from_str(&backups[0].payload).unwrap();
    assert_eq!(event.vote_id, cast.vote_id);
    assert_eq!(event.session_code, opened.session_code);
    assert_eq!(event.candidate_id, ballot[0].id);
    assert_eq!(event.candidate_name, "Alice");
    assert_eq!(event.device_id, "tablet-1");
    assert_eq!(event.ts, cast.timestamp);
}

#[tokio::test]
async fn voting_on_a_closed_session_mutates_nothing() {
    let (svc, conn) = setup().await;

    let opened = svc.open_session(KEY, "6B", &names(&["A"])).await.unwrap();
    let ballot = svc.candidates(&opened.session_code).await.unwrap();
    svc.close_session(KEY, &opened.session_code).await.unwrap();

    let votes_before = vote::Entity::find().count(&conn).await.unwrap();
    let backups_before = backup::Entity::find().count(&conn).await.unwrap();
    let audits_before = audit::Entity::find().count(&conn).await.unwrap();

    let err = svc
        .cast_vote(&opened.session_code, ballot[0].id, "tablet-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    assert_eq!(vote::Entity::find().count(&conn).await.unwrap(), votes_before);
    assert_eq!(
        backup::Entity::find().count(&conn).await.unwrap(),
        backups_before
    );
    assert_eq!(audit::Entity::find().count(&conn).await.unwrap(), audits_before);
}

#[tokio::test]
async fn voting_for_another_sessions_candidate_is_rejected() {
    let (svc, conn) = setup().await;

    let first = svc.open_session(KEY, "6A", &names(&["A"])).await.unwrap();
    let second = svc.open_session(KEY, "6B", &names(&["B"])).await.unwrap();
    let foreign = svc.candidates(&first.session_code).await.unwrap();

    let err = svc
        .cast_vote(&second.session_code, foreign[0].id, "tablet-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(vote::Entity::find().count(&conn).await.unwrap(), 0);
}

#[tokio::test]
async fn a_device_may_vote_more_than_once() {
    // Deliberate: no (session, device) uniqueness exists in this design.
    let (svc, _conn) = setup().await;

    let opened = svc.open_session(KEY, "6B", &names(&["A"])).await.unwrap();
    let ballot = svc.candidates(&opened.session_code).await.unwrap();

    svc.cast_vote(&opened.session_code, ballot[0].id, "tablet-1")
        .await
        .unwrap();
    svc.cast_vote(&opened.session_code, ballot[0].id, "tablet-1")
        .await
        .unwrap();

    let results = svc.results(KEY, &opened.session_code).await.unwrap();
    assert_eq!(results.total_votes, 2);
}

#[tokio::test]
async fn results_report_counts_and_percentages() {
    let (svc, _conn) = setup().await;

    let opened = svc
        .open_session(KEY, "6B", &names(&["A", "B"]))
        .await
        .unwrap();
    let ballot = svc.candidates(&opened.session_code).await.unwrap();

    for (candidate, device) in [
        (ballot[0].id, "t1"),
        (ballot[0].id, "t2"),
        (ballot[1].id, "t3"),
    ] {
        svc.cast_vote(&opened.session_code, candidate, device)
            .await
            .unwrap();
    }

    let results = svc.results(KEY, &opened.session_code).await.unwrap();
    assert_eq!(results.status, SessionStatus::Open);
    assert_eq!(results.total_votes, 3);
    assert_eq!(results.counts[0].count, 2);
    assert_eq!(results.counts[0].percent, 66.7);
    assert_eq!(results.counts[1].count, 1);
    assert_eq!(results.counts[1].percent, 33.3);

    let err = svc.results("wrong", &opened.session_code).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn results_with_zero_votes_are_all_zero() {
    let (svc, _conn) = setup().await;

    let opened = svc
        .open_session(KEY, "6B", &names(&["A", "B"]))
        .await
        .unwrap();
    let results = svc.results(KEY, &opened.session_code).await.unwrap();

    assert_eq!(results.total_votes, 0);
    for row in &results.counts {
        assert_eq!(row.count, 0);
        assert_eq!(row.percent, 0.0);
    }
}

#[tokio::test]
async fn close_is_terminal_and_returns_a_pdf() {
    let (svc, conn) = setup().await;

    let opened = svc.open_session(KEY, "6B", &names(&["A"])).await.unwrap();
    let pdf = svc.close_session(KEY, &opened.session_code).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let results = svc.results(KEY, &opened.session_code).await.unwrap();
    assert_eq!(results.status, SessionStatus::Closed);

    let closes = audit::Entity::find()
        .filter(audit::Column::Action.eq(AuditAction::CloseSession))
        .count(&conn)
        .await
        .unwrap();
    assert_eq!(closes, 1);

    let err = svc
        .close_session(KEY, &opened.session_code)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    let err = svc.close_session(KEY, "ZZZZ").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn concurrent_closes_have_exactly_one_winner() {
    let (svc, _conn) = setup().await;
    let svc = Arc::new(svc);

    let opened = svc.open_session(KEY, "6B", &names(&["A"])).await.unwrap();

    let a = svc.clone();
    let b = svc.clone();
    let code_a = opened.session_code.clone();
    let code_b = opened.session_code.clone();
    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.close_session(KEY, &code_a).await }),
        tokio::spawn(async move { b.close_session(KEY, &code_b).await }),
    );

    let outcomes = [first.unwrap(), second.unwrap()];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(Error::InvalidState(_)))));
}

#[tokio::test]
async fn report_renders_for_open_and_empty_sessions() {
    let (svc, _conn) = setup().await;

    let opened = svc
        .open_session(KEY, "6B", &names(&["A", "B"]))
        .await
        .unwrap();

    // Regeneratable at any time, even before the close.
    let pdf = svc.report(KEY, &opened.session_code).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let err = svc.report("wrong", &opened.session_code).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));

    let err = svc.report(KEY, "ZZZZ").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn summary_report_skips_unknown_codes_and_validates_input() {
    let (svc, _conn) = setup().await;

    let first = svc
        .open_session(KEY, "6A", &names(&["Alice", "Bob"]))
        .await
        .unwrap();
    let second = svc
        .open_session(KEY, "6B", &names(&["Alice"]))
        .await
        .unwrap();

    let ballot_one = svc.candidates(&first.session_code).await.unwrap();
    let ballot_two = svc.candidates(&second.session_code).await.unwrap();
    for _ in 0..2 {
        svc.cast_vote(&first.session_code, ballot_one[0].id, "t1")
            .await
            .unwrap();
    }
    for _ in 0..3 {
        svc.cast_vote(&second.session_code, ballot_two[0].id, "t2")
            .await
            .unwrap();
    }

    let codes = vec![
        first.session_code.clone(),
        second.session_code.clone(),
        "ZZZZ".to_owned(),
    ];
    let pdf = svc.summary_report(KEY, &codes).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let err = svc.summary_report(KEY, &[]).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = svc.summary_report("wrong", &codes).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn open_writes_session_candidates_and_audit_atomically() {
    let (svc, conn) = setup().await;

    svc.open_session(KEY, "6B", &names(&["A", "B", "C"]))
        .await
        .unwrap();

    let opens = audit::Entity::find()
        .filter(audit::Column::Action.eq(AuditAction::OpenSession))
        .count(&conn)
        .await
        .unwrap();
    assert_eq!(opens, 1);

    let votes_audited = audit::Entity::find()
        .filter(audit::Column::Action.eq(AuditAction::Vote))
        .count(&conn)
        .await
        .unwrap();
    assert_eq!(votes_audited, 0);
}
