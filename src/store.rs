use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

use crate::entity::audit::{self, AuditAction};
use crate::entity::session::SessionStatus;
use crate::entity::{backup, candidate, device, session, vote};
use crate::error::{Error, Result};

/// Serialized snapshot of one vote event.
///
/// Written as the JSON payload of a [`backup`] row in the same transaction as
/// the vote, and fed to the optional best-effort file sink after commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteEvent {
    pub vote_id: i32,
    pub session_code: String,
    pub candidate_id: i32,
    pub candidate_name: String,
    pub device_id: String,
    /// RFC 3339 rendering of the vote timestamp.
    pub ts: String,
}

/// A vote accepted by [`Store::record_vote`], with the rows the caller needs
/// for logging and the sink.
#[derive(Debug, Clone)]
pub struct RecordedVote {
    pub vote: vote::Model,
    pub candidate: candidate::Model,
    pub event: VoteEvent,
}

/// Durable record of sessions, candidates, device registrations, votes,
/// backups and audit entries.
///
/// Wraps a Sea-ORM [`DatabaseConnection`]; every multi-row unit (open a
/// session with its candidates, record a vote with its backup, close a
/// session) runs inside one transaction so that a reader never observes a
/// partial unit. A vote without its backup row, or vice versa, is
/// unobservable by construction.
///
/// The session close is a conditional update filtered on `status = 'OPEN'`:
/// of any number of concurrent closes, exactly one sees `rows_affected == 1`
/// and wins; the rest observe the session as already closed.
#[derive(Debug, Clone)]
pub struct Store {
    conn: DatabaseConnection,
}

impl Store {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// The underlying connection, for callers that need ad-hoc queries
    /// (demos, tests).
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Whether a session (of any status) already uses this code.
    pub async fn code_in_use(&self, code: &str) -> Result<bool> {
        Ok(session::Entity::find()
            .filter(session::Column::Code.eq(code))
            .one(&self.conn)
            .await?
            .is_some())
    }

    pub async fn find_session(&self, code: &str) -> Result<Option<session::Model>> {
        Ok(session::Entity::find()
            .filter(session::Column::Code.eq(code))
            .one(&self.conn)
            .await?)
    }

    /// Candidates of a session in creation (id) order. The tally and the
    /// report both rely on this order being stable.
    pub async fn candidates_of(&self, session_id: i32) -> Result<Vec<candidate::Model>> {
        Ok(candidate::Entity::find()
            .filter(candidate::Column::SessionId.eq(session_id))
            .order_by_asc(candidate::Column::Id)
            .all(&self.conn)
            .await?)
    }

    /// Votes of a session in chronological (timestamp, then insertion) order.
    pub async fn votes_of(&self, session_id: i32) -> Result<Vec<vote::Model>> {
        Ok(vote::Entity::find()
            .filter(vote::Column::SessionId.eq(session_id))
            .order_by_asc(vote::Column::Ts)
            .order_by_asc(vote::Column::Id)
            .all(&self.conn)
            .await?)
    }

    /// Creates a session (status OPEN, `start_ts` = now) together with its
    /// candidates and the OPEN_SESSION audit entry, as one atomic unit.
    ///
    /// The candidate list may be empty: a session can start with zero
    /// candidates. Code uniqueness is the caller's concern (the lifecycle
    /// retries generation); the unique index is the backstop.
    pub async fn open_session(
        &self,
        class_name: &str,
        code: &str,
        candidate_names: &[String],
    ) -> Result<session::Model> {
        let now = now_ts();
        let txn = self.conn.begin().await?;

        let sess = session::ActiveModel {
            class_name: Set(class_name.to_owned()),
            code: Set(code.to_owned()),
            status: Set(SessionStatus::Open),
            start_ts: Set(now),
            end_ts: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // Inserted one by one so creation order matches list order.
        for name in candidate_names {
            candidate::ActiveModel {
                session_id: Set(sess.id),
                name: Set(name.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        append_audit(
            &txn,
            AuditAction::OpenSession,
            format!("session {code} opened"),
        )
        .await?;

        txn.commit().await?;
        Ok(sess)
    }

    /// Registers a device for an OPEN session. Idempotent: a device already
    /// registered for the session is left untouched. A TABLET_JOIN audit
    /// entry is written on every call, re-join included.
    ///
    /// The session is re-resolved inside the transaction so a concurrent
    /// close cannot register a device on a CLOSED session.
    ///
    /// Returns whether a new registration row was created.
    pub async fn join_session(&self, code: &str, device_id: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let sess = session::Entity::find()
            .filter(session::Column::Code.eq(code))
            .filter(session::Column::Status.eq(SessionStatus::Open))
            .one(&txn)
            .await?
            .ok_or_else(|| Error::NotFound(format!("open session {code}")))?;

        let existing = device::Entity::find()
            .filter(device::Column::DeviceId.eq(device_id))
            .filter(device::Column::SessionId.eq(sess.id))
            .one(&txn)
            .await?;

        let newly_registered = existing.is_none();
        if newly_registered {
            device::ActiveModel {
                device_id: Set(device_id.to_owned()),
                session_id: Set(sess.id),
                joined_ts: Set(now_ts()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        append_audit(
            &txn,
            AuditAction::TabletJoin,
            format!("tablet {device_id} joined {}", sess.code),
        )
        .await?;

        txn.commit().await?;
        Ok(newly_registered)
    }

    /// Validates and persists a single vote: vote row, backup row with a
    /// serialized copy of the same event, and VOTE audit entry, all in one
    /// transaction. No row survives a failure at any step.
    ///
    /// The session is re-resolved inside the transaction so a concurrent
    /// close cannot slip a vote into a CLOSED session. The candidate lookup
    /// is scoped to the session, which rejects cross-session voting.
    ///
    /// No uniqueness across (session, device) is enforced: a device may cast
    /// any number of votes.
    pub async fn record_vote(
        &self,
        code: &str,
        candidate_id: i32,
        device_id: &str,
    ) -> Result<RecordedVote> {
        let txn = self.conn.begin().await?;

        let sess = session::Entity::find()
            .filter(session::Column::Code.eq(code))
            .filter(session::Column::Status.eq(SessionStatus::Open))
            .one(&txn)
            .await?
            .ok_or_else(|| Error::InvalidState(format!("session {code} is not open")))?;

        let cand = candidate::Entity::find()
            .filter(candidate::Column::Id.eq(candidate_id))
            .filter(candidate::Column::SessionId.eq(sess.id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("candidate {candidate_id} in session {code}"))
            })?;

        let now = now_ts();
        let vote = vote::ActiveModel {
            session_id: Set(sess.id),
            candidate_id: Set(cand.id),
            device_id: Set(device_id.to_owned()),
            ts: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let event = VoteEvent {
            vote_id: vote.id,
            session_code: sess.code.clone(),
            candidate_id: cand.id,
            candidate_name: cand.name.clone(),
            device_id: device_id.to_owned(),
            ts: now.to_rfc3339(),
        };

        backup::ActiveModel {
            session_code: Set(sess.code.clone()),
            payload: Set(serde_json::to_string(&event)?),
            ts: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        append_audit(
            &txn,
            AuditAction::Vote,
            format!("vote {} for {} from {device_id}", vote.id, cand.name),
        )
        .await?;

        txn.commit().await?;

        Ok(RecordedVote {
            vote,
            candidate: cand,
            event,
        })
    }

    /// Transitions a session OPEN → CLOSED, stamping `end_ts` and writing the
    /// CLOSE_SESSION audit entry in the same transaction.
    ///
    /// The update is conditioned on the prior state (`status = 'OPEN'`), so
    /// concurrent closes of the same session resolve to exactly one success;
    /// every other call fails with `InvalidState` (or `NotFound` if the code
    /// is unknown) without touching the row.
    pub async fn close_session(&self, code: &str) -> Result<session::Model> {
        let now = now_ts();
        let txn = self.conn.begin().await?;

        let updated = session::Entity::update_many()
            .col_expr(session::Column::Status, Expr::value(SessionStatus::Closed))
            .col_expr(session::Column::EndTs, Expr::value(now))
            .filter(session::Column::Code.eq(code))
            .filter(session::Column::Status.eq(SessionStatus::Open))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            // Lost the race or never open; report which.
            let known = session::Entity::find()
                .filter(session::Column::Code.eq(code))
                .one(&txn)
                .await?
                .is_some();
            return Err(if known {
                Error::InvalidState(format!("session {code} is not open"))
            } else {
                Error::NotFound(format!("session {code}"))
            });
        }

        append_audit(
            &txn,
            AuditAction::CloseSession,
            format!("session {code} closed"),
        )
        .await?;

        let sess = session::Entity::find()
            .filter(session::Column::Code.eq(code))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                Error::Internal(sea_orm::DbErr::RecordNotFound(format!(
                    "session {code} vanished during close"
                )))
            })?;

        txn.commit().await?;
        Ok(sess)
    }
}

async fn append_audit(
    txn: &DatabaseTransaction,
    action: AuditAction,
    details: String,
) -> Result<()> {
    audit::ActiveModel {
        action: Set(action),
        details: Set(details),
        ts: Set(now_ts()),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn now_ts() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}
