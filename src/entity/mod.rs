//! Database entity models for the classroom voting store.
//!
//! One Sea-ORM entity per table. A [`session`](self::session) owns its
//! candidates, device registrations and votes (all cascade-removed with the
//! session); [`backup`](self::backup) and [`audit`](self::audit) rows are
//! append-only and deliberately unrelated at the schema level so they survive
//! any administrative session deletion.

/// Voting session: one round of voting for a class, identified by a short
/// code, with an OPEN/CLOSED lifecycle.
pub mod session;

/// Candidate: a choice option scoped to exactly one session.
pub mod candidate;

/// Device ("tablet"): a voting client registered to a session.
pub mod device;

/// Vote: an immutable record linking a device to a candidate.
pub mod vote;

/// Backup: a redundant durable copy of one vote event.
pub mod backup;

/// Audit: append-only log of state-changing actions.
pub mod audit;
