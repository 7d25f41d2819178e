//! Voting session entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a session.
///
/// A session is created `Open` and transitions to `Closed` exactly once,
/// never back. The transition is performed with a conditional update filtered
/// on `status = 'OPEN'` (see `Store::close_session`) so that concurrent
/// closes resolve to exactly one winner.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

/// One voting round for a class.
///
/// | Column     | Type               | Description                          |
/// |------------|--------------------|--------------------------------------|
/// | id         | INT (PK)           | Session id                           |
/// | class_name | VARCHAR(64)        | Free-text class label                |
/// | code       | VARCHAR(16) UNIQUE | Short human-typable join code        |
/// | status     | VARCHAR(16)        | `OPEN` or `CLOSED`                   |
/// | start_ts   | TIMESTAMPTZ        | Set at open time                     |
/// | end_ts     | TIMESTAMPTZ NULL   | Null until the session is closed     |
///
/// Mutated only by the close transition (`status` + `end_ts`); the core never
/// deletes sessions.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "session")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub class_name: String,
    #[sea_orm(unique, indexed)]
    pub code: String,
    pub status: SessionStatus,
    pub start_ts: DateTimeWithTimeZone,
    #[sea_orm(nullable)]
    pub end_ts: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::candidate::Entity")]
    Candidate,
    #[sea_orm(has_many = "super::device::Entity")]
    Device,
    #[sea_orm(has_many = "super::vote::Entity")]
    Vote,
}

impl Related<super::candidate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidate.def()
    }
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
