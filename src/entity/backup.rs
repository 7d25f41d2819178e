//! Backup entity: one row per accepted vote, written in the same transaction
//! as the vote itself.
//!
//! The payload is a JSON snapshot of the vote event (see `store::VoteEvent`).
//! Keyed by session code rather than a foreign key so backup rows outlive any
//! administrative removal of the session.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "backup")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub session_code: String,
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub ts: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
