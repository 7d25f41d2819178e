//! Audit entity: append-only record of state-changing operations.
//!
//! Observability only; the core never reads audit rows back.

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// The four state-changing actions the core records.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    #[sea_orm(string_value = "OPEN_SESSION")]
    OpenSession,
    #[sea_orm(string_value = "TABLET_JOIN")]
    TabletJoin,
    #[sea_orm(string_value = "VOTE")]
    Vote,
    #[sea_orm(string_value = "CLOSE_SESSION")]
    CloseSession,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "audit")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub action: AuditAction,
    #[sea_orm(column_type = "Text")]
    pub details: String,
    pub ts: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
