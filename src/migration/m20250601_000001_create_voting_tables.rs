//! Initial schema: sessions, candidates, devices, votes, backups, audit.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Session::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Session::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Session::ClassName).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Session::Code)
                            .string_len(16)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Session::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Session::StartTs)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Session::EndTs).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_session_code")
                    .table(Session::Table)
                    .col(Session::Code)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Candidate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Candidate::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Candidate::SessionId).integer().not_null())
                    .col(ColumnDef::new(Candidate::Name).string_len(128).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_candidate_session")
                            .from(Candidate::Table, Candidate::SessionId)
                            .to(Session::Table, Session::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Device::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Device::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Device::DeviceId).string_len(128).not_null())
                    .col(ColumnDef::new(Device::SessionId).integer().not_null())
                    .col(
                        ColumnDef::new(Device::JoinedTs)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_session")
                            .from(Device::Table, Device::SessionId)
                            .to(Session::Table, Session::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_device_device_id")
                    .table(Device::Table)
                    .col(Device::DeviceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::SessionId).integer().not_null())
                    .col(ColumnDef::new(Vote::CandidateId).integer().not_null())
                    .col(ColumnDef::new(Vote::DeviceId).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Vote::Ts)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_session")
                            .from(Vote::Table, Vote::SessionId)
                            .to(Session::Table, Session::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_candidate")
                            .from(Vote::Table, Vote::CandidateId)
                            .to(Candidate::Table, Candidate::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Backup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Backup::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Backup::SessionCode)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Backup::Payload).text().not_null())
                    .col(
                        ColumnDef::new(Backup::Ts)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_backup_session_code")
                    .table(Backup::Table)
                    .col(Backup::SessionCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Audit::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Audit::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Audit::Action).string_len(32).not_null())
                    .col(ColumnDef::new(Audit::Details).text().not_null())
                    .col(
                        ColumnDef::new(Audit::Ts)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Audit::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Backup::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Device::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Candidate::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Session::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Session {
    Table,
    Id,
    ClassName,
    Code,
    Status,
    StartTs,
    EndTs,
}

#[derive(DeriveIden)]
enum Candidate {
    Table,
    Id,
    SessionId,
    Name,
}

#[derive(DeriveIden)]
enum Device {
    Table,
    Id,
    DeviceId,
    SessionId,
    JoinedTs,
}

#[derive(DeriveIden)]
enum Vote {
    Table,
    Id,
    SessionId,
    CandidateId,
    DeviceId,
    Ts,
}

#[derive(DeriveIden)]
enum Backup {
    Table,
    Id,
    SessionCode,
    Payload,
    Ts,
}

#[derive(DeriveIden)]
enum Audit {
    Table,
    Id,
    Action,
    Details,
    Ts,
}
