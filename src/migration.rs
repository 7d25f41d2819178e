pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_voting_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    // Override the name of the migration table to avoid conflicts
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("classvote_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250601_000001_create_voting_tables::Migration)]
    }
}
