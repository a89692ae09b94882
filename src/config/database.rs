//! Database configuration module for the finance tracker.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. The uniqueness rules the rollover depends on (one allocation per
//! user and month, one snapshot per user, month and year) are added as unique
//! indexes on top of the generated tables.

use crate::entities::{
    MonthlyAllocation, MonthlyAllocationColumn, MonthlySnapshot, MonthlySnapshotColumn, Profile,
    Transaction, TransactionColumn,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use std::path::Path;
use tracing::{debug, info};

/// Fallback used when neither `DATABASE_URL` nor config.toml names a database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/finance_tracker.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling
/// back to `configured` and then to [`DEFAULT_DATABASE_URL`].
#[must_use]
pub fn get_database_url(configured: Option<&str>) -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first, since
/// `mode=rwc` creates the file but not its directory.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(database_url) {
        std::fs::create_dir_all(dir)?;
    }

    debug!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let rest = database_url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next()?;
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

/// Creates all tables and unique indexes if they do not exist yet.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, MonthlyAllocation).await?;
    create_table(db, &schema, MonthlySnapshot).await?;
    create_table(db, &schema, Profile).await?;

    let transactions_by_user = Index::create()
        .name("idx_transactions_user_date")
        .table(Transaction)
        .col(TransactionColumn::UserId)
        .col(TransactionColumn::Date)
        .if_not_exists()
        .to_owned();

    let allocation_key = Index::create()
        .name("idx_monthly_allocations_user_month")
        .table(MonthlyAllocation)
        .col(MonthlyAllocationColumn::UserId)
        .col(MonthlyAllocationColumn::Month)
        .unique()
        .if_not_exists()
        .to_owned();

    let snapshot_key = Index::create()
        .name("idx_monthly_snapshots_user_month_year")
        .table(MonthlySnapshot)
        .col(MonthlySnapshotColumn::UserId)
        .col(MonthlySnapshotColumn::Month)
        .col(MonthlySnapshotColumn::Year)
        .unique()
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&transactions_by_user)).await?;
    db.execute(builder.build(&allocation_key)).await?;
    db.execute(builder.build(&snapshot_key)).await?;

    info!("Database schema is ready");
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    let builder = db.get_database_backend();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}
