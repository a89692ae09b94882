//! Shared test utilities for the finance tracker.
//!
//! This module provides helpers for setting up in-memory databases and
//! recording transactions with sensible defaults.

use crate::{
    entities::{Category, TransactionType, transaction},
    errors::Result,
    store::{BudgetStore, NewTransaction, SqlStore},
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A [`SqlStore`] over a fresh in-memory database.
pub async fn setup_test_store() -> Result<SqlStore> {
    Ok(SqlStore::new(setup_test_db().await?))
}

/// Shorthand for a valid calendar date.
///
/// # Panics
/// On an impossible date; tests only.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Records an income transaction directly in the store.
pub async fn add_income<S>(
    store: &S,
    user_id: &str,
    amount: f64,
    on: NaiveDate,
) -> Result<transaction::Model>
where
    S: BudgetStore,
{
    store
        .insert_transaction(NewTransaction {
            user_id: user_id.to_string(),
            amount,
            transaction_type: TransactionType::Income,
            category: Some(Category::Income),
            date: on,
            description: "Salary".to_string(),
        })
        .await
}

/// Records an expense in `category` directly in the store.
///
/// Bypasses validation and does not touch any allocation's spend cache.
pub async fn add_expense<S>(
    store: &S,
    user_id: &str,
    amount: f64,
    category: Category,
    on: NaiveDate,
) -> Result<transaction::Model>
where
    S: BudgetStore,
{
    store
        .insert_transaction(NewTransaction {
            user_id: user_id.to_string(),
            amount,
            transaction_type: TransactionType::Expense,
            category: Some(category),
            date: on,
            description: format!("{category} expense"),
        })
        .await
}
