//! Monthly snapshot entity - Historical summary of a closed month.
//!
//! Written by the rollover when a month is closed out. `(user_id, month, year)`
//! is unique; re-running the rollover for the same month overwrites the row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Monthly snapshot database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_snapshots")]
pub struct Model {
    /// Unique identifier for the snapshot
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: String,
    /// Calendar month number, 1-12
    pub month: i32,
    /// Calendar year
    pub year: i32,
    /// Total spent on needs during the month
    pub needs_balance: f64,
    /// Total spent on wants during the month
    pub wants_balance: f64,
    /// Total spent on savings during the month
    pub savings_balance: f64,
    /// Total income received during the month
    pub total_income: f64,
    /// Total expenses during the month, categorised or not
    pub total_expenses: f64,
    /// When the snapshot was (last) written
    pub created_at: DateTimeUtc,
}

/// `MonthlySnapshot` has no modelled relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
