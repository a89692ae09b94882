//! Monthly allocation entity - One budget per user per calendar month.
//!
//! Budgets are seeded from the previous month's income using the fixed
//! 50/30/20 split. The `spent_*` columns mirror the month's expenses per
//! category and are recomputed from transactions, never incremented.
//! `(user_id, month)` is unique.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::transaction::Category;

/// Monthly allocation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_allocations")]
pub struct Model {
    /// Unique identifier for the allocation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: String,
    /// First day of the month this allocation covers
    pub month: Date,
    /// Budget for needs (50% of income)
    pub needs_budget: f64,
    /// Budget for wants (30% of income)
    pub wants_budget: f64,
    /// Budget for savings (20% of income)
    pub savings_budget: f64,
    /// Expenses recorded against needs this month
    pub spent_needs: f64,
    /// Expenses recorded against wants this month
    pub spent_wants: f64,
    /// Expenses recorded against savings this month
    pub spent_savings: f64,
    /// When the allocation was first written
    pub created_at: DateTimeUtc,
    /// When the allocation was last written
    pub updated_at: DateTimeUtc,
}

/// `MonthlyAllocation` has no modelled relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Budget line for a category; income has none.
    #[must_use]
    pub const fn budget_for(&self, category: Category) -> f64 {
        match category {
            Category::Needs => self.needs_budget,
            Category::Wants => self.wants_budget,
            Category::Savings => self.savings_budget,
            Category::Income => 0.0,
        }
    }

    /// Recorded spend for a category; income has none.
    #[must_use]
    pub const fn spent_for(&self, category: Category) -> f64 {
        match category {
            Category::Needs => self.spent_needs,
            Category::Wants => self.spent_wants,
            Category::Savings => self.spent_savings,
            Category::Income => 0.0,
        }
    }
}
