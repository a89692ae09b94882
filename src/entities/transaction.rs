//! Transaction entity - Represents every income or expense a user logs.
//!
//! Each transaction has an owning `user_id`, a non-negative `amount`, a
//! `transaction_type` (`"income"` / `"expense"`), an optional spending
//! `category`, and the calendar `date` it applies to. The type and category are
//! stored as lowercase strings; [`TransactionType`] and [`Category`] are the
//! typed views used by the business logic.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Auth-provider user ID that owns this transaction
    pub user_id: String,
    /// Transaction amount, always non-negative; the type carries the sign
    pub amount: f64,
    /// `"income"` or `"expense"`
    pub transaction_type: String,
    /// `"needs"`, `"wants"`, `"savings"`, `"income"`, or none
    pub category: Option<String>,
    /// Calendar date the transaction applies to
    pub date: Date,
    /// Human-readable description of the transaction
    pub description: String,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// `Transaction` is owned by a user but has no modelled relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Typed view of `transaction_type`, `None` for unrecognised values.
    #[must_use]
    pub fn kind(&self) -> Option<TransactionType> {
        self.transaction_type.parse().ok()
    }

    /// Typed view of `category`, `None` when absent or unrecognised.
    #[must_use]
    pub fn category(&self) -> Option<Category> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    /// Amount with the sign implied by the type: income positive, expense negative.
    #[must_use]
    pub fn signed_amount(&self) -> f64 {
        match self.kind() {
            Some(TransactionType::Income) => self.amount,
            Some(TransactionType::Expense) => -self.amount,
            None => 0.0,
        }
    }
}

/// Direction of money flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
}

impl TransactionType {
    /// Lowercase storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(crate::errors::Error::validation(format!(
                "Unknown transaction type '{other}'"
            ))),
        }
    }
}

/// Classification of a transaction. Expenses are one of the three budget
/// buckets; income rows carry [`Category::Income`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Essentials (50% of income)
    Needs,
    /// Discretionary spending (30% of income)
    Wants,
    /// Saved or invested (20% of income)
    Savings,
    /// Marks income rows
    Income,
}

impl Category {
    /// The three budget buckets, in display order.
    pub const BUDGETED: [Self; 3] = [Self::Needs, Self::Wants, Self::Savings];

    /// Lowercase storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Needs => "needs",
            Self::Wants => "wants",
            Self::Savings => "savings",
            Self::Income => "income",
        }
    }

    /// Whether this category has a budget line on the monthly allocation.
    #[must_use]
    pub const fn is_budgeted(self) -> bool {
        !matches!(self, Self::Income)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "needs" => Ok(Self::Needs),
            "wants" => Ok(Self::Wants),
            "savings" => Ok(Self::Savings),
            "income" => Ok(Self::Income),
            other => Err(crate::errors::Error::validation(format!(
                "Unknown category '{other}'"
            ))),
        }
    }
}
