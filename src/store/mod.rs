//! Record store boundary.
//!
//! Everything the core reads or writes goes through [`BudgetStore`], a typed
//! query/insert/upsert/patch/delete interface over the four collections
//! (`transactions`, `monthly_allocations`, `monthly_snapshots`, `profiles`).
//! [`SqlStore`] is the `SeaORM` implementation used by the application;
//! [`MemoryStore`] is an in-memory fake with the same semantics for tests.
//!
//! Upserts (`put_*`) overwrite on key collision and never duplicate.
//! [`BudgetStore::commit_rollover`] writes a snapshot and an allocation as one
//! unit: either both land or neither does.

pub mod memory;
pub mod sql;

pub use memory::MemoryStore;
pub use sql::SqlStore;

use crate::{
    core::aggregate::CategoryTotals,
    entities::{Category, TransactionType, monthly_allocation, monthly_snapshot, profile, transaction},
    errors::Result,
};
use chrono::NaiveDate;
use std::future::Future;

/// Fields of a transaction about to be inserted. `id` and `created_at` are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Owning user
    pub user_id: String,
    /// Non-negative amount
    pub amount: f64,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Spending bucket, or [`Category::Income`] for income
    pub category: Option<Category>,
    /// Date the transaction applies to
    pub date: NaiveDate,
    /// Free-form description
    pub description: String,
}

/// Partial update of a transaction; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    /// New amount
    pub amount: Option<f64>,
    /// New type
    pub transaction_type: Option<TransactionType>,
    /// New category; `Some(None)` clears it
    pub category: Option<Option<Category>>,
    /// New date
    pub date: Option<NaiveDate>,
    /// New description
    pub description: Option<String>,
}

/// Query over one user's transactions. Results are ordered newest first
/// (date descending, then id descending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Owning user
    pub user_id: String,
    /// Inclusive lower bound on `date`
    pub from: Option<NaiveDate>,
    /// Exclusive upper bound on `date`
    pub until: Option<NaiveDate>,
    /// Only this category
    pub category: Option<Category>,
    /// Only this type
    pub transaction_type: Option<TransactionType>,
    /// Maximum number of rows
    pub limit: Option<u64>,
}

impl TransactionFilter {
    /// All transactions of `user_id`.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            from: None,
            until: None,
            category: None,
            transaction_type: None,
            limit: None,
        }
    }

    /// Restricts to `[from, until)`.
    #[must_use]
    pub fn between(mut self, from: NaiveDate, until: NaiveDate) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }

    /// Restricts to one category.
    #[must_use]
    pub fn in_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Restricts to one transaction type.
    #[must_use]
    pub fn of_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Caps the number of rows returned.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `tx` satisfies every condition except the limit.
    #[must_use]
    pub fn matches(&self, tx: &transaction::Model) -> bool {
        tx.user_id == self.user_id
            && self.from.is_none_or(|from| tx.date >= from)
            && self.until.is_none_or(|until| tx.date < until)
            && self.category.is_none_or(|c| tx.category() == Some(c))
            && self.transaction_type.is_none_or(|t| tx.kind() == Some(t))
    }
}

/// Allocation to upsert, keyed by `(user_id, month)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAllocation {
    /// Owning user
    pub user_id: String,
    /// First day of the month
    pub month: NaiveDate,
    /// Needs budget
    pub needs_budget: f64,
    /// Wants budget
    pub wants_budget: f64,
    /// Savings budget
    pub savings_budget: f64,
    /// Spend already recorded this month
    pub spent: CategoryTotals,
}

/// Snapshot to upsert, keyed by `(user_id, month, year)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    /// Owning user
    pub user_id: String,
    /// Month number, 1-12
    pub month: i32,
    /// Calendar year
    pub year: i32,
    /// Needs spend
    pub needs_balance: f64,
    /// Wants spend
    pub wants_balance: f64,
    /// Savings spend
    pub savings_balance: f64,
    /// Income total
    pub total_income: f64,
    /// Expense total
    pub total_expenses: f64,
}

/// Profile to create on first login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    /// User ID, doubles as the profile key
    pub id: String,
    /// Display name
    pub full_name: Option<String>,
    /// Avatar path or URL
    pub avatar: Option<String>,
    /// Currency code
    pub preferred_currency: String,
}

/// Partial update of a profile; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    /// New display name
    pub full_name: Option<String>,
    /// New avatar
    pub avatar: Option<String>,
    /// New currency code
    pub preferred_currency: Option<String>,
}

/// Typed access to the external record store.
///
/// Every call is an asynchronous round trip. Implementations must be safe to
/// share between tasks.
pub trait BudgetStore: Send + Sync {
    /// Inserts a transaction and returns the persisted row.
    fn insert_transaction(
        &self,
        new: NewTransaction,
    ) -> impl Future<Output = Result<transaction::Model>> + Send;

    /// Looks a transaction up by ID.
    fn find_transaction(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<transaction::Model>>> + Send;

    /// Lists transactions matching `filter`, newest first.
    fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> impl Future<Output = Result<Vec<transaction::Model>>> + Send;

    /// Applies `patch` to a transaction.
    ///
    /// # Errors
    /// [`crate::errors::Error::NotFound`] when no transaction has this ID.
    fn update_transaction(
        &self,
        id: i64,
        patch: TransactionPatch,
    ) -> impl Future<Output = Result<transaction::Model>> + Send;

    /// Deletes a transaction. Returns whether a row was removed.
    fn delete_transaction(&self, id: i64) -> impl Future<Output = Result<bool>> + Send;

    /// The allocation with the latest month for `user_id`.
    fn latest_allocation(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<monthly_allocation::Model>>> + Send;

    /// The allocation for `(user_id, month)`.
    fn find_allocation(
        &self,
        user_id: &str,
        month: NaiveDate,
    ) -> impl Future<Output = Result<Option<monthly_allocation::Model>>> + Send;

    /// Inserts or overwrites the allocation for `(user_id, month)`.
    fn put_allocation(
        &self,
        new: NewAllocation,
    ) -> impl Future<Output = Result<monthly_allocation::Model>> + Send;

    /// Overwrites the `spent_*` columns of an allocation. Returns `None` when
    /// the user has no allocation for `month`.
    fn set_spending(
        &self,
        user_id: &str,
        month: NaiveDate,
        spent: CategoryTotals,
    ) -> impl Future<Output = Result<Option<monthly_allocation::Model>>> + Send;

    /// The snapshot for `(user_id, month, year)`.
    fn find_snapshot(
        &self,
        user_id: &str,
        month: i32,
        year: i32,
    ) -> impl Future<Output = Result<Option<monthly_snapshot::Model>>> + Send;

    /// All snapshots of `user_id`, oldest first.
    fn list_snapshots(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<monthly_snapshot::Model>>> + Send;

    /// Inserts or overwrites the snapshot for `(user_id, month, year)`.
    fn put_snapshot(
        &self,
        new: NewSnapshot,
    ) -> impl Future<Output = Result<monthly_snapshot::Model>> + Send;

    /// Upserts an optional snapshot and an allocation atomically.
    fn commit_rollover(
        &self,
        snapshot: Option<NewSnapshot>,
        allocation: NewAllocation,
    ) -> impl Future<
        Output = Result<(Option<monthly_snapshot::Model>, monthly_allocation::Model)>,
    > + Send;

    /// The profile of `user_id`.
    fn find_profile(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<profile::Model>>> + Send;

    /// Creates a profile.
    ///
    /// # Errors
    /// [`crate::errors::Error::ConstraintViolation`] when the profile exists.
    fn insert_profile(
        &self,
        new: NewProfile,
    ) -> impl Future<Output = Result<profile::Model>> + Send;

    /// Applies `patch` to a profile.
    ///
    /// # Errors
    /// [`crate::errors::Error::NotFound`] when the profile does not exist.
    fn update_profile(
        &self,
        user_id: &str,
        patch: ProfilePatch,
    ) -> impl Future<Output = Result<profile::Model>> + Send;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::Utc;

    fn tx(user: &str, date: NaiveDate, kind: &str, category: Option<&str>) -> transaction::Model {
        transaction::Model {
            id: 1,
            user_id: user.to_string(),
            amount: 10.0,
            transaction_type: kind.to_string(),
            category: category.map(str::to_string),
            date,
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_matches_half_open_range() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let filter = TransactionFilter::for_user("u1").between(from, until);

        assert!(filter.matches(&tx("u1", from, "expense", Some("needs"))));
        assert!(filter.matches(&tx(
            "u1",
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            "income",
            Some("income")
        )));
        assert!(!filter.matches(&tx("u1", until, "expense", Some("needs"))));
        assert!(!filter.matches(&tx("u2", from, "expense", Some("needs"))));
    }

    #[test]
    fn test_filter_matches_category_and_type() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let filter = TransactionFilter::for_user("u1")
            .in_category(Category::Wants)
            .of_type(TransactionType::Expense);

        assert!(filter.matches(&tx("u1", date, "expense", Some("wants"))));
        assert!(!filter.matches(&tx("u1", date, "expense", Some("needs"))));
        assert!(!filter.matches(&tx("u1", date, "expense", None)));
        assert!(!filter.matches(&tx("u1", date, "income", Some("wants"))));
    }
}
