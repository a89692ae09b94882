//! In-memory [`BudgetStore`].
//!
//! Same observable semantics as [`super::SqlStore`]: ordering, upsert keys,
//! atomic rollover commits. All tables live behind one `RwLock`, so every call
//! sees a consistent view. Writes can be made to fail on demand to exercise
//! error paths.

use super::{
    BudgetStore, NewAllocation, NewProfile, NewSnapshot, NewTransaction, ProfilePatch,
    TransactionFilter, TransactionPatch,
};
use crate::{
    core::aggregate::CategoryTotals,
    entities::{monthly_allocation, monthly_snapshot, profile, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    transactions: Vec<transaction::Model>,
    allocations: Vec<monthly_allocation::Model>,
    snapshots: Vec<monthly_snapshot::Model>,
    profiles: Vec<profile::Model>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn upsert_allocation(&mut self, new: NewAllocation) -> monthly_allocation::Model {
        let now = Utc::now();
        if let Some(existing) = self
            .allocations
            .iter_mut()
            .find(|a| a.user_id == new.user_id && a.month == new.month)
        {
            existing.needs_budget = new.needs_budget;
            existing.wants_budget = new.wants_budget;
            existing.savings_budget = new.savings_budget;
            existing.spent_needs = new.spent.needs;
            existing.spent_wants = new.spent.wants;
            existing.spent_savings = new.spent.savings;
            existing.updated_at = now;
            return existing.clone();
        }

        let model = monthly_allocation::Model {
            id: self.next_id(),
            user_id: new.user_id,
            month: new.month,
            needs_budget: new.needs_budget,
            wants_budget: new.wants_budget,
            savings_budget: new.savings_budget,
            spent_needs: new.spent.needs,
            spent_wants: new.spent.wants,
            spent_savings: new.spent.savings,
            created_at: now,
            updated_at: now,
        };
        self.allocations.push(model.clone());
        model
    }

    fn upsert_snapshot(&mut self, new: NewSnapshot) -> monthly_snapshot::Model {
        let now = Utc::now();
        if let Some(existing) = self
            .snapshots
            .iter_mut()
            .find(|s| s.user_id == new.user_id && s.month == new.month && s.year == new.year)
        {
            existing.needs_balance = new.needs_balance;
            existing.wants_balance = new.wants_balance;
            existing.savings_balance = new.savings_balance;
            existing.total_income = new.total_income;
            existing.total_expenses = new.total_expenses;
            existing.created_at = now;
            return existing.clone();
        }

        let model = monthly_snapshot::Model {
            id: self.next_id(),
            user_id: new.user_id,
            month: new.month,
            year: new.year,
            needs_balance: new.needs_balance,
            wants_balance: new.wants_balance,
            savings_balance: new.savings_balance,
            total_income: new.total_income,
            total_expenses: new.total_expenses,
            created_at: now,
        };
        self.snapshots.push(model.clone());
        model
    }
}

/// [`BudgetStore`] that keeps every collection in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
    fail_spending_updates: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every write fails with [`Error::Unknown`] and changes nothing.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// When set, only [`BudgetStore::set_spending`] fails; every other write
    /// goes through.
    pub fn set_fail_spending_updates(&self, fail: bool) {
        self.fail_spending_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of stored allocations, across all users.
    pub async fn allocation_count(&self) -> usize {
        self.tables.read().await.allocations.len()
    }

    /// Number of stored snapshots, across all users.
    pub async fn snapshot_count(&self) -> usize {
        self.tables.read().await.snapshots.len()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Unknown {
                message: "record store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl BudgetStore for MemoryStore {
    async fn insert_transaction(&self, new: NewTransaction) -> Result<transaction::Model> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let model = transaction::Model {
            id: tables.next_id(),
            user_id: new.user_id,
            amount: new.amount,
            transaction_type: new.transaction_type.as_str().to_string(),
            category: new.category.map(|c| c.as_str().to_string()),
            date: new.date,
            description: new.description,
            created_at: Utc::now(),
        };
        tables.transactions.push(model.clone());
        Ok(model)
    }

    async fn find_transaction(&self, id: i64) -> Result<Option<transaction::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<transaction::Model>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<transaction::Model> = tables
            .transactions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }

    async fn update_transaction(&self, id: i64, patch: TransactionPatch) -> Result<transaction::Model> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let existing = tables
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::not_found("transaction", id))?;

        if let Some(amount) = patch.amount {
            existing.amount = amount;
        }
        if let Some(kind) = patch.transaction_type {
            existing.transaction_type = kind.as_str().to_string();
        }
        if let Some(category) = patch.category {
            existing.category = category.map(|c| c.as_str().to_string());
        }
        if let Some(date) = patch.date {
            existing.date = date;
        }
        if let Some(description) = patch.description {
            existing.description = description;
        }
        Ok(existing.clone())
    }

    async fn delete_transaction(&self, id: i64) -> Result<bool> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let before = tables.transactions.len();
        tables.transactions.retain(|t| t.id != id);
        Ok(tables.transactions.len() < before)
    }

    async fn latest_allocation(&self, user_id: &str) -> Result<Option<monthly_allocation::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .allocations
            .iter()
            .filter(|a| a.user_id == user_id)
            .max_by(|a, b| a.month.cmp(&b.month).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn find_allocation(
        &self,
        user_id: &str,
        month: NaiveDate,
    ) -> Result<Option<monthly_allocation::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .allocations
            .iter()
            .find(|a| a.user_id == user_id && a.month == month)
            .cloned())
    }

    async fn put_allocation(&self, new: NewAllocation) -> Result<monthly_allocation::Model> {
        self.check_writable()?;
        Ok(self.tables.write().await.upsert_allocation(new))
    }

    async fn set_spending(
        &self,
        user_id: &str,
        month: NaiveDate,
        spent: CategoryTotals,
    ) -> Result<Option<monthly_allocation::Model>> {
        self.check_writable()?;
        if self.fail_spending_updates.load(Ordering::SeqCst) {
            return Err(Error::Unknown {
                message: "spending update rejected".to_string(),
            });
        }
        let mut tables = self.tables.write().await;
        let Some(existing) = tables
            .allocations
            .iter_mut()
            .find(|a| a.user_id == user_id && a.month == month)
        else {
            return Ok(None);
        };

        existing.spent_needs = spent.needs;
        existing.spent_wants = spent.wants;
        existing.spent_savings = spent.savings;
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn find_snapshot(
        &self,
        user_id: &str,
        month: i32,
        year: i32,
    ) -> Result<Option<monthly_snapshot::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .snapshots
            .iter()
            .find(|s| s.user_id == user_id && s.month == month && s.year == year)
            .cloned())
    }

    async fn list_snapshots(&self, user_id: &str) -> Result<Vec<monthly_snapshot::Model>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<monthly_snapshot::Model> = tables
            .snapshots
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| (s.year, s.month));
        Ok(rows)
    }

    async fn put_snapshot(&self, new: NewSnapshot) -> Result<monthly_snapshot::Model> {
        self.check_writable()?;
        Ok(self.tables.write().await.upsert_snapshot(new))
    }

    async fn commit_rollover(
        &self,
        snapshot: Option<NewSnapshot>,
        allocation: NewAllocation,
    ) -> Result<(Option<monthly_snapshot::Model>, monthly_allocation::Model)> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let snapshot = snapshot.map(|new| tables.upsert_snapshot(new));
        let allocation = tables.upsert_allocation(allocation);
        Ok((snapshot, allocation))
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<profile::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn insert_profile(&self, new: NewProfile) -> Result<profile::Model> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.profiles.iter().any(|p| p.id == new.id) {
            return Err(Error::ConstraintViolation {
                message: format!("profile {} already exists", new.id),
            });
        }

        let now = Utc::now();
        let model = profile::Model {
            id: new.id,
            full_name: new.full_name,
            avatar: new.avatar,
            preferred_currency: new.preferred_currency,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.push(model.clone());
        Ok(model)
    }

    async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> Result<profile::Model> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let existing = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == user_id)
            .ok_or_else(|| Error::not_found("profile", user_id))?;

        if let Some(full_name) = patch.full_name {
            existing.full_name = Some(full_name);
        }
        if let Some(avatar) = patch.avatar {
            existing.avatar = Some(avatar);
        }
        if let Some(currency) = patch.preferred_currency {
            existing.preferred_currency = currency;
        }
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }
}
