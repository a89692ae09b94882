//! Monthly rollover business logic
//!
//! Closes out the previous calendar month and opens the current one. A
//! rollover is due when the user has no allocation yet, or when their latest
//! allocation belongs to an earlier month than today's. Running one:
//!
//! 1. aggregates the previous month's transactions,
//! 2. upserts a snapshot of those totals for `(user, previous month)`,
//! 3. upserts the current month's allocation at 50/30/20 of the previous
//!    month's income, spend counters at zero,
//! 4. recomputes those counters from any transactions already dated in the
//!    current month.
//!
//! Steps 2 and 3 are committed together through
//! [`BudgetStore::commit_rollover`]. Only one step is taken: a user returning
//! after several idle months gets the month before this one snapshotted and
//! the current month opened, the months in between are not backfilled.
//!
//! [`RolloverEngine`] serialises attempts per user so two concurrent page
//! loads at a month boundary produce one rollover, not two.

use crate::{
    core::{
        aggregate::{MonthlyTotals, aggregate},
        allocation::{BudgetStatus, budget_status, new_allocation, refresh_spending},
        period::MonthWindow,
    },
    entities::{monthly_allocation, monthly_snapshot},
    errors::{Error, Result},
    store::{BudgetStore, NewSnapshot, TransactionFilter},
};
use chrono::NaiveDate;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Outcome of a rollover that actually ran.
#[derive(Debug, Clone)]
pub struct RolloverResult {
    /// User the rollover ran for
    pub user_id: String,
    /// The month that was closed out
    pub previous_month: MonthWindow,
    /// The month that was opened
    pub current_month: MonthWindow,
    /// Aggregated totals of the previous month
    pub totals: MonthlyTotals,
    /// Snapshot of the previous month, `None` when it had no activity
    pub snapshot: Option<monthly_snapshot::Model>,
    /// The current month's allocation
    pub allocation: monthly_allocation::Model,
}

/// Checks whether the user's latest allocation predates the month containing
/// `today` (or whether they have none).
///
/// # Returns
/// * `Ok(true)` - A rollover is needed
/// * `Ok(false)` - Already rolled over this month
pub async fn is_rollover_due<S>(store: &S, user_id: &str, today: NaiveDate) -> Result<bool>
where
    S: BudgetStore,
{
    let current = MonthWindow::containing(today);
    let latest = store.latest_allocation(user_id).await?;

    Ok(latest.is_none_or(|allocation| MonthWindow::containing(allocation.month) < current))
}

/// Runs the rollover into the month containing `today` unconditionally.
///
/// Idempotent: re-running for the same month with unchanged transactions
/// rewrites the same snapshot and allocation rows with the same values.
#[instrument(skip(store))]
pub async fn run_rollover<S>(store: &S, user_id: &str, today: NaiveDate) -> Result<RolloverResult>
where
    S: BudgetStore,
{
    let current_month = MonthWindow::containing(today);
    let previous_month = current_month.previous();

    let filter = TransactionFilter::for_user(user_id)
        .between(previous_month.start(), previous_month.end());
    let transactions = store.list_transactions(&filter).await?;
    let totals = aggregate(&transactions);

    // A month with neither transactions nor a budget has nothing to record
    let had_activity = !transactions.is_empty()
        || store
            .find_allocation(user_id, previous_month.start())
            .await?
            .is_some();

    let snapshot = had_activity.then(|| NewSnapshot {
        user_id: user_id.to_string(),
        month: month_number(previous_month),
        year: previous_month.year(),
        needs_balance: totals.spent.needs,
        wants_balance: totals.spent.wants,
        savings_balance: totals.spent.savings,
        total_income: totals.total_income,
        total_expenses: totals.total_expenses,
    });

    let allocation = new_allocation(user_id, current_month, totals.total_income);

    let (snapshot, allocation) = store.commit_rollover(snapshot, allocation).await?;

    // Expenses logged this month before the rollover ran still count
    let allocation = refresh_spending(store, user_id, current_month)
        .await?
        .unwrap_or(allocation);

    info!(
        "Rolled over {user_id} from {previous_month} to {current_month} (income {:.2}, snapshot: {})",
        totals.total_income,
        snapshot.is_some()
    );

    Ok(RolloverResult {
        user_id: user_id.to_string(),
        previous_month,
        current_month,
        totals,
        snapshot,
        allocation,
    })
}

/// Runs the rollover if one is due.
///
/// # Returns
/// * `Ok(Some(result))` - Rollover was performed
/// * `Ok(None)` - No rollover needed, nothing was written
pub async fn process_monthly_rollover<S>(
    store: &S,
    user_id: &str,
    today: NaiveDate,
) -> Result<Option<RolloverResult>>
where
    S: BudgetStore,
{
    if !is_rollover_due(store, user_id, today).await? {
        debug!("No rollover due for {user_id}");
        return Ok(None);
    }

    run_rollover(store, user_id, today).await.map(Some)
}

/// Formats a rollover result into a human-readable summary.
#[must_use]
pub fn format_rollover_summary(result: &RolloverResult) -> String {
    use std::fmt::Write;

    let mut summary = format!(
        "Monthly Rollover - {} -> {} - {}\n",
        result.previous_month, result.current_month, result.user_id
    );

    let totals = &result.totals;
    // write! into a String cannot fail
    let _ = writeln!(
        summary,
        "  Income: {:.2} | Expenses: {:.2} | Net: {:.2}",
        totals.total_income,
        totals.total_expenses,
        totals.net()
    );
    let _ = writeln!(
        summary,
        "  Spent - Needs: {:.2} | Wants: {:.2} | Savings: {:.2}",
        totals.spent.needs, totals.spent.wants, totals.spent.savings
    );

    let allocation = &result.allocation;
    let _ = writeln!(
        summary,
        "  New budget - Needs: {:.2} | Wants: {:.2} | Savings: {:.2}",
        allocation.needs_budget, allocation.wants_budget, allocation.savings_budget
    );

    if result.snapshot.is_none() {
        summary.push_str("  No activity last month, no snapshot recorded\n");
    }

    summary
}

fn month_number(month: MonthWindow) -> i32 {
    // 1..=12 always fits
    i32::try_from(month.month()).unwrap_or_default()
}

/// Rollover entry point shared by every caller for a store.
///
/// Holds one async lock per user; the due check and the writes run under it,
/// so a second concurrent attempt sees the first one's allocation and does
/// nothing.
#[derive(Debug)]
pub struct RolloverEngine<S> {
    store: S,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S> RolloverEngine<S>
where
    S: BudgetStore,
{
    /// Creates an engine over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    /// [`process_monthly_rollover`] under the user's lock.
    pub async fn process_monthly_rollover(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Option<RolloverResult>> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        process_monthly_rollover(&self.store, user_id, today).await
    }

    /// Returns the current month's allocation, rolling over first if due.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the user's latest allocation is dated after
    /// `today`, which leaves the current month without one.
    pub async fn ensure_current_allocation(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<monthly_allocation::Model> {
        if let Some(result) = self.process_monthly_rollover(user_id, today).await? {
            return Ok(result.allocation);
        }

        let month = MonthWindow::containing(today);
        self.store
            .find_allocation(user_id, month.start())
            .await?
            .ok_or_else(|| Error::not_found("monthly allocation", format!("{user_id} {month}")))
    }

    /// What the budget page shows: the current allocation (created on first
    /// access) with live spend per bucket.
    pub async fn budget_view(&self, user_id: &str, today: NaiveDate) -> Result<BudgetStatus> {
        let allocation = self.ensure_current_allocation(user_id, today).await?;
        budget_status(&self.store, allocation).await
    }
}
