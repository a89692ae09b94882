//! Report generation business logic.
//!
//! Dashboard and analytics data: the current month at a glance, the history of
//! closed months, and how spend divides across the three buckets. Functions
//! return structured data; the text helpers at the bottom render it for
//! terminal or log output.

use crate::{
    core::{
        aggregate::{MonthlyTotals, aggregate},
        period::MonthWindow,
    },
    entities::{Category, monthly_allocation, monthly_snapshot, profile, transaction},
    errors::Result,
    store::{BudgetStore, TransactionFilter},
};
use chrono::NaiveDate;
use serde::Serialize;

/// Everything the dashboard shows for one user and month.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// The month summarised
    pub month: MonthWindow,
    /// Totals over the month's transactions
    pub totals: MonthlyTotals,
    /// Income minus expenses for the month
    pub balance: f64,
    /// The month's allocation, if it has been created
    pub allocation: Option<monthly_allocation::Model>,
    /// The user's profile, if it has been created
    pub profile: Option<profile::Model>,
    /// Most recent transactions of the month, newest first
    pub recent_transactions: Vec<transaction::Model>,
}

/// Builds the dashboard for the month containing `today`.
///
/// The month's transactions, allocation and profile are fetched concurrently.
/// `recent_limit` caps `recent_transactions`; the totals always cover the whole
/// month.
pub async fn dashboard_summary<S>(
    store: &S,
    user_id: &str,
    today: NaiveDate,
    recent_limit: u64,
) -> Result<DashboardSummary>
where
    S: BudgetStore,
{
    let month = MonthWindow::containing(today);
    let filter = TransactionFilter::for_user(user_id).between(month.start(), month.end());

    let (transactions, allocation, profile) = tokio::join!(
        store.list_transactions(&filter),
        store.find_allocation(user_id, month.start()),
        store.find_profile(user_id),
    );
    let (transactions, allocation, profile) = (transactions?, allocation?, profile?);

    let totals = aggregate(&transactions);
    let recent_transactions = transactions
        .into_iter()
        .take(usize::try_from(recent_limit).unwrap_or(usize::MAX))
        .collect();

    Ok(DashboardSummary {
        month,
        totals,
        balance: totals.net(),
        allocation,
        profile,
        recent_transactions,
    })
}

/// Closed months for the user, oldest first.
pub async fn monthly_history<S>(store: &S, user_id: &str) -> Result<Vec<monthly_snapshot::Model>>
where
    S: BudgetStore,
{
    store.list_snapshots(user_id).await
}

/// One bucket's part of total categorised spend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryShare {
    /// The bucket
    pub category: Category,
    /// Amount spent
    pub amount: f64,
    /// Share of categorised spend, 0-100
    pub percent: f64,
}

/// Splits categorised spend into shares per bucket, in needs, wants, savings
/// order. All shares are 0 when nothing was spent.
#[must_use]
pub fn category_distribution(totals: &MonthlyTotals) -> Vec<CategoryShare> {
    let total = totals.spent.total();

    Category::BUDGETED
        .into_iter()
        .map(|category| {
            let amount = totals.spent.get(category);
            CategoryShare {
                category,
                amount,
                percent: if total > 0.0 {
                    amount / total * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Percentage of `budget` used by `spent`.
///
/// Over 100 when overspent. A zero budget reports 0.
#[must_use]
pub fn calculate_progress(spent: f64, budget: f64) -> f64 {
    if budget == 0.0 {
        return 0.0;
    }

    (spent / budget) * 100.0
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`. The bar is
/// clamped to 0-100; the printed percentage is not.
#[must_use]
pub fn format_progress_bar(progress_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped_progress = progress_percent.clamp(0.0, 100.0);

    // clamped_progress is in [0, 100] and length is small, so the product fits
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped_progress / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    let filled_str = "█".repeat(filled);
    let empty_str = "░".repeat(empty);

    format!("[{filled_str}{empty_str}] {progress_percent:.1}%")
}

/// Formats an amount with an explicit sign and currency code, e.g.
/// `"+50.00 USD"` or `"-25.50 EUR"`.
#[must_use]
pub fn format_amount(amount: f64, currency: &str) -> String {
    if amount >= 0.0 {
        format!("+{amount:.2} {currency}")
    } else {
        format!("-{:.2} {currency}", amount.abs())
    }
}

/// One-line summary of a transaction.
#[must_use]
pub fn format_transaction_summary(transaction: &transaction::Model, currency: &str) -> String {
    let amount_str = format_amount(transaction.signed_amount(), currency);
    let category = transaction.category.as_deref().unwrap_or("-");

    format!(
        "{} | {amount_str} | {category} | {}",
        transaction.date, transaction.description
    )
}
