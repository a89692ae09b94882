//! Aggregation of transactions into monthly totals.
//!
//! Pure functions only. Amounts are summed as given; negative or non-finite
//! amounts are not rejected here, validation happens when transactions are
//! created (see [`crate::core::transaction::validate_transaction_input`]).

use crate::{
    core::period::MonthWindow,
    entities::{Category, TransactionType, transaction},
};
use serde::Serialize;

/// Expense totals per budget bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    /// Spent on needs
    pub needs: f64,
    /// Spent on wants
    pub wants: f64,
    /// Spent on savings
    pub savings: f64,
}

impl CategoryTotals {
    /// Total for one category; income has no bucket and reads as zero.
    #[must_use]
    pub const fn get(&self, category: Category) -> f64 {
        match category {
            Category::Needs => self.needs,
            Category::Wants => self.wants,
            Category::Savings => self.savings,
            Category::Income => 0.0,
        }
    }

    /// Sum across the three buckets.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.needs + self.wants + self.savings
    }

    fn add(&mut self, category: Category, amount: f64) {
        match category {
            Category::Needs => self.needs += amount,
            Category::Wants => self.wants += amount,
            Category::Savings => self.savings += amount,
            Category::Income => {}
        }
    }
}

/// Income, expenses, and per-category spend over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// Sum of income amounts
    pub total_income: f64,
    /// Sum of expense amounts, categorised or not
    pub total_expenses: f64,
    /// Expense amounts split by category
    pub spent: CategoryTotals,
}

impl MonthlyTotals {
    /// Income minus expenses.
    #[must_use]
    pub fn net(&self) -> f64 {
        self.total_income - self.total_expenses
    }
}

/// Sums `transactions` into [`MonthlyTotals`].
///
/// Rows with an unrecognised type are ignored. Expenses without a budget
/// category count toward `total_expenses` only.
pub fn aggregate<'a, I>(transactions: I) -> MonthlyTotals
where
    I: IntoIterator<Item = &'a transaction::Model>,
{
    transactions
        .into_iter()
        .fold(MonthlyTotals::default(), |mut totals, tx| {
            match tx.kind() {
                Some(TransactionType::Income) => totals.total_income += tx.amount,
                Some(TransactionType::Expense) => {
                    totals.total_expenses += tx.amount;
                    if let Some(category) = tx.category() {
                        totals.spent.add(category, tx.amount);
                    }
                }
                None => {}
            }
            totals
        })
}

/// Like [`aggregate`], restricted to transactions dated inside `window`.
pub fn aggregate_month<'a, I>(transactions: I, window: MonthWindow) -> MonthlyTotals
where
    I: IntoIterator<Item = &'a transaction::Model>,
{
    aggregate(
        transactions
            .into_iter()
            .filter(|tx| window.contains(tx.date)),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn tx(kind: &str, category: Option<&str>, amount: f64, day: u32) -> transaction::Model {
        transaction::Model {
            id: i64::from(day),
            user_id: "user1".to_string(),
            amount,
            transaction_type: kind.to_string(),
            category: category.map(str::to_string),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            description: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<transaction::Model> {
        vec![
            tx("income", Some("income"), 3000.0, 1),
            tx("income", Some("income"), 250.5, 2),
            tx("expense", Some("needs"), 1200.0, 3),
            tx("expense", Some("needs"), 80.25, 4),
            tx("expense", Some("wants"), 300.0, 5),
            tx("expense", Some("savings"), 500.0, 6),
            tx("expense", None, 40.0, 7),
        ]
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let totals = aggregate(&[]);
        assert_eq!(totals, MonthlyTotals::default());
        assert_eq!(totals.total_income, 0.0);
        assert_eq!(totals.total_expenses, 0.0);
        assert_eq!(totals.spent.total(), 0.0);
        assert_eq!(totals.net(), 0.0);
    }

    #[test]
    fn test_sums_by_type_and_category() {
        let totals = aggregate(&sample());

        assert_eq!(totals.total_income, 3250.5);
        assert_eq!(totals.total_expenses, 2120.25);
        assert_eq!(totals.spent.needs, 1280.25);
        assert_eq!(totals.spent.wants, 300.0);
        assert_eq!(totals.spent.savings, 500.0);
        assert_eq!(totals.spent.get(Category::Income), 0.0);
    }

    #[test]
    fn test_net_matches_signed_sum() {
        let rows = sample();
        let totals = aggregate(&rows);
        let signed: f64 = rows.iter().map(transaction::Model::signed_amount).sum();

        assert!((totals.net() - signed).abs() < 1e-9);
    }

    #[test]
    fn test_uncategorised_expense_counts_only_in_total() {
        let totals = aggregate(&[tx("expense", None, 40.0, 1)]);
        assert_eq!(totals.total_expenses, 40.0);
        assert_eq!(totals.spent.total(), 0.0);
    }

    #[test]
    fn test_income_with_budget_category_is_not_spend() {
        let totals = aggregate(&[tx("income", Some("savings"), 100.0, 1)]);
        assert_eq!(totals.total_income, 100.0);
        assert_eq!(totals.spent.savings, 0.0);
    }

    #[test]
    fn test_unknown_type_ignored() {
        let totals = aggregate(&[tx("transfer", Some("needs"), 100.0, 1)]);
        assert_eq!(totals, MonthlyTotals::default());
    }

    #[test]
    fn test_aggregate_month_filters_dates() {
        let mut rows = sample();
        let mut april = tx("income", Some("income"), 999.0, 1);
        april.date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        rows.push(april);

        let march = MonthWindow::containing(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let totals = aggregate_month(&rows, march);
        assert_eq!(totals.total_income, 3250.5);
    }
}
