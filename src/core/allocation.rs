//! The 50/30/20 allocation rule and spend tracking.
//!
//! Budgets are a fixed split of income: half to needs, 30% to wants, 20% to
//! savings. The split is not configurable.
//!
//! Spend is always derived from transactions. The `spent_*` columns on an
//! allocation are a cache that [`refresh_spending`] recomputes from the
//! month's transactions whenever one of them changes, and [`budget_status`]
//! reads live totals rather than the cache.

use crate::{
    core::{
        aggregate::{CategoryTotals, MonthlyTotals, aggregate},
        period::MonthWindow,
    },
    entities::{Category, monthly_allocation},
    errors::{Error, Result},
    store::{BudgetStore, NewAllocation, TransactionFilter},
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Share of income assigned to each bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendingRules {
    /// Needs share
    pub needs: f64,
    /// Wants share
    pub wants: f64,
    /// Savings share
    pub savings: f64,
}

/// The fixed 50/30/20 split.
pub const SPENDING_RULES: SpendingRules = SpendingRules {
    needs: 0.5,
    wants: 0.3,
    savings: 0.2,
};

/// Budget amounts per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Budgets {
    /// Needs budget
    pub needs: f64,
    /// Wants budget
    pub wants: f64,
    /// Savings budget
    pub savings: f64,
}

/// Splits `income` by [`SPENDING_RULES`].
#[must_use]
pub fn split_income(income: f64) -> Budgets {
    Budgets {
        needs: income * SPENDING_RULES.needs,
        wants: income * SPENDING_RULES.wants,
        savings: income * SPENDING_RULES.savings,
    }
}

/// Allocation for `month` seeded from `income`, with spend counters at zero.
#[must_use]
pub fn new_allocation(user_id: &str, month: MonthWindow, income: f64) -> NewAllocation {
    let budgets = split_income(income);
    NewAllocation {
        user_id: user_id.to_string(),
        month: month.start(),
        needs_budget: budgets.needs,
        wants_budget: budgets.wants,
        savings_budget: budgets.savings,
        spent: CategoryTotals::default(),
    }
}

/// The allocation for the month containing `today`, if one exists.
pub async fn get_current_allocation<S>(
    store: &S,
    user_id: &str,
    today: NaiveDate,
) -> Result<Option<monthly_allocation::Model>>
where
    S: BudgetStore,
{
    store
        .find_allocation(user_id, MonthWindow::containing(today).start())
        .await
}

/// Sets this month's budgets from an explicitly supplied income, replacing
/// any existing allocation for the month. Spend is carried over from the
/// month's transactions.
///
/// # Errors
/// [`Error::Validation`] when `income` is negative or not finite.
pub async fn initialize_monthly_budget<S>(
    store: &S,
    user_id: &str,
    income: f64,
    today: NaiveDate,
) -> Result<monthly_allocation::Model>
where
    S: BudgetStore,
{
    if !income.is_finite() || income < 0.0 {
        return Err(Error::validation(format!(
            "Income must be a non-negative number, got {income}"
        )));
    }

    let month = MonthWindow::containing(today);
    let totals = month_totals(store, user_id, month).await?;

    let mut allocation = new_allocation(user_id, month, income);
    allocation.spent = totals.spent;

    let result = store.put_allocation(allocation).await?;
    debug!("Initialized {month} budget for {user_id} from income {income:.2}");
    Ok(result)
}

/// Recomputes the `spent_*` cache of the allocation for `month` from its
/// transactions. Returns `None` when the user has no allocation that month.
pub async fn refresh_spending<S>(
    store: &S,
    user_id: &str,
    month: MonthWindow,
) -> Result<Option<monthly_allocation::Model>>
where
    S: BudgetStore,
{
    let totals = month_totals(store, user_id, month).await?;
    store
        .set_spending(user_id, month.start(), totals.spent)
        .await
}

/// Aggregates the user's transactions dated within `month`.
pub async fn month_totals<S>(store: &S, user_id: &str, month: MonthWindow) -> Result<MonthlyTotals>
where
    S: BudgetStore,
{
    let filter = TransactionFilter::for_user(user_id).between(month.start(), month.end());
    let transactions = store.list_transactions(&filter).await?;
    Ok(aggregate(&transactions))
}

/// Budget versus spend for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryStatus {
    /// The bucket
    pub category: Category,
    /// Budgeted amount
    pub budget: f64,
    /// Amount spent
    pub spent: f64,
    /// `budget - spent`, negative when overspent
    pub remaining: f64,
    /// Spent as a percentage of budget, 0 when the budget is 0
    pub percent_used: f64,
    /// Spend exceeds the budget
    pub over_budget: bool,
}

impl CategoryStatus {
    fn new(category: Category, budget: f64, spent: f64) -> Self {
        Self {
            category,
            budget,
            spent,
            remaining: budget - spent,
            percent_used: if budget > 0.0 {
                spent / budget * 100.0
            } else {
                0.0
            },
            over_budget: spent > budget,
        }
    }
}

/// A month's allocation with live spend per bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    /// The allocation the status is computed against
    pub allocation: monthly_allocation::Model,
    /// Live totals for the allocation's month
    pub totals: MonthlyTotals,
    /// Needs, wants, savings, in that order
    pub categories: Vec<CategoryStatus>,
}

impl BudgetStatus {
    /// Status of one bucket.
    #[must_use]
    pub fn category(&self, category: Category) -> Option<&CategoryStatus> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Computes [`BudgetStatus`] for `allocation`, reading spend from the
/// transactions of its month.
pub async fn budget_status<S>(
    store: &S,
    allocation: monthly_allocation::Model,
) -> Result<BudgetStatus>
where
    S: BudgetStore,
{
    let month = MonthWindow::containing(allocation.month);
    let totals = month_totals(store, &allocation.user_id, month).await?;

    let categories = Category::BUDGETED
        .into_iter()
        .map(|c| CategoryStatus::new(c, allocation.budget_for(c), totals.spent.get(c)))
        .collect();

    Ok(BudgetStatus {
        allocation,
        totals,
        categories,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::*;

    #[test]
    fn test_split_income_exact() {
        let budgets = split_income(1000.0);
        assert_eq!(budgets.needs, 500.0);
        assert_eq!(budgets.wants, 300.0);
        assert_eq!(budgets.savings, 200.0);
    }

    #[test]
    fn test_split_zero_income() {
        assert_eq!(split_income(0.0), Budgets::default());
    }

    #[test]
    fn test_rules_sum_to_one() {
        let sum = SPENDING_RULES.needs + SPENDING_RULES.wants + SPENDING_RULES.savings;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_initialize_monthly_budget_upserts() -> Result<()> {
        let store = MemoryStore::new();
        let today = date(2024, 3, 10);

        add_expense(&store, "u1", 120.0, Category::Needs, date(2024, 3, 2)).await?;

        let first = initialize_monthly_budget(&store, "u1", 2000.0, today).await?;
        assert_eq!(first.month, date(2024, 3, 1));
        assert_eq!(first.needs_budget, 1000.0);
        assert_eq!(first.spent_needs, 120.0);

        let second = initialize_monthly_budget(&store, "u1", 1000.0, today).await?;
        assert_eq!(second.id, first.id);
        assert_eq!(second.wants_budget, 300.0);
        assert_eq!(store.allocation_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_initialize_monthly_budget_rejects_bad_income() {
        let store = MemoryStore::new();
        for income in [-1.0, f64::NAN, f64::INFINITY] {
            let result = initialize_monthly_budget(&store, "u1", income, date(2024, 3, 1)).await;
            assert!(matches!(result, Err(Error::Validation { .. })));
        }
    }

    #[tokio::test]
    async fn test_refresh_spending_recomputes_from_transactions() -> Result<()> {
        let store = MemoryStore::new();
        let march = MonthWindow::containing(date(2024, 3, 1));

        assert!(refresh_spending(&store, "u1", march).await?.is_none());

        store.put_allocation(new_allocation("u1", march, 1000.0)).await?;
        add_expense(&store, "u1", 40.0, Category::Wants, date(2024, 3, 5)).await?;
        add_expense(&store, "u1", 60.0, Category::Wants, date(2024, 3, 6)).await?;
        add_expense(&store, "u1", 70.0, Category::Wants, date(2024, 4, 1)).await?;

        let refreshed = refresh_spending(&store, "u1", march).await?.unwrap();
        assert_eq!(refreshed.spent_wants, 100.0);
        assert_eq!(refreshed.spent_needs, 0.0);

        // Running it again gives the same numbers, nothing accumulates
        let again = refresh_spending(&store, "u1", march).await?.unwrap();
        assert_eq!(again.spent_wants, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_status_zero_budget_is_over_budget() -> Result<()> {
        let store = MemoryStore::new();
        let march = MonthWindow::containing(date(2024, 3, 1));
        let allocation = store.put_allocation(new_allocation("u1", march, 0.0)).await?;
        add_expense(&store, "u1", 25.0, Category::Needs, date(2024, 3, 9)).await?;

        let status = budget_status(&store, allocation).await?;
        let needs = status.category(Category::Needs).unwrap();
        assert_eq!(needs.budget, 0.0);
        assert_eq!(needs.spent, 25.0);
        assert_eq!(needs.remaining, -25.0);
        assert_eq!(needs.percent_used, 0.0);
        assert!(needs.over_budget);

        let wants = status.category(Category::Wants).unwrap();
        assert!(!wants.over_budget);
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_status_reads_live_spend() -> Result<()> {
        let store = MemoryStore::new();
        let march = MonthWindow::containing(date(2024, 3, 1));
        // Cache deliberately stale: no refresh after the expense
        let allocation = store.put_allocation(new_allocation("u1", march, 1000.0)).await?;
        add_expense(&store, "u1", 250.0, Category::Needs, date(2024, 3, 9)).await?;

        let status = budget_status(&store, allocation).await?;
        let needs = status.category(Category::Needs).unwrap();
        assert_eq!(needs.spent, 250.0);
        assert_eq!(needs.remaining, 250.0);
        assert_eq!(needs.percent_used, 50.0);
        assert_eq!(status.categories.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_current_allocation() -> Result<()> {
        let store = MemoryStore::new();
        let today = date(2024, 3, 20);
        assert!(get_current_allocation(&store, "u1", today).await?.is_none());

        store
            .put_allocation(new_allocation("u1", MonthWindow::containing(today), 10.0))
            .await?;
        assert!(get_current_allocation(&store, "u1", today).await?.is_some());
        assert!(
            get_current_allocation(&store, "u1", date(2024, 4, 1))
                .await?
                .is_none()
        );
        Ok(())
    }
}
