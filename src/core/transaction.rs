//! Transaction business logic - validation, CRUD, and spend cache upkeep.
//!
//! Transactions arrive as loosely typed form input ([`TransactionInput`]) and
//! are validated into store records before anything is written. Every read and
//! write is scoped to the acting user: a transaction owned by someone else is
//! reported as not found. After each write the `spent_*` cache of the affected
//! month's allocation is recomputed from the month's transactions.

use crate::{
    core::{allocation::refresh_spending, period::MonthWindow},
    entities::{Category, TransactionType, transaction},
    errors::{Error, Result},
    store::{BudgetStore, NewTransaction, TransactionFilter, TransactionPatch},
};
use chrono::{Days, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Positive decimal with at most two fractional digits, no sign or exponent.
#[allow(clippy::expect_used)]
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d{1,2})?$").expect("amount pattern is valid"));

/// Date format accepted in [`TransactionInput::date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw transaction fields as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionInput {
    /// What the money was for
    pub description: String,
    /// Decimal amount, e.g. `"12.50"`
    pub amount: String,
    /// `"income"` or `"expense"`
    pub transaction_type: String,
    /// Budget bucket; required for expenses, ignored for income
    pub category: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
}

/// Parses a user-supplied amount.
///
/// # Errors
/// [`Error::Validation`] unless `raw` is a plain decimal with at most two
/// fractional digits, greater than zero and representable as a finite number.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let raw = raw.trim();

    if !AMOUNT_RE.is_match(raw) {
        return Err(Error::validation(format!(
            "Amount must be a number with at most two decimals, got '{raw}'"
        )));
    }

    let amount: f64 = raw
        .parse()
        .map_err(|_| Error::validation(format!("Invalid amount '{raw}'")))?;

    // Long digit strings match the pattern but overflow to infinity
    if !amount.is_finite() {
        return Err(Error::validation(format!("Amount '{raw}' is too large")));
    }

    if amount <= 0.0 {
        return Err(Error::validation("Amount must be greater than 0"));
    }

    Ok(amount)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| Error::validation(format!("Date must be YYYY-MM-DD, got '{raw}'")))
}

/// Validates `input` into a record owned by `user_id`.
///
/// Income is always filed under [`Category::Income`]. Expenses must name one of
/// needs, wants or savings.
pub fn validate_transaction_input(user_id: &str, input: &TransactionInput) -> Result<NewTransaction> {
    let description = input.description.trim();
    if description.is_empty() {
        return Err(Error::validation("Description is required"));
    }

    let amount = parse_amount(&input.amount)?;
    let date = parse_date(&input.date)?;
    let transaction_type: TransactionType = input.transaction_type.parse()?;

    let category = match transaction_type {
        TransactionType::Income => Category::Income,
        TransactionType::Expense => {
            let raw = input
                .category
                .as_deref()
                .ok_or_else(|| Error::validation("Expenses need a category"))?;
            let category: Category = raw.parse()?;
            if !category.is_budgeted() {
                return Err(Error::validation(
                    "Expense category must be needs, wants or savings",
                ));
            }
            category
        }
    };

    Ok(NewTransaction {
        user_id: user_id.to_string(),
        amount,
        transaction_type,
        category: Some(category),
        date,
        description: description.to_string(),
    })
}

/// Recomputes a month's spend cache after a write that already succeeded.
///
/// The cache is derived data, so a failure here is logged rather than turned
/// into an error for a transaction that is already persisted.
async fn refresh_after_write<S>(store: &S, user_id: &str, month: MonthWindow)
where
    S: BudgetStore,
{
    if let Err(e) = refresh_spending(store, user_id, month).await {
        warn!("Spend cache for {user_id} in {month} not refreshed: {e}");
    }
}

/// Validates and records a transaction, then refreshes the spend cache of its
/// month.
pub async fn create_transaction<S>(
    store: &S,
    user_id: &str,
    input: &TransactionInput,
) -> Result<transaction::Model>
where
    S: BudgetStore,
{
    let new = validate_transaction_input(user_id, input)?;
    let created = store.insert_transaction(new).await?;

    refresh_after_write(store, user_id, MonthWindow::containing(created.date)).await;

    info!(
        "Recorded {} of {:.2} for {user_id} on {}",
        created.transaction_type, created.amount, created.date
    );
    Ok(created)
}

/// Fetches one of the user's transactions.
///
/// # Errors
/// [`Error::NotFound`] when the ID does not exist or belongs to another user.
pub async fn get_transaction<S>(store: &S, user_id: &str, id: i64) -> Result<transaction::Model>
where
    S: BudgetStore,
{
    store
        .find_transaction(id)
        .await?
        .filter(|tx| tx.user_id == user_id)
        .ok_or_else(|| Error::not_found("transaction", id))
}

/// The user's transactions, newest first, optionally capped at `limit`.
pub async fn list_transactions<S>(
    store: &S,
    user_id: &str,
    limit: Option<u64>,
) -> Result<Vec<transaction::Model>>
where
    S: BudgetStore,
{
    let mut filter = TransactionFilter::for_user(user_id);
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }
    store.list_transactions(&filter).await
}

/// Transactions dated from `start` through `end`, both inclusive.
pub async fn list_transactions_by_period<S>(
    store: &S,
    user_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<transaction::Model>>
where
    S: BudgetStore,
{
    let until = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| Error::validation(format!("End date {end} is out of range")))?;

    store
        .list_transactions(&TransactionFilter::for_user(user_id).between(start, until))
        .await
}

/// The user's transactions in one category.
pub async fn list_transactions_by_category<S>(
    store: &S,
    user_id: &str,
    category: Category,
) -> Result<Vec<transaction::Model>>
where
    S: BudgetStore,
{
    store
        .list_transactions(&TransactionFilter::for_user(user_id).in_category(category))
        .await
}

/// Transactions in the month containing `today`.
pub async fn list_current_month_transactions<S>(
    store: &S,
    user_id: &str,
    today: NaiveDate,
) -> Result<Vec<transaction::Model>>
where
    S: BudgetStore,
{
    let month = MonthWindow::containing(today);
    store
        .list_transactions(&TransactionFilter::for_user(user_id).between(month.start(), month.end()))
        .await
}

/// Replaces every field of one of the user's transactions with validated
/// `input`. When the date moves to another month, both months' spend caches
/// are refreshed.
pub async fn update_transaction<S>(
    store: &S,
    user_id: &str,
    id: i64,
    input: &TransactionInput,
) -> Result<transaction::Model>
where
    S: BudgetStore,
{
    let existing = get_transaction(store, user_id, id).await?;
    let new = validate_transaction_input(user_id, input)?;

    let patch = TransactionPatch {
        amount: Some(new.amount),
        transaction_type: Some(new.transaction_type),
        category: Some(new.category),
        date: Some(new.date),
        description: Some(new.description),
    };
    let updated = store.update_transaction(id, patch).await?;

    let old_month = MonthWindow::containing(existing.date);
    let new_month = MonthWindow::containing(updated.date);
    refresh_after_write(store, user_id, new_month).await;
    if old_month != new_month {
        refresh_after_write(store, user_id, old_month).await;
    }

    debug!("Updated transaction {id} for {user_id}");
    Ok(updated)
}

/// Deletes one of the user's transactions and refreshes its month's spend
/// cache. Returns the deleted row.
pub async fn delete_transaction<S>(store: &S, user_id: &str, id: i64) -> Result<transaction::Model>
where
    S: BudgetStore,
{
    let existing = get_transaction(store, user_id, id).await?;

    if !store.delete_transaction(id).await? {
        return Err(Error::not_found("transaction", id));
    }

    refresh_after_write(store, user_id, MonthWindow::containing(existing.date)).await;

    info!("Deleted transaction {id} for {user_id}");
    Ok(existing)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::allocation::new_allocation;
    use crate::store::MemoryStore;
    use crate::test_utils::*;

    fn expense(amount: &str, category: &str, date: &str) -> TransactionInput {
        TransactionInput {
            description: "Groceries".to_string(),
            amount: amount.to_string(),
            transaction_type: "expense".to_string(),
            category: Some(category.to_string()),
            date: date.to_string(),
        }
    }

    fn income(amount: &str, date: &str) -> TransactionInput {
        TransactionInput {
            description: "Salary".to_string(),
            amount: amount.to_string(),
            transaction_type: "income".to_string(),
            category: None,
            date: date.to_string(),
        }
    }

    async fn with_march_allocation() -> Result<MemoryStore> {
        let store = MemoryStore::new();
        store
            .put_allocation(new_allocation(
                "u1",
                MonthWindow::containing(date(2024, 3, 1)),
                1000.0,
            ))
            .await?;
        Ok(store)
    }

    #[test]
    fn test_parse_amount_accepts_plain_decimals() -> Result<()> {
        assert_eq!(parse_amount("12")?, 12.0);
        assert_eq!(parse_amount("12.5")?, 12.5);
        assert_eq!(parse_amount(" 0.01 ")?, 0.01);
        Ok(())
    }

    #[test]
    fn test_parse_amount_rejects_bad_input() {
        for raw in ["", "0", "0.00", "-5", "1.234", "1e3", "abc", "12.", ".5", "NaN"] {
            assert!(
                matches!(parse_amount(raw), Err(Error::Validation { .. })),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn test_parse_amount_rejects_overflow_to_infinity() {
        let huge = "9".repeat(400);
        assert!(matches!(parse_amount(&huge), Err(Error::Validation { .. })));
        assert!(matches!(
            parse_amount(&format!("{huge}.99")),
            Err(Error::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_huge_income_writes_nothing() -> Result<()> {
        let store = MemoryStore::new();
        let result = create_transaction(&store, "u1", &income(&"9".repeat(400), "2024-02-05")).await;

        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(list_transactions(&store, "u1", None).await?.is_empty());
        Ok(())
    }

    #[test]
    fn test_validate_forces_income_category() -> Result<()> {
        let mut input = income("2500", "2024-03-01");
        input.category = Some("wants".to_string());

        let new = validate_transaction_input("u1", &input)?;
        assert_eq!(new.transaction_type, TransactionType::Income);
        assert_eq!(new.category, Some(Category::Income));
        assert_eq!(new.date, date(2024, 3, 1));
        Ok(())
    }

    #[test]
    fn test_validate_expense_requires_budget_category() {
        let mut input = expense("10", "needs", "2024-03-01");
        input.category = None;
        assert!(validate_transaction_input("u1", &input).is_err());

        let input = expense("10", "income", "2024-03-01");
        assert!(matches!(
            validate_transaction_input("u1", &input),
            Err(Error::Validation { .. })
        ));

        let input = expense("10", "rent", "2024-03-01");
        assert!(validate_transaction_input("u1", &input).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_description_and_bad_date() {
        let mut input = expense("10", "needs", "2024-03-01");
        input.description = "   ".to_string();
        assert!(validate_transaction_input("u1", &input).is_err());

        for bad in ["03/01/2024", "2024-02-30", ""] {
            let input = expense("10", "needs", bad);
            assert!(validate_transaction_input("u1", &input).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let mut input = expense("10", "needs", "2024-03-01");
        input.transaction_type = "transfer".to_string();
        assert!(validate_transaction_input("u1", &input).is_err());
    }

    #[tokio::test]
    async fn test_create_transaction_refreshes_spend_cache() -> Result<()> {
        let store = with_march_allocation().await?;

        create_transaction(&store, "u1", &expense("120.50", "needs", "2024-03-04")).await?;
        create_transaction(&store, "u1", &expense("30", "wants", "2024-03-05")).await?;
        create_transaction(&store, "u1", &income("900", "2024-03-06")).await?;

        let allocation = store.find_allocation("u1", date(2024, 3, 1)).await?.unwrap();
        assert_eq!(allocation.spent_needs, 120.5);
        assert_eq!(allocation.spent_for(Category::Wants), 30.0);
        assert_eq!(allocation.spent_for(Category::Savings), 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_writes_succeed_when_cache_refresh_fails() -> Result<()> {
        let store = with_march_allocation().await?;
        store.set_fail_spending_updates(true);

        let created =
            create_transaction(&store, "u1", &expense("25", "needs", "2024-03-04")).await?;
        assert_eq!(get_transaction(&store, "u1", created.id).await?.amount, 25.0);

        let updated =
            update_transaction(&store, "u1", created.id, &expense("30", "needs", "2024-03-04"))
                .await?;
        assert_eq!(updated.amount, 30.0);

        // Cache is stale but the transaction list is the source of truth
        let allocation = store.find_allocation("u1", date(2024, 3, 1)).await?.unwrap();
        assert_eq!(allocation.spent_needs, 0.0);

        delete_transaction(&store, "u1", created.id).await?;
        assert!(list_transactions(&store, "u1", None).await?.is_empty());

        // Next successful write brings the cache back in line
        store.set_fail_spending_updates(false);
        create_transaction(&store, "u1", &expense("12", "needs", "2024-03-05")).await?;
        let allocation = store.find_allocation("u1", date(2024, 3, 1)).await?.unwrap();
        assert_eq!(allocation.spent_needs, 12.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_invalid_writes_nothing() -> Result<()> {
        let store = MemoryStore::new();
        let result = create_transaction(&store, "u1", &expense("-3", "needs", "2024-03-04")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(list_transactions(&store, "u1", None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_transaction_scoped_to_owner() -> Result<()> {
        let store = MemoryStore::new();
        let tx = create_transaction(&store, "u1", &income("10", "2024-03-01")).await?;

        assert_eq!(get_transaction(&store, "u1", tx.id).await?.id, tx.id);
        assert!(matches!(
            get_transaction(&store, "u2", tx.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            get_transaction(&store, "u1", 9999).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_queries() -> Result<()> {
        let store = MemoryStore::new();
        create_transaction(&store, "u1", &expense("1", "needs", "2024-02-29")).await?;
        create_transaction(&store, "u1", &expense("2", "wants", "2024-03-01")).await?;
        create_transaction(&store, "u1", &expense("3", "needs", "2024-03-31")).await?;
        create_transaction(&store, "u1", &income("4", "2024-04-01")).await?;
        create_transaction(&store, "u2", &expense("5", "needs", "2024-03-10")).await?;

        let all = list_transactions(&store, "u1", None).await?;
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].date, date(2024, 4, 1));

        let recent = list_transactions(&store, "u1", Some(2)).await?;
        assert_eq!(recent.len(), 2);

        // Inclusive on both ends
        let period =
            list_transactions_by_period(&store, "u1", date(2024, 3, 1), date(2024, 3, 31)).await?;
        assert_eq!(period.len(), 2);

        let needs = list_transactions_by_category(&store, "u1", Category::Needs).await?;
        assert_eq!(needs.len(), 2);

        let march = list_current_month_transactions(&store, "u1", date(2024, 3, 17)).await?;
        let amounts: Vec<f64> = march.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![3.0, 2.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_moves_spend_between_months() -> Result<()> {
        let store = with_march_allocation().await?;
        store
            .put_allocation(new_allocation(
                "u1",
                MonthWindow::containing(date(2024, 4, 1)),
                1000.0,
            ))
            .await?;

        let tx = create_transaction(&store, "u1", &expense("80", "wants", "2024-03-20")).await?;
        let updated =
            update_transaction(&store, "u1", tx.id, &expense("95", "savings", "2024-04-02")).await?;

        assert_eq!(updated.amount, 95.0);
        assert_eq!(updated.category(), Some(Category::Savings));

        let march = store.find_allocation("u1", date(2024, 3, 1)).await?.unwrap();
        let april = store.find_allocation("u1", date(2024, 4, 1)).await?.unwrap();
        assert_eq!(march.spent_wants, 0.0);
        assert_eq!(april.spent_savings, 95.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_other_users_transaction_is_not_found() -> Result<()> {
        let store = MemoryStore::new();
        let tx = create_transaction(&store, "u1", &income("10", "2024-03-01")).await?;

        let result = update_transaction(&store, "u2", tx.id, &income("20", "2024-03-01")).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(get_transaction(&store, "u1", tx.id).await?.amount, 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_transaction_refreshes_cache() -> Result<()> {
        let store = with_march_allocation().await?;
        let tx = create_transaction(&store, "u1", &expense("42", "needs", "2024-03-09")).await?;

        assert!(matches!(
            delete_transaction(&store, "u2", tx.id).await,
            Err(Error::NotFound { .. })
        ));

        let deleted = delete_transaction(&store, "u1", tx.id).await?;
        assert_eq!(deleted.id, tx.id);

        let allocation = store.find_allocation("u1", date(2024, 3, 1)).await?.unwrap();
        assert_eq!(allocation.spent_needs, 0.0);
        assert!(matches!(
            delete_transaction(&store, "u1", tx.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_with_sql_store() -> Result<()> {
        let store = setup_test_store().await?;
        let tx = create_transaction(&store, "u1", &expense("12.34", "wants", "2024-03-09")).await?;

        let fetched = get_transaction(&store, "u1", tx.id).await?;
        assert_eq!(fetched.amount, 12.34);
        assert_eq!(fetched.category(), Some(Category::Wants));
        assert_eq!(fetched.description, "Groceries");
        Ok(())
    }
}
