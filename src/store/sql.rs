//! `SeaORM`-backed [`BudgetStore`].
//!
//! Upserts use `INSERT ... ON CONFLICT DO UPDATE` against the unique indexes
//! created by [`crate::config::database::create_tables`], then read the row
//! back by its key. `commit_rollover` runs both upserts in one database
//! transaction.

use super::{
    BudgetStore, NewAllocation, NewProfile, NewSnapshot, NewTransaction, ProfilePatch,
    TransactionFilter, TransactionPatch,
};
use crate::{
    core::aggregate::CategoryTotals,
    entities::{
        MonthlyAllocation, MonthlySnapshot, Profile, Transaction, monthly_allocation,
        monthly_snapshot, profile, transaction,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::OnConflict,
};
use tracing::debug;

/// [`BudgetStore`] over a `SeaORM` connection.
#[derive(Debug, Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    /// Wraps an open connection. The schema must already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

async fn find_allocation_in<C>(
    db: &C,
    user_id: &str,
    month: NaiveDate,
) -> Result<Option<monthly_allocation::Model>>
where
    C: ConnectionTrait,
{
    MonthlyAllocation::find()
        .filter(monthly_allocation::Column::UserId.eq(user_id))
        .filter(monthly_allocation::Column::Month.eq(month))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn find_snapshot_in<C>(
    db: &C,
    user_id: &str,
    month: i32,
    year: i32,
) -> Result<Option<monthly_snapshot::Model>>
where
    C: ConnectionTrait,
{
    MonthlySnapshot::find()
        .filter(monthly_snapshot::Column::UserId.eq(user_id))
        .filter(monthly_snapshot::Column::Month.eq(month))
        .filter(monthly_snapshot::Column::Year.eq(year))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn upsert_allocation<C>(db: &C, new: NewAllocation) -> Result<monthly_allocation::Model>
where
    C: ConnectionTrait,
{
    use monthly_allocation::Column;

    let now = Utc::now();
    let model = monthly_allocation::ActiveModel {
        user_id: Set(new.user_id.clone()),
        month: Set(new.month),
        needs_budget: Set(new.needs_budget),
        wants_budget: Set(new.wants_budget),
        savings_budget: Set(new.savings_budget),
        spent_needs: Set(new.spent.needs),
        spent_wants: Set(new.spent.wants),
        spent_savings: Set(new.spent.savings),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    // created_at keeps the first write
    MonthlyAllocation::insert(model)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::Month])
                .update_columns([
                    Column::NeedsBudget,
                    Column::WantsBudget,
                    Column::SavingsBudget,
                    Column::SpentNeeds,
                    Column::SpentWants,
                    Column::SpentSavings,
                    Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_allocation_in(db, &new.user_id, new.month)
        .await?
        .ok_or_else(|| Error::not_found("monthly allocation", format!("{} {}", new.user_id, new.month)))
}

async fn upsert_snapshot<C>(db: &C, new: NewSnapshot) -> Result<monthly_snapshot::Model>
where
    C: ConnectionTrait,
{
    use monthly_snapshot::Column;

    let model = monthly_snapshot::ActiveModel {
        user_id: Set(new.user_id.clone()),
        month: Set(new.month),
        year: Set(new.year),
        needs_balance: Set(new.needs_balance),
        wants_balance: Set(new.wants_balance),
        savings_balance: Set(new.savings_balance),
        total_income: Set(new.total_income),
        total_expenses: Set(new.total_expenses),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    MonthlySnapshot::insert(model)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::Month, Column::Year])
                .update_columns([
                    Column::NeedsBalance,
                    Column::WantsBalance,
                    Column::SavingsBalance,
                    Column::TotalIncome,
                    Column::TotalExpenses,
                    Column::CreatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_snapshot_in(db, &new.user_id, new.month, new.year)
        .await?
        .ok_or_else(|| {
            Error::not_found(
                "monthly snapshot",
                format!("{} {}-{:02}", new.user_id, new.year, new.month),
            )
        })
}

async fn write_rollover<C>(
    db: &C,
    snapshot: Option<NewSnapshot>,
    allocation: NewAllocation,
) -> Result<(Option<monthly_snapshot::Model>, monthly_allocation::Model)>
where
    C: ConnectionTrait,
{
    let snapshot = match snapshot {
        Some(new) => Some(upsert_snapshot(db, new).await?),
        None => None,
    };
    let allocation = upsert_allocation(db, allocation).await?;
    Ok((snapshot, allocation))
}

impl BudgetStore for SqlStore {
    async fn insert_transaction(&self, new: NewTransaction) -> Result<transaction::Model> {
        let model = transaction::ActiveModel {
            user_id: Set(new.user_id),
            amount: Set(new.amount),
            transaction_type: Set(new.transaction_type.as_str().to_string()),
            category: Set(new.category.map(|c| c.as_str().to_string())),
            date: Set(new.date),
            description: Set(new.description),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        debug!("Inserted transaction {}", inserted.id);
        Ok(inserted)
    }

    async fn find_transaction(&self, id: i64) -> Result<Option<transaction::Model>> {
        Transaction::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<transaction::Model>> {
        let mut query =
            Transaction::find().filter(transaction::Column::UserId.eq(filter.user_id.as_str()));

        if let Some(from) = filter.from {
            query = query.filter(transaction::Column::Date.gte(from));
        }
        if let Some(until) = filter.until {
            query = query.filter(transaction::Column::Date.lt(until));
        }
        if let Some(category) = filter.category {
            query = query.filter(transaction::Column::Category.eq(category.as_str()));
        }
        if let Some(kind) = filter.transaction_type {
            query = query.filter(transaction::Column::TransactionType.eq(kind.as_str()));
        }

        query = query
            .order_by_desc(transaction::Column::Date)
            .order_by_desc(transaction::Column::Id);

        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query.all(&self.db).await.map_err(Into::into)
    }

    async fn update_transaction(&self, id: i64, patch: TransactionPatch) -> Result<transaction::Model> {
        let existing = Transaction::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("transaction", id))?;

        let mut active_model: transaction::ActiveModel = existing.into();
        if let Some(amount) = patch.amount {
            active_model.amount = Set(amount);
        }
        if let Some(kind) = patch.transaction_type {
            active_model.transaction_type = Set(kind.as_str().to_string());
        }
        if let Some(category) = patch.category {
            active_model.category = Set(category.map(|c| c.as_str().to_string()));
        }
        if let Some(date) = patch.date {
            active_model.date = Set(date);
        }
        if let Some(description) = patch.description {
            active_model.description = Set(description);
        }

        active_model.update(&self.db).await.map_err(Into::into)
    }

    async fn delete_transaction(&self, id: i64) -> Result<bool> {
        let result = Transaction::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn latest_allocation(&self, user_id: &str) -> Result<Option<monthly_allocation::Model>> {
        MonthlyAllocation::find()
            .filter(monthly_allocation::Column::UserId.eq(user_id))
            .order_by_desc(monthly_allocation::Column::Month)
            .order_by_desc(monthly_allocation::Column::Id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn find_allocation(
        &self,
        user_id: &str,
        month: NaiveDate,
    ) -> Result<Option<monthly_allocation::Model>> {
        find_allocation_in(&self.db, user_id, month).await
    }

    async fn put_allocation(&self, new: NewAllocation) -> Result<monthly_allocation::Model> {
        upsert_allocation(&self.db, new).await
    }

    async fn set_spending(
        &self,
        user_id: &str,
        month: NaiveDate,
        spent: CategoryTotals,
    ) -> Result<Option<monthly_allocation::Model>> {
        let Some(existing) = find_allocation_in(&self.db, user_id, month).await? else {
            return Ok(None);
        };

        let mut active_model: monthly_allocation::ActiveModel = existing.into();
        active_model.spent_needs = Set(spent.needs);
        active_model.spent_wants = Set(spent.wants);
        active_model.spent_savings = Set(spent.savings);
        active_model.updated_at = Set(Utc::now());

        Ok(Some(active_model.update(&self.db).await?))
    }

    async fn find_snapshot(
        &self,
        user_id: &str,
        month: i32,
        year: i32,
    ) -> Result<Option<monthly_snapshot::Model>> {
        find_snapshot_in(&self.db, user_id, month, year).await
    }

    async fn list_snapshots(&self, user_id: &str) -> Result<Vec<monthly_snapshot::Model>> {
        MonthlySnapshot::find()
            .filter(monthly_snapshot::Column::UserId.eq(user_id))
            .order_by_asc(monthly_snapshot::Column::Year)
            .order_by_asc(monthly_snapshot::Column::Month)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn put_snapshot(&self, new: NewSnapshot) -> Result<monthly_snapshot::Model> {
        upsert_snapshot(&self.db, new).await
    }

    async fn commit_rollover(
        &self,
        snapshot: Option<NewSnapshot>,
        allocation: NewAllocation,
    ) -> Result<(Option<monthly_snapshot::Model>, monthly_allocation::Model)> {
        // Both upserts succeed or neither does
        let txn = self.db.begin().await?;

        match write_rollover(&txn, snapshot, allocation).await {
            Ok(written) => {
                txn.commit().await?;
                Ok(written)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<profile::Model>> {
        Profile::find_by_id(user_id.to_string())
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn insert_profile(&self, new: NewProfile) -> Result<profile::Model> {
        if Profile::find_by_id(new.id.clone()).one(&self.db).await?.is_some() {
            return Err(Error::ConstraintViolation {
                message: format!("profile {} already exists", new.id),
            });
        }

        let now = Utc::now();
        let model = profile::ActiveModel {
            id: Set(new.id),
            full_name: Set(new.full_name),
            avatar: Set(new.avatar),
            preferred_currency: Set(new.preferred_currency),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(&self.db).await.map_err(Into::into)
    }

    async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> Result<profile::Model> {
        let existing = Profile::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("profile", user_id))?;

        let mut active_model: profile::ActiveModel = existing.into();
        if let Some(full_name) = patch.full_name {
            active_model.full_name = Set(Some(full_name));
        }
        if let Some(avatar) = patch.avatar {
            active_model.avatar = Set(Some(avatar));
        }
        if let Some(currency) = patch.preferred_currency {
            active_model.preferred_currency = Set(currency);
        }
        active_model.updated_at = Set(Utc::now());

        active_model.update(&self.db).await.map_err(Into::into)
    }
}
