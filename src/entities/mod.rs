//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities are also the plain records exchanged across the
//! [`BudgetStore`](crate::store::BudgetStore) boundary, so the in-memory store
//! and the SQL store hand back the same shapes.

pub mod monthly_allocation;
pub mod monthly_snapshot;
pub mod profile;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use monthly_allocation::{
    Column as MonthlyAllocationColumn, Entity as MonthlyAllocation,
    Model as MonthlyAllocationModel,
};
pub use monthly_snapshot::{
    Column as MonthlySnapshotColumn, Entity as MonthlySnapshot, Model as MonthlySnapshotModel,
};
pub use profile::{Entity as Profile, Model as ProfileModel};
pub use transaction::{
    Category, Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
    TransactionType,
};
