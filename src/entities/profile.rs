//! Profile entity - One row per authenticated user, keyed by the user ID.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Auth-provider user ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub full_name: Option<String>,
    /// Avatar image path or URL
    pub avatar: Option<String>,
    /// ISO currency code used for display (e.g. `"USD"`)
    pub preferred_currency: String,
    /// When the profile was created
    pub created_at: DateTimeUtc,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// `Profile` has no modelled relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
