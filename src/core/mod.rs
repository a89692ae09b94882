/// Aggregation of transactions into monthly totals
pub mod aggregate;
/// The 50/30/20 allocation rule and spend tracking
pub mod allocation;
/// Monthly rollover engine
pub mod monthly;
/// Calendar month windows
pub mod period;
/// Profile management
pub mod profile;
/// Dashboard and analytics reports
pub mod report;
/// Transaction validation and management
pub mod transaction;
