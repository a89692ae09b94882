use dotenvy::dotenv;
use finance_tracker::{
    config::{
        database::{create_connection, create_tables, get_database_url},
        settings::load_default_settings,
        users::get_acting_user,
    },
    core::{
        monthly::{RolloverEngine, format_rollover_summary},
        period::today,
        profile::ensure_profile,
        report::{dashboard_summary, format_progress_bar},
    },
    errors::Result,
    store::SqlStore,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Settings and the acting user
    let settings = load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {e}"))?;
    let user_id = get_acting_user().inspect_err(|e| error!("{e}"))?;

    // 4. Database
    let database_url = get_database_url(settings.database_url.as_deref());
    let db = create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    create_tables(&db).await?;

    let engine = RolloverEngine::new(SqlStore::new(db));
    let today = today();

    // 5. First-login profile, then the rollover check every page load runs
    let profile = ensure_profile(engine.store(), &settings, &user_id, None).await?;

    match engine.process_monthly_rollover(&user_id, today).await? {
        Some(result) => info!("{}", format_rollover_summary(&result)),
        None => info!("Budget for {user_id} is current"),
    }

    // 6. Report where the month stands
    let view = engine.budget_view(&user_id, today).await?;
    for status in &view.categories {
        info!(
            "{:<8} {} {:.2} / {:.2} {}",
            status.category.to_string(),
            format_progress_bar(status.percent_used, None),
            status.spent,
            status.budget,
            profile.preferred_currency
        );
    }

    let summary = dashboard_summary(
        engine.store(),
        &user_id,
        today,
        settings.recent_transactions_limit,
    )
    .await?;
    info!(
        "{}: income {:.2}, expenses {:.2}, balance {:.2} {}",
        summary.month,
        summary.totals.total_income,
        summary.totals.total_expenses,
        summary.balance,
        profile.preferred_currency
    );

    Ok(())
}
