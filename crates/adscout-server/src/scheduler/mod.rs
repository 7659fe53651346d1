//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring maintenance jobs: the monthly quota reset, the stale-opportunity
//! sweep, and the stuck-search sweep.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<adscout_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_usage_reset_job(&scheduler, pool.clone()).await?;
    register_stale_opportunity_job(&scheduler, pool.clone(), Arc::clone(&config)).await?;
    register_stuck_search_job(&scheduler, pool, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Zeroes every account's `searches_used` at midnight UTC on the first of the
/// month (`0 0 0 1 * *`).
async fn register_usage_reset_job(
    scheduler: &JobScheduler,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 0 1 * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            match adscout_db::reset_all_search_usage(&pool).await {
                Ok(n) => tracing::info!(accounts = n, "scheduler: monthly usage reset"),
                Err(e) => tracing::error!(error = %e, "scheduler: monthly usage reset failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Deactivates opportunities not verified within the configured window.
/// Runs daily at 03:00 UTC (`0 0 3 * * *`).
async fn register_stale_opportunity_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<adscout_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 3 * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let days = i32::try_from(config.opportunity_stale_after_days).unwrap_or(i32::MAX);

        Box::pin(async move {
            match adscout_db::deactivate_stale_opportunities(&pool, days).await {
                Ok(n) if n > 0 => {
                    tracing::info!(deactivated = n, "scheduler: stale opportunities deactivated");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: stale opportunity sweep failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Fails searches stuck in `processing` past the configured age. Runs hourly
/// (`0 0 * * * *`) so a crashed pipeline cannot strand a search forever.
async fn register_stuck_search_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<adscout_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let max_age = i64::try_from(config.search_stale_after_secs).unwrap_or(i64::MAX);

        Box::pin(async move {
            match adscout_db::fail_stale_searches(&pool, max_age).await {
                Ok(n) if n > 0 => {
                    tracing::warn!(failed = n, "scheduler: stuck searches swept to failed");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "scheduler: stuck search sweep failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
