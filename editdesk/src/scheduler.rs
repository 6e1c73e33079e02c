//! Background generation of the current shorts week.
//!
//! Every tick walks the active plans that have started by the end of the current week and
//! generates that week for each. Generation is idempotent, so ticks that find the week already
//! in place write nothing.

use crate::config::AutoGenerateConfig;
use crate::db::handlers::ShortsPlans;
use crate::planning::{Weekday, week_start_for};
use crate::types::abbrev_uuid;
use crate::weekly;
use chrono::{Days, NaiveDate, Utc};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a single pass over the active plans did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub plans: usize,
    pub tasks_created: i64,
    pub closures_created: usize,
    pub failures: usize,
}

/// Generate the week containing `today` for every eligible plan. A plan that fails is logged and
/// skipped so one bad plan does not hold up the rest.
pub async fn run_generation_tick(pool: &PgPool, today: NaiveDate, week_starts_on: Weekday) -> anyhow::Result<TickSummary> {
    let week_start = week_start_for(today, week_starts_on);
    let week_end = week_start + Days::new(6);

    let mut conn = pool.acquire().await?;
    let plans = ShortsPlans::new(&mut conn).list_active_started_by(week_end).await?;

    let mut summary = TickSummary {
        plans: plans.len(),
        ..Default::default()
    };

    for plan in plans {
        match weekly::generate_week(&mut conn, plan.id, week_start).await {
            Ok(result) => {
                summary.tasks_created += result.tasks_created;
                if result.closure_created {
                    summary.closures_created += 1;
                }
            }
            Err(e) => {
                warn!(plan_id = %abbrev_uuid(&plan.id), %week_start, error = %e, "Skipping plan in week generation");
                summary.failures += 1;
            }
        }
    }

    Ok(summary)
}

/// Run [`run_generation_tick`] on `config.interval` until `shutdown` fires. The first tick runs
/// immediately so a restart catches up on the current week.
pub async fn run_week_generator(pool: PgPool, config: AutoGenerateConfig, week_starts_on: Weekday, shutdown: CancellationToken) {
    info!("Starting shorts week generator with {:?} interval", config.interval);

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shorts week generator shutting down");
                break;
            }
            _ = interval.tick() => {
                match run_generation_tick(&pool, Utc::now().date_naive(), week_starts_on).await {
                    Ok(summary) if summary.tasks_created > 0 || summary.closures_created > 0 || summary.failures > 0 => {
                        info!(
                            plans = summary.plans,
                            tasks_created = summary.tasks_created,
                            closures_created = summary.closures_created,
                            failures = summary.failures,
                            "Shorts week generation pass finished"
                        );
                    }
                    Ok(summary) => debug!(plans = summary.plans, "Shorts weeks already up to date"),
                    Err(e) => warn!(error = %e, "Shorts week generation pass failed"),
                }
            }
        }
    }
}
