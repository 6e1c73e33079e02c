//! Shorts weeks: generating a plan's tasks and closure for a week, and moving closures through
//! their lifecycle.
//!
//! Functions here take a `&mut PgConnection` so the caller decides the transaction boundary.
//! [`generate_week`] must not run inside a transaction it shares with other writes, since a failed
//! closure insert is tolerated and would otherwise abort the surrounding transaction.

use crate::api::models::payments::PaymentType;
use crate::api::models::shorts::{ClosureStatus, ClosureSummary, GenerationResult, MyShortsResponse, PlanDetailResponse};
use crate::db::handlers::{Payments, Repository, ShortsPlans, ShortsTasks, WeeklyClosures};
use crate::db::models::payments::PaymentCreateDBRequest;
use crate::db::models::shorts::{ClosureDBResponse, ClosureTotals, PlanDBResponse, ShortsTaskDBResponse};
use crate::errors::{Error, Result};
use crate::planning::{self, ActiveDays};
use crate::types::{ClosureId, PlanId, UserId, abbrev_uuid};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{debug, error, info, instrument};

/// How many tasks the plan detail shows when no week is open.
const RECENT_TASKS_LIMIT: i64 = 50;

/// Create the week's tasks and its open closure. Running it again for the same week creates nothing.
#[instrument(skip(conn), fields(plan_id = %abbrev_uuid(&plan_id), %week_start), err)]
pub async fn generate_week(conn: &mut PgConnection, plan_id: PlanId, week_start: NaiveDate) -> Result<GenerationResult> {
    let plan = ShortsPlans::new(&mut *conn).get_by_id(plan_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Plan".to_string(),
        id: plan_id.to_string(),
    })?;

    let active_days = ActiveDays::new(&plan.active_days).map_err(|e| Error::BadRequest { message: e.to_string() })?;
    let shorts_per_day = u32::try_from(plan.shorts_per_day).map_err(|_| Error::BadRequest {
        message: "shorts_per_day must be at least 1".to_string(),
    })?;
    let week = planning::plan_week(week_start, &active_days, shorts_per_day);

    let tasks_created = ShortsTasks::new(&mut *conn).insert_drafts(&plan, &week.drafts).await?;
    let required = i32::try_from(week.total_required()).unwrap_or(i32::MAX);

    let closure_created = match WeeklyClosures::new(&mut *conn)
        .insert_open(plan.id, plan.editor_id, week.week_start, week.week_end, required)
        .await
    {
        Ok(created) => created,
        Err(e) => {
            error!(plan_id = %abbrev_uuid(&plan.id), %week_start, error = %e, "Failed to open weekly closure; tasks were still generated");
            false
        }
    };

    let result = GenerationResult {
        week_start: week.week_start,
        week_end: week.week_end,
        tasks_planned: week.total_required() as i64,
        tasks_created: tasks_created as i64,
        closure_created,
    };

    if result.tasks_created > 0 || result.closure_created {
        info!(
            plan_id = %abbrev_uuid(&plan.id),
            %week_start,
            tasks_created = result.tasks_created,
            closure_created,
            "Generated shorts week"
        );
    } else {
        debug!(plan_id = %abbrev_uuid(&plan.id), %week_start, "Shorts week already generated");
    }

    Ok(result)
}

/// Compliance and payout figures for `completed` out of `required` shorts under the plan's current terms.
pub fn summarize(completed: i64, required: i64, plan: &PlanDBResponse) -> ClosureSummary {
    let compliance = planning::compliance_percentage(completed, required);
    ClosureSummary {
        completed,
        required,
        compliance_percentage: compliance,
        estimated_editor_payment: planning::editor_payment(plan.weekly_rate_editor, plan.payment_mode, compliance),
        client_charge: planning::client_charge(plan.weekly_rate_client),
    }
}

async fn plan_of(conn: &mut PgConnection, closure: &ClosureDBResponse) -> Result<PlanDBResponse> {
    ShortsPlans::new(conn).get_by_id(closure.plan_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Plan".to_string(),
        id: closure.plan_id.to_string(),
    })
}

fn closure_not_found(id: ClosureId) -> Error {
    Error::NotFound {
        resource: "Closure".to_string(),
        id: id.to_string(),
    }
}

/// The closure with figures recounted from its week's tasks.
#[instrument(skip(conn), fields(closure_id = %abbrev_uuid(&id)), err)]
pub async fn closure_detail(conn: &mut PgConnection, id: ClosureId) -> Result<(ClosureDBResponse, ClosureSummary)> {
    let closure = WeeklyClosures::new(&mut *conn).get_by_id(id).await?.ok_or_else(|| closure_not_found(id))?;
    let plan = plan_of(&mut *conn, &closure).await?;
    let completed = ShortsTasks::new(&mut *conn)
        .count_done_between(closure.plan_id, closure.week_start_date, closure.week_end_date)
        .await?;
    let summary = summarize(completed, i64::from(closure.total_shorts_required), &plan);
    Ok((closure, summary))
}

/// Freeze an open week: store its totals and book the editor payout and client charge.
///
/// Expects to run inside a transaction.
#[instrument(skip(tx), fields(closure_id = %abbrev_uuid(&id)), err)]
pub async fn confirm_closure(tx: &mut PgConnection, id: ClosureId, actor: UserId) -> Result<ClosureDBResponse> {
    let closure = WeeklyClosures::new(&mut *tx).lock(id).await?.ok_or_else(|| closure_not_found(id))?;
    if !closure.status.can_transition_to(ClosureStatus::Confirmed) {
        return Err(Error::BadRequest {
            message: format!("Only open closures can be confirmed, this one is {}", closure.status),
        });
    }

    let plan = plan_of(&mut *tx, &closure).await?;
    let completed = ShortsTasks::new(&mut *tx)
        .count_done_between(closure.plan_id, closure.week_start_date, closure.week_end_date)
        .await?;
    let summary = summarize(completed, i64::from(closure.total_shorts_required), &plan);

    let totals = ClosureTotals {
        total_shorts_completed: i32::try_from(completed).unwrap_or(i32::MAX),
        compliance_percentage: summary.compliance_percentage,
        editor_payment_amount: summary.estimated_editor_payment,
        client_charge_amount: summary.client_charge,
    };
    if !WeeklyClosures::new(&mut *tx).confirm(id, &totals).await? {
        return Err(Error::Conflict {
            message: "Closure was changed by another request".to_string(),
        });
    }

    let mut payments = Payments::new(&mut *tx);
    if totals.editor_payment_amount > Decimal::ZERO {
        payments
            .create(&PaymentCreateDBRequest {
                payment_type: PaymentType::Expense,
                amount: totals.editor_payment_amount,
                project_id: None,
                editor_id: Some(closure.editor_id),
                closure_id: Some(closure.id),
                payment_method: None,
                reference: None,
                notes: Some(format!("Pago semanal shorts: {}", closure.week_start_date)),
                paid_at: None,
                created_by: Some(actor),
            })
            .await?;
    }
    if totals.client_charge_amount > Decimal::ZERO {
        payments
            .create(&PaymentCreateDBRequest {
                payment_type: PaymentType::Income,
                amount: totals.client_charge_amount,
                project_id: None,
                editor_id: None,
                closure_id: Some(closure.id),
                payment_method: None,
                reference: None,
                notes: Some(format!("Cobro semanal shorts: {}", closure.week_start_date)),
                paid_at: None,
                created_by: Some(actor),
            })
            .await?;
    }

    info!(
        closure_id = %abbrev_uuid(&id),
        completed,
        compliance = %totals.compliance_percentage,
        editor_payment = %totals.editor_payment_amount,
        "Confirmed weekly closure"
    );

    WeeklyClosures::new(&mut *tx).get_by_id(id).await?.ok_or_else(|| closure_not_found(id))
}

/// Record that the editor was paid or the client was charged for a confirmed week.
#[instrument(skip(conn), fields(closure_id = %abbrev_uuid(&id), %target), err)]
pub async fn mark_closure(conn: &mut PgConnection, id: ClosureId, target: ClosureStatus) -> Result<ClosureDBResponse> {
    if !matches!(target, ClosureStatus::PaidEditor | ClosureStatus::ChargedClient) {
        return Err(Error::BadRequest {
            message: format!("Closures cannot be marked {target}"),
        });
    }

    let mut closures = WeeklyClosures::new(conn);
    let closure = closures.get_by_id(id).await?.ok_or_else(|| closure_not_found(id))?;
    if !closure.status.can_transition_to(target) {
        return Err(Error::BadRequest {
            message: format!("Cannot move closure from {} to {}", closure.status, target),
        });
    }
    if !closures.transition(id, closure.status, target).await? {
        return Err(Error::Conflict {
            message: "Closure was changed by another request".to_string(),
        });
    }

    closures.get_by_id(id).await?.ok_or_else(|| closure_not_found(id))
}

/// Undo a confirmation: drop the payments it booked and clear the totals.
///
/// Expects to run inside a transaction.
#[instrument(skip(tx), fields(closure_id = %abbrev_uuid(&id)), err)]
pub async fn reopen_closure(tx: &mut PgConnection, id: ClosureId) -> Result<ClosureDBResponse> {
    let closure = WeeklyClosures::new(&mut *tx).lock(id).await?.ok_or_else(|| closure_not_found(id))?;
    if !closure.status.can_transition_to(ClosureStatus::Open) {
        return Err(Error::BadRequest {
            message: format!("Only confirmed closures can be reopened, this one is {}", closure.status),
        });
    }

    let removed = Payments::new(&mut *tx).delete_for_closure(id).await?;
    if !WeeklyClosures::new(&mut *tx).reopen(id).await? {
        return Err(Error::Conflict {
            message: "Closure was changed by another request".to_string(),
        });
    }
    info!(closure_id = %abbrev_uuid(&id), payments_removed = removed, "Reopened weekly closure");

    WeeklyClosures::new(&mut *tx).get_by_id(id).await?.ok_or_else(|| closure_not_found(id))
}

/// Editors may only touch tasks of weeks that are still open.
pub async fn ensure_week_open(conn: &mut PgConnection, task: &ShortsTaskDBResponse) -> Result<()> {
    match WeeklyClosures::new(conn).find_covering(task.plan_id, task.due_date).await? {
        Some(closure) if closure.status != ClosureStatus::Open => Err(Error::BadRequest {
            message: "This week has already been closed".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Plan with its closures and the tasks of its open week, or its latest tasks when no week is open.
#[instrument(skip(conn, plan), fields(plan_id = %abbrev_uuid(&plan.id)), err)]
pub async fn plan_detail(conn: &mut PgConnection, plan: PlanDBResponse) -> Result<PlanDetailResponse> {
    let closures = WeeklyClosures::new(&mut *conn).list_for_plan(plan.id).await?;
    let open = closures.iter().find(|c| c.status == ClosureStatus::Open);

    let mut tasks = ShortsTasks::new(&mut *conn);
    let tasks = match open {
        Some(closure) => tasks.list_between(plan.id, closure.week_start_date, closure.week_end_date).await?,
        None => tasks.list_recent(plan.id, RECENT_TASKS_LIMIT).await?,
    };

    Ok(PlanDetailResponse {
        plan: plan.into(),
        closures: closures.into_iter().map(Into::into).collect(),
        tasks: tasks.into_iter().map(Into::into).collect(),
    })
}

/// The caller's first active plan, its open week and that week's tasks.
#[instrument(skip(conn), fields(user_id = %abbrev_uuid(&user_id)), err)]
pub async fn my_shorts(conn: &mut PgConnection, user_id: UserId) -> Result<MyShortsResponse> {
    let Some(plan) = ShortsPlans::new(&mut *conn).first_active_for_editor(user_id).await? else {
        return Ok(MyShortsResponse {
            plan: None,
            closure: None,
            tasks: Vec::new(),
        });
    };

    let closure = WeeklyClosures::new(&mut *conn).find_open_for_plan(plan.id).await?;
    let tasks = match &closure {
        Some(c) => {
            ShortsTasks::new(&mut *conn)
                .list_between(plan.id, c.week_start_date, c.week_end_date)
                .await?
        }
        None => Vec::new(),
    };

    Ok(MyShortsResponse {
        plan: Some(plan.into()),
        closure: closure.map(Into::into),
        tasks: tasks.into_iter().map(Into::into).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::shorts::{PlanPaymentMode, ShortsTaskStatus};
    use crate::db::handlers::payments::PaymentFilter;
    use crate::db::handlers::shorts_tasks::ShortsTaskFilter;
    use crate::test_utils::{create_test_admin, create_test_client, create_test_editor, create_test_plan};
    use chrono::Days;
    use sqlx::PgPool;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_generate_week_is_idempotent(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let mut conn = pool.acquire().await.unwrap();

        let first = generate_week(&mut conn, plan.id, monday()).await.unwrap();
        assert_eq!(first.tasks_planned, 6);
        assert_eq!(first.tasks_created, 6);
        assert!(first.closure_created);
        assert_eq!(first.week_end, monday() + Days::new(6));

        let second = generate_week(&mut conn, plan.id, monday()).await.unwrap();
        assert_eq!(second.tasks_planned, 6);
        assert_eq!(second.tasks_created, 0);
        assert!(!second.closure_created);

        let count = ShortsTasks::new(&mut conn)
            .count(&ShortsTaskFilter {
                plan_id: Some(plan.id),
                ..ShortsTaskFilter::new(0, 100)
            })
            .await
            .unwrap();
        assert_eq!(count, 6);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_generate_week_survives_closure_failure(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        for statement in [
            "CREATE FUNCTION refuse_closure() RETURNS trigger AS $$ BEGIN RAISE EXCEPTION 'closures are read-only'; END; $$ LANGUAGE plpgsql",
            "CREATE TRIGGER refuse_closure BEFORE INSERT ON weekly_closures FOR EACH ROW EXECUTE FUNCTION refuse_closure()",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        let mut conn = pool.acquire().await.unwrap();

        let result = generate_week(&mut conn, plan.id, monday()).await.unwrap();
        assert_eq!(result.tasks_created, 6);
        assert!(!result.closure_created);

        assert!(WeeklyClosures::new(&mut conn).find_open_for_plan(plan.id).await.unwrap().is_none());
        let tasks = ShortsTasks::new(&mut conn)
            .list_between(plan.id, monday(), monday() + Days::new(6))
            .await
            .unwrap();
        assert_eq!(tasks.len(), 6);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_generate_week_unknown_plan(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let err = generate_week(&mut conn, uuid::Uuid::new_v4(), monday()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref resource, .. } if resource == "Plan"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_confirm_books_payments_and_reopen_removes_them(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let mut conn = pool.acquire().await.unwrap();
        generate_week(&mut conn, plan.id, monday()).await.unwrap();

        let tasks = ShortsTasks::new(&mut conn)
            .list_between(plan.id, monday(), monday() + Days::new(6))
            .await
            .unwrap();
        for task in tasks.iter().take(3) {
            ShortsTasks::new(&mut conn).update(task.id, Some(ShortsTaskStatus::Done), None).await.unwrap();
        }
        let closure_id = WeeklyClosures::new(&mut conn).find_open_for_plan(plan.id).await.unwrap().unwrap().id;

        let (_, live) = closure_detail(&mut conn, closure_id).await.unwrap();
        assert_eq!(live.completed, 3);
        assert_eq!(live.compliance_percentage, Decimal::new(5000, 2));

        let mut tx = pool.begin().await.unwrap();
        let confirmed = confirm_closure(&mut tx, closure_id, admin.id).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(confirmed.status, ClosureStatus::Confirmed);
        assert_eq!(confirmed.total_shorts_completed, 3);
        assert_eq!(confirmed.editor_payment_amount, Decimal::new(150, 0));
        assert_eq!(confirmed.client_charge_amount, Decimal::new(300, 0));

        let booked = Payments::new(&mut conn).list(&PaymentFilter::new(0, 10)).await.unwrap();
        assert_eq!(booked.len(), 2);
        let expense = booked.iter().find(|p| p.payment_type == PaymentType::Expense).unwrap();
        assert_eq!(expense.editor_id, Some(editor.id));
        assert_eq!(expense.notes.as_deref(), Some("Pago semanal shorts: 2025-06-02"));
        let income = booked.iter().find(|p| p.payment_type == PaymentType::Income).unwrap();
        assert_eq!(income.notes.as_deref(), Some("Cobro semanal shorts: 2025-06-02"));

        // Confirmed weeks lock editors out
        assert!(ensure_week_open(&mut conn, &tasks[4]).await.is_err());

        let mut tx = pool.begin().await.unwrap();
        let err = confirm_closure(&mut tx, closure_id, admin.id).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
        drop(tx);

        let mut tx = pool.begin().await.unwrap();
        let reopened = reopen_closure(&mut tx, closure_id).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(reopened.status, ClosureStatus::Open);
        assert_eq!(reopened.total_shorts_required, 6);
        assert!(Payments::new(&mut conn).list(&PaymentFilter::new(0, 10)).await.unwrap().is_empty());
        assert!(ensure_week_open(&mut conn, &tasks[4]).await.is_ok());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_paid_closure_cannot_reopen(pool: PgPool) {
        let admin = create_test_admin(&pool).await;
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let mut conn = pool.acquire().await.unwrap();
        generate_week(&mut conn, plan.id, monday()).await.unwrap();
        let closure_id = WeeklyClosures::new(&mut conn).find_open_for_plan(plan.id).await.unwrap().unwrap().id;

        let err = mark_closure(&mut conn, closure_id, ClosureStatus::PaidEditor).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));

        let mut tx = pool.begin().await.unwrap();
        confirm_closure(&mut tx, closure_id, admin.id).await.unwrap();
        tx.commit().await.unwrap();

        let paid = mark_closure(&mut conn, closure_id, ClosureStatus::PaidEditor).await.unwrap();
        assert_eq!(paid.status, ClosureStatus::PaidEditor);
        let charged = mark_closure(&mut conn, closure_id, ClosureStatus::ChargedClient).await.unwrap();
        assert_eq!(charged.status, ClosureStatus::ChargedClient);

        let mut tx = pool.begin().await.unwrap();
        let err = reopen_closure(&mut tx, closure_id).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_my_shorts_and_plan_detail(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        let client = create_test_client(&pool, "Acme Media").await;
        let plan = create_test_plan(&pool, client.id, editor.id, monday()).await;
        let mut conn = pool.acquire().await.unwrap();

        let empty = my_shorts(&mut conn, editor.id).await.unwrap();
        assert!(empty.plan.is_some());
        assert!(empty.closure.is_none());
        assert!(empty.tasks.is_empty());

        generate_week(&mut conn, plan.id, monday()).await.unwrap();
        let mine = my_shorts(&mut conn, editor.id).await.unwrap();
        assert_eq!(mine.tasks.len(), 6);
        assert_eq!(mine.closure.unwrap().week_start_date, monday());

        let detail = plan_detail(&mut conn, plan).await.unwrap();
        assert_eq!(detail.closures.len(), 1);
        assert_eq!(detail.tasks.len(), 6);
    }

    #[test]
    fn test_summarize_proportional() {
        let plan = PlanDBResponse {
            id: uuid::Uuid::new_v4(),
            client_id: uuid::Uuid::new_v4(),
            editor_id: uuid::Uuid::new_v4(),
            shorts_per_day: 1,
            active_days: vec![1, 2, 3, 4],
            weekly_rate_client: Decimal::new(400, 0),
            weekly_rate_editor: Decimal::new(200, 0),
            payment_mode: PlanPaymentMode::Proportional,
            start_date: monday(),
            currency: "USD".to_string(),
            timezone: "UTC".to_string(),
            status: crate::api::models::shorts::PlanStatus::Active,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            client_name: "Acme".to_string(),
            editor_name: "Editor".to_string(),
        };

        let summary = summarize(3, 4, &plan);
        assert_eq!(summary.compliance_percentage, Decimal::new(75, 0));
        assert_eq!(summary.estimated_editor_payment, Decimal::new(150, 0));
        assert_eq!(summary.client_charge, Decimal::new(400, 0));

        let nothing_required = summarize(0, 0, &plan);
        assert_eq!(nothing_required.estimated_editor_payment, Decimal::ZERO);
    }
}
