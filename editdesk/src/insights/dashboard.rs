use crate::api::models::dashboard::{DashboardResponse, EditorDashboardResponse, MonthlyPoint, TopClient, TopEditor};
use crate::api::models::projects::ProjectStatus;
use crate::db::models::projects::ProjectDBResponse;
use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;

const TOP_N: usize = 5;
const MONTHS_SHOWN: u32 = 6;

/// Counts fetched separately from the project rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardCounts {
    pub clients: i64,
    pub editors: i64,
    pub pending_tasks: i64,
}

/// Totals over `filtered`; `active_projects` and the monthly series use `all`.
pub fn compute_dashboard(
    filtered: &[ProjectDBResponse],
    all: &[ProjectDBResponse],
    counts: DashboardCounts,
    today: NaiveDate,
) -> DashboardResponse {
    let total_revenue: Decimal = filtered.iter().filter(|p| p.payment_received).map(|p| p.billed_amount).sum();
    let total_payments: Decimal = filtered.iter().filter(|p| p.payment_made).map(|p| p.editor_payment).sum();

    let top_clients = top_by(
        filtered
            .iter()
            .filter(|p| p.payment_received)
            .filter_map(|p| Some((p.client_name.as_deref()?, p.billed_amount))),
    )
    .into_iter()
    .map(|(name, revenue)| TopClient { name, revenue })
    .collect();

    let top_editors = top_by(
        filtered
            .iter()
            .filter(|p| p.payment_made)
            .filter_map(|p| Some((p.editor_name.as_deref()?, p.editor_payment))),
    )
    .into_iter()
    .map(|(name, payments)| TopEditor { name, payments })
    .collect();

    DashboardResponse {
        total_revenue,
        total_payments,
        net_profit: total_revenue - total_payments,
        clients_count: counts.clients,
        editors_count: counts.editors,
        active_projects: all.iter().filter(|p| p.status.is_active()).count() as i64,
        pending_tasks: counts.pending_tasks,
        top_clients,
        top_editors,
        monthly: monthly_series(all, today),
    }
}

/// Sum amounts per name and keep the largest, ties broken by name.
fn top_by<'a>(rows: impl Iterator<Item = (&'a str, Decimal)>) -> Vec<(String, Decimal)> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    for (name, amount) in rows {
        *totals.entry(name).or_default() += amount;
    }
    let mut ranked: Vec<_> = totals.into_iter().map(|(name, total)| (name.to_string(), total)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_N);
    ranked
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// The last six calendar months up to and including `today`'s, bucketed by project creation.
fn monthly_series(projects: &[ProjectDBResponse], today: NaiveDate) -> Vec<MonthlyPoint> {
    let Some(current) = today.with_day(1) else {
        return Vec::new();
    };

    let mut revenue: HashMap<(i32, u32), Decimal> = HashMap::new();
    let mut payments: HashMap<(i32, u32), Decimal> = HashMap::new();
    for p in projects {
        let key = month_key(p.created_at.date_naive());
        if p.payment_received {
            *revenue.entry(key).or_default() += p.billed_amount;
        }
        if p.payment_made {
            *payments.entry(key).or_default() += p.editor_payment;
        }
    }

    (0..MONTHS_SHOWN)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(|month| {
            let key = month_key(month);
            let revenue = revenue.get(&key).copied().unwrap_or_default();
            let paid = payments.get(&key).copied().unwrap_or_default();
            MonthlyPoint {
                month: month.format("%Y-%m").to_string(),
                revenue,
                profit: revenue - paid,
            }
        })
        .collect()
}

/// An editor's view over their own projects.
pub fn compute_editor_dashboard(projects: &[ProjectDBResponse], pending_tasks: i64) -> EditorDashboardResponse {
    EditorDashboardResponse {
        pending_tasks,
        active_projects: projects.iter().filter(|p| p.status.is_active()).count() as i64,
        unpaid_amount: projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Completed && !p.payment_made)
            .map(|p| p.editor_payment)
            .sum(),
        paid_amount: projects.iter().filter(|p| p.payment_made).map(|p| p.editor_payment).sum(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    pub(crate) fn project(status: ProjectStatus, created_at: DateTime<Utc>) -> ProjectDBResponse {
        ProjectDBResponse {
            id: Uuid::new_v4(),
            title: "Wedding highlights".to_string(),
            description: None,
            client_id: None,
            editor_id: None,
            template_id: None,
            status,
            content_type: None,
            content_quantity: None,
            due_date: None,
            billed_amount: Decimal::ZERO,
            editor_payment: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            billed_by: None,
            paid_by: None,
            payment_received: false,
            payment_made: false,
            delivered_at: None,
            created_at,
            updated_at: created_at,
            client_name: None,
            editor_name: None,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn billed(client: &str, amount: i64, received: bool, created_at: DateTime<Utc>) -> ProjectDBResponse {
        let mut p = project(ProjectStatus::Completed, created_at);
        p.client_name = Some(client.to_string());
        p.billed_amount = Decimal::new(amount, 0);
        p.payment_received = received;
        p
    }

    fn paid(editor: &str, amount: i64, created_at: DateTime<Utc>) -> ProjectDBResponse {
        let mut p = project(ProjectStatus::Completed, created_at);
        p.editor_name = Some(editor.to_string());
        p.editor_payment = Decimal::new(amount, 0);
        p.payment_made = true;
        p
    }

    #[test]
    fn test_totals_only_count_settled_payments() {
        let projects = vec![
            billed("Acme", 500, true, at(2025, 6, 1)),
            billed("Acme", 900, false, at(2025, 6, 2)),
            paid("Ana", 200, at(2025, 6, 3)),
            project(ProjectStatus::InProgress, at(2025, 6, 4)),
        ];
        let counts = DashboardCounts {
            clients: 3,
            editors: 2,
            pending_tasks: 7,
        };
        let dashboard = compute_dashboard(&projects, &projects, counts, at(2025, 6, 15).date_naive());

        assert_eq!(dashboard.total_revenue, Decimal::new(500, 0));
        assert_eq!(dashboard.total_payments, Decimal::new(200, 0));
        assert_eq!(dashboard.net_profit, Decimal::new(300, 0));
        assert_eq!(dashboard.active_projects, 1);
        assert_eq!(dashboard.clients_count, 3);
        assert_eq!(dashboard.pending_tasks, 7);
    }

    #[test]
    fn test_active_projects_ignore_filter() {
        let all = vec![
            project(ProjectStatus::Pending, at(2025, 1, 1)),
            project(ProjectStatus::Review, at(2025, 6, 1)),
            project(ProjectStatus::Cancelled, at(2025, 6, 1)),
        ];
        let dashboard = compute_dashboard(&all[1..2], &all, DashboardCounts::default(), at(2025, 6, 15).date_naive());
        assert_eq!(dashboard.active_projects, 2);
    }

    #[test]
    fn test_top_lists_are_ranked_and_capped() {
        let mut projects: Vec<_> = ["A", "B", "C", "D", "E", "F"]
            .iter()
            .enumerate()
            .map(|(i, name)| billed(name, 100 * (i as i64 + 1), true, at(2025, 6, 1)))
            .collect();
        projects.push(billed("A", 1000, true, at(2025, 6, 1)));
        projects.push(paid("Ana", 50, at(2025, 6, 1)));
        projects.push(paid("Bruno", 80, at(2025, 6, 1)));

        let dashboard = compute_dashboard(&projects, &projects, DashboardCounts::default(), at(2025, 6, 15).date_naive());
        let names: Vec<_> = dashboard.top_clients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "F", "E", "D", "C"]);
        assert_eq!(dashboard.top_clients[0].revenue, Decimal::new(1100, 0));
        assert_eq!(dashboard.top_editors[0].name, "Bruno");
        assert_eq!(dashboard.top_editors.len(), 2);
    }

    #[test]
    fn test_monthly_series_covers_six_months() {
        let projects = vec![
            billed("Acme", 400, true, at(2025, 6, 3)),
            paid("Ana", 150, at(2025, 6, 10)),
            billed("Acme", 250, true, at(2025, 1, 20)),
            // Outside the window
            billed("Acme", 999, true, at(2024, 12, 31)),
        ];
        let dashboard = compute_dashboard(&projects, &projects, DashboardCounts::default(), at(2025, 6, 15).date_naive());

        let months: Vec<_> = dashboard.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2025-01", "2025-02", "2025-03", "2025-04", "2025-05", "2025-06"]);
        assert_eq!(dashboard.monthly[0].revenue, Decimal::new(250, 0));
        assert_eq!(dashboard.monthly[5].revenue, Decimal::new(400, 0));
        assert_eq!(dashboard.monthly[5].profit, Decimal::new(250, 0));
        assert_eq!(dashboard.monthly[2].profit, Decimal::ZERO);
    }

    #[test]
    fn test_editor_dashboard() {
        let mut owed = project(ProjectStatus::Completed, at(2025, 6, 1));
        owed.editor_payment = Decimal::new(120, 0);
        let settled = paid("Ana", 80, at(2025, 6, 1));
        let mut ongoing = project(ProjectStatus::InProgress, at(2025, 6, 1));
        ongoing.editor_payment = Decimal::new(60, 0);

        let view = compute_editor_dashboard(&[owed, settled, ongoing], 4);
        assert_eq!(view.pending_tasks, 4);
        assert_eq!(view.active_projects, 1);
        assert_eq!(view.unpaid_amount, Decimal::new(120, 0));
        assert_eq!(view.paid_amount, Decimal::new(80, 0));
    }
}
