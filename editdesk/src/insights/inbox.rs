use crate::api::models::inbox::{InboxCounts, InboxItem, InboxKind, InboxResponse};
use crate::api::models::projects::ProjectStatus;
use crate::db::models::projects::ProjectDBResponse;
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn item(kind: InboxKind, project: &ProjectDBResponse, message: String) -> InboxItem {
    InboxItem {
        id: format!("{kind}-{}", project.id),
        kind,
        project_id: project.id,
        project_title: project.title.clone(),
        message,
        days_overdue: None,
        amount: None,
    }
}

fn money(amount: Decimal) -> String {
    format!("${}", amount.round_dp(2))
}

/// Everything about non-cancelled projects that needs an admin's attention as of `today`.
///
/// A project can produce several items, e.g. overdue and without an editor.
pub fn derive_inbox(projects: &[ProjectDBResponse], today: NaiveDate) -> InboxResponse {
    let mut items = Vec::new();

    for p in projects.iter().filter(|p| p.status != ProjectStatus::Cancelled) {
        let completed = p.status == ProjectStatus::Completed;

        if let Some(due) = p.due_date.filter(|due| *due < today && !completed) {
            let days = (today - due).num_days();
            items.push(InboxItem {
                days_overdue: Some(days),
                ..item(InboxKind::Overdue, p, format!("Vencido hace {days} días"))
            });
        }
        if completed && !p.payment_received {
            items.push(InboxItem {
                amount: Some(p.billed_amount),
                ..item(InboxKind::PaymentClient, p, format!("Cobrar {}", money(p.billed_amount)))
            });
        }
        if completed && !p.payment_made && p.editor_id.is_some() {
            items.push(InboxItem {
                amount: Some(p.editor_payment),
                ..item(InboxKind::PaymentEditor, p, format!("Pagar {}", money(p.editor_payment)))
            });
        }
        if p.status.is_active() && p.editor_id.is_none() {
            items.push(item(InboxKind::NoEditor, p, "Sin editor".to_string()));
        }
        if p.status.is_active() && p.due_date.is_none() {
            items.push(item(InboxKind::NoDueDate, p, "Sin fecha de entrega".to_string()));
        }
    }

    let counts = items.iter().fold(InboxCounts::default(), |mut counts, i| {
        match i.kind {
            InboxKind::Overdue => counts.overdue += 1,
            InboxKind::PaymentClient | InboxKind::PaymentEditor => counts.payments += 1,
            InboxKind::NoEditor | InboxKind::NoDueDate => counts.other += 1,
        }
        counts
    });

    InboxResponse { items, counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::dashboard::tests::project;
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn kinds(response: &InboxResponse) -> Vec<InboxKind> {
        response.items.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_overdue_reports_days() {
        let mut p = project(ProjectStatus::InProgress, Utc::now());
        p.editor_id = Some(Uuid::new_v4());
        p.due_date = Some(date(2025, 6, 10));

        let inbox = derive_inbox(&[p.clone()], date(2025, 6, 13));
        assert_eq!(kinds(&inbox), vec![InboxKind::Overdue]);
        assert_eq!(inbox.items[0].days_overdue, Some(3));
        assert_eq!(inbox.items[0].id, format!("overdue-{}", p.id));
        assert_eq!(inbox.counts.overdue, 1);

        // Due today is not overdue
        assert!(derive_inbox(&[p], date(2025, 6, 10)).items.is_empty());
    }

    #[test]
    fn test_completed_project_payments() {
        let mut p = project(ProjectStatus::Completed, Utc::now());
        p.editor_id = Some(Uuid::new_v4());
        p.due_date = Some(date(2025, 6, 1));
        p.billed_amount = Decimal::new(50000, 2);
        p.editor_payment = Decimal::new(20000, 2);

        let inbox = derive_inbox(&[p.clone()], date(2025, 6, 13));
        assert_eq!(kinds(&inbox), vec![InboxKind::PaymentClient, InboxKind::PaymentEditor]);
        assert_eq!(inbox.items[0].amount, Some(Decimal::new(50000, 2)));
        assert_eq!(inbox.items[0].message, "Cobrar $500.00");
        assert_eq!(inbox.counts.payments, 2);

        p.payment_received = true;
        p.payment_made = true;
        assert!(derive_inbox(&[p], date(2025, 6, 13)).items.is_empty());
    }

    #[test]
    fn test_unassigned_and_undated() {
        let p = project(ProjectStatus::Pending, Utc::now());
        let inbox = derive_inbox(&[p], date(2025, 6, 13));
        assert_eq!(kinds(&inbox), vec![InboxKind::NoEditor, InboxKind::NoDueDate]);
        assert_eq!(inbox.counts.other, 2);
    }

    #[test]
    fn test_cancelled_projects_are_ignored() {
        let mut p = project(ProjectStatus::Cancelled, Utc::now());
        p.due_date = Some(date(2020, 1, 1));
        assert!(derive_inbox(&[p], date(2025, 6, 13)).items.is_empty());
    }
}
