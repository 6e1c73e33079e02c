use crate::api;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

struct AdminSecurityAddon;

impl Modify for AdminSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.security_schemes.insert(
            "CookieAuth".to_string(),
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "editdesk_session",
                "Session cookie set by `POST /authentication/login`.",
            ))),
        );
        components.security_schemes.insert(
            "X-Editdesk-User".to_string(),
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-editdesk-user",
                "Username asserted by a trusted reverse proxy. Only honoured when proxy header auth is enabled.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "editdesk management API",
        description = "Clients, editors, projects, payments and weekly shorts plans for a video-editing agency."
    ),
    servers(
        (url = "/admin/api/v1", description = "Management API")
    ),
    modifiers(&AdminSecurityAddon),
    paths(
        api::handlers::auth::get_login_info,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::change_password,
        api::handlers::users::list_users,
        api::handlers::users::create_user,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::sections::get_user_sections,
        api::handlers::sections::update_user_sections,
        api::handlers::clients::list_clients,
        api::handlers::clients::create_client,
        api::handlers::clients::get_client,
        api::handlers::clients::update_client,
        api::handlers::clients::delete_client,
        api::handlers::templates::list_templates,
        api::handlers::templates::create_template,
        api::handlers::templates::get_template,
        api::handlers::templates::update_template,
        api::handlers::templates::delete_template,
        api::handlers::projects::list_projects,
        api::handlers::projects::create_project,
        api::handlers::projects::get_project,
        api::handlers::projects::update_project,
        api::handlers::projects::delete_project,
        api::handlers::projects::list_comments,
        api::handlers::projects::create_comment,
        api::handlers::tasks::list_tasks,
        api::handlers::tasks::grouped_tasks,
        api::handlers::tasks::create_task,
        api::handlers::tasks::update_task,
        api::handlers::tasks::delete_task,
        api::handlers::payments::list_payments,
        api::handlers::payments::create_payment,
        api::handlers::payments::delete_payment,
        api::handlers::payments::list_editor_balances,
        api::handlers::payments::get_editor_balance,
        api::handlers::activity::list_activity,
        api::handlers::shorts::list_plans,
        api::handlers::shorts::create_plan,
        api::handlers::shorts::get_plan,
        api::handlers::shorts::update_plan,
        api::handlers::shorts::delete_plan,
        api::handlers::shorts::generate_week,
        api::handlers::shorts::generate_current_week,
        api::handlers::shorts::list_shorts_tasks,
        api::handlers::shorts::update_shorts_task,
        api::handlers::shorts::approve_shorts_task,
        api::handlers::shorts::reject_shorts_task,
        api::handlers::shorts::my_shorts,
        api::handlers::closures::list_closures,
        api::handlers::closures::get_closure,
        api::handlers::closures::confirm_closure,
        api::handlers::closures::mark_editor_paid,
        api::handlers::closures::mark_client_charged,
        api::handlers::closures::reopen_closure,
        api::handlers::dashboard::get_dashboard,
        api::handlers::dashboard::get_editor_dashboard,
        api::handlers::inbox::get_inbox,
        api::handlers::inbox::resolve_inbox_item,
        api::handlers::reports::generate_reports,
        api::handlers::reports::list_reports,
        api::handlers::reports::mark_report_paid,
    ),
    components(
        schemas(
            api::models::auth::LoginRequest,
            api::models::auth::LoginInfo,
            api::models::auth::ChangePasswordRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
            api::models::users::Role,
            api::models::users::PaymentFrequency,
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
            api::models::users::UserCreatedResponse,
            api::models::users::CurrentUser,
            api::models::sections::SectionResponse,
            api::models::sections::SectionUpdate,
            api::models::clients::ClientCreate,
            api::models::clients::ClientUpdate,
            api::models::clients::ClientResponse,
            api::models::templates::TemplateCreate,
            api::models::templates::TemplateUpdate,
            api::models::templates::TemplateResponse,
            api::models::projects::ProjectStatus,
            api::models::projects::ProjectCreate,
            api::models::projects::ProjectUpdate,
            api::models::projects::ProjectResponse,
            api::models::projects::ProjectDetailResponse,
            api::models::projects::CommentCreate,
            api::models::projects::CommentResponse,
            api::models::tasks::TaskStatus,
            api::models::tasks::TaskCreate,
            api::models::tasks::TaskUpdate,
            api::models::tasks::TaskResponse,
            api::models::tasks::GroupedTasksResponse,
            api::models::payments::PaymentType,
            api::models::payments::PaymentCreate,
            api::models::payments::PaymentResponse,
            api::models::payments::EditorBalanceResponse,
            api::models::activity::ActivityLogResponse,
            api::models::shorts::PlanStatus,
            api::models::shorts::PlanPaymentMode,
            api::models::shorts::ShortsTaskStatus,
            api::models::shorts::ClosureStatus,
            api::models::shorts::PlanCreate,
            api::models::shorts::PlanUpdate,
            api::models::shorts::PlanResponse,
            api::models::shorts::GenerationResult,
            api::models::shorts::PlanCreatedResponse,
            api::models::shorts::PlanDetailResponse,
            api::models::shorts::GenerateWeekRequest,
            api::models::shorts::ShortsTaskResponse,
            api::models::shorts::ShortsTaskUpdate,
            api::models::shorts::ClosureResponse,
            api::models::shorts::ClosureSummary,
            api::models::shorts::ClosureDetailResponse,
            api::models::shorts::MyShortsResponse,
            api::models::dashboard::DateFilterKind,
            api::models::dashboard::TopClient,
            api::models::dashboard::TopEditor,
            api::models::dashboard::MonthlyPoint,
            api::models::dashboard::DashboardResponse,
            api::models::dashboard::EditorDashboardResponse,
            api::models::inbox::InboxKind,
            api::models::inbox::InboxItem,
            api::models::inbox::InboxCounts,
            api::models::inbox::InboxResponse,
            api::models::reports::ReportStatus,
            api::models::reports::GenerateReportsRequest,
            api::models::reports::WeeklyReportResponse,
            api::models::reports::GenerateReportsResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Login, logout and password changes"),
        (name = "users", description = "Admins and editors"),
        (name = "sections", description = "Per-user section visibility"),
        (name = "clients", description = "Client directory"),
        (name = "templates", description = "Reusable project templates"),
        (name = "projects", description = "Projects and their comments"),
        (name = "tasks", description = "Project tasks"),
        (name = "payments", description = "Payments ledger and editor balances"),
        (name = "activity", description = "Audit trail of changes"),
        (name = "shorts", description = "Weekly shorts plans and their daily tasks"),
        (name = "closures", description = "Weekly closures of shorts plans"),
        (name = "dashboard", description = "Business and editor figures"),
        (name = "inbox", description = "Projects needing attention"),
        (name = "reports", description = "Weekly editor reports"),
    )
)]
pub struct AdminApiDoc;
