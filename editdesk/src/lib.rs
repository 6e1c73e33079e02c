//! # editdesk: back office for a video-editing agency
//!
//! `editdesk` keeps track of an agency's clients, its editors and the projects they work on,
//! along with the money moving in both directions: what clients are billed and what editors are
//! paid. On top of one-off projects it runs recurring *shorts plans*, where an editor delivers a
//! fixed number of short videos on set weekdays and each week is closed out with a compliance
//! figure and the resulting payout.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum) and all state lives in PostgreSQL,
//! accessed through [sqlx]. Requests to `/admin/api/v1/*` are authenticated by extractors in
//! [`auth`] (session cookie, or a username header set by a trusted proxy) and authorized per
//! handler with [`auth::permissions::RequiresPermission`]. Handlers talk to the database through
//! the repositories in [`db::handlers`], each wrapping a borrowed `PgConnection` so the caller
//! decides transaction boundaries.
//!
//! The pure business rules sit apart from the HTTP code: [`planning`] expands a plan into dated
//! shorts and does the payout arithmetic, [`weekly`] applies it to the database, and [`insights`]
//! derives the dashboard and inbox from project rows.
//!
//! ## Background work
//!
//! When `shorts.auto_generate.enabled` is set, [`scheduler`] periodically generates the current
//! week for every active plan. Generation is idempotent, so the background pass and the manual
//! `generate` endpoints can overlap safely.
//!
//! ## Getting started
//!
//! ```bash
//! export DATABASE_URL="postgres://localhost/editdesk"
//! export EDITDESK_ADMIN_PASSWORD="change-me"
//! editdesk -f config.yaml
//! ```
//!
//! The API reference is served at `/admin/docs`.

pub mod activity;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod insights;
mod openapi;
pub mod planning;
pub mod scheduler;
pub mod telemetry;
mod types;
pub mod weekly;

#[cfg(test)]
pub mod test_utils;

use crate::{
    activity::ActivityLogger,
    api::models::users::Role,
    auth::password,
    config::CorsOrigin,
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    openapi::AdminApiDoc,
};
use axum::http::HeaderValue;
use axum::{
    Router, http,
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{ClientId, ClosureId, PlanId, ProjectId, UserId};

/// Shared state handed to every request handler.
///
/// ```ignore
/// let state = AppState::builder().db(pool).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

impl AppState {
    /// Activity logger over the main pool.
    pub fn activity(&self) -> ActivityLogger {
        ActivityLogger::new(self.db.clone())
    }
}

/// Get the editdesk database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing user with this username keeps its ID and, when `password` is given,
/// gets its password reset to it. Called on every startup so there is always a way in.
///
/// ```no_run
/// # use editdesk::create_initial_admin_user;
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user_id = create_initial_admin_user("admin", Some("secure_password"), &pool).await?;
/// # Ok(())
/// # }
/// ```
#[instrument(skip_all)]
pub async fn create_initial_admin_user(username: &str, password: Option<&str>, db: &PgPool) -> Result<UserId, sqlx::Error> {
    let password_hash = if let Some(pwd) = password {
        Some(password::hash_string(pwd).map_err(|e| sqlx::Error::Encode(format!("Failed to hash admin password: {e}").into()))?)
    } else {
        None
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo
        .get_by_username(username)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to check existing user: {e}")))?
    {
        if password_hash.is_some() {
            let update = UserUpdateDBRequest {
                password_hash,
                ..Default::default()
            };
            user_repo
                .update(existing_user.id, &update)
                .await
                .map_err(|e| sqlx::Error::Protocol(format!("Failed to update admin password: {e}")))?;
        }
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let user_create = UserCreateDBRequest {
        username: username.to_string(),
        email: None,
        full_name: "Administrator".to_string(),
        phone: None,
        role: Role::Admin,
        payment_frequency: None,
        auth_source: "system".to_string(),
        password_hash,
    };

    let created_user = user_repo
        .create(&user_create)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to create admin user: {e}")))?;

    tx.commit().await?;
    info!(username, "Created initial admin user");
    Ok(created_user.id)
}

/// Connect to the configured database, run migrations and make sure the admin user exists.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = config.database.pool_settings();
    let non_zero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    info!(max_connections = settings.max_connections, "Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(non_zero(settings.idle_timeout_secs))
        .max_lifetime(non_zero(settings.max_lifetime_secs))
        .connect(config.database.url())
        .await?;

    migrator().run(&pool).await?;

    create_initial_admin_user(&config.admin_username, config.admin_password.as_deref(), &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Url adds a trailing slash that browsers never send in Origin
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut exposed = vec![http::header::LOCATION];
    for name in &cors_config.exposed_headers {
        let header = name.parse::<http::HeaderName>()?;
        if !exposed.contains(&header) {
            exposed.push(header);
        }
    }

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(cors_config.allow_credentials)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .expose_headers(exposed);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: authentication, the management API under `/admin/api/v1`,
/// the API docs, CORS and request tracing.
///
/// # Errors
///
/// Returns an error if the CORS configuration contains invalid origins or header names.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let auth_routes = Router::new()
        .route(
            "/authentication/login",
            get(api::handlers::auth::get_login_info).post(api::handlers::auth::login),
        )
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .route("/authentication/password-change", post(api::handlers::auth::change_password))
        .with_state(state.clone());

    let api_routes = Router::new()
        // Users and their section visibility
        .route("/users", get(api::handlers::users::list_users))
        .route("/users", post(api::handlers::users::create_user))
        .route("/users/{user_id}", get(api::handlers::users::get_user))
        .route("/users/{user_id}", patch(api::handlers::users::update_user))
        .route("/users/{user_id}", delete(api::handlers::users::delete_user))
        .route("/users/{user_id}/sections", get(api::handlers::sections::get_user_sections))
        .route("/users/{user_id}/sections", put(api::handlers::sections::update_user_sections))
        // Clients
        .route("/clients", get(api::handlers::clients::list_clients))
        .route("/clients", post(api::handlers::clients::create_client))
        .route("/clients/{client_id}", get(api::handlers::clients::get_client))
        .route("/clients/{client_id}", patch(api::handlers::clients::update_client))
        .route("/clients/{client_id}", delete(api::handlers::clients::delete_client))
        // Templates
        .route("/templates", get(api::handlers::templates::list_templates))
        .route("/templates", post(api::handlers::templates::create_template))
        .route("/templates/{template_id}", get(api::handlers::templates::get_template))
        .route("/templates/{template_id}", patch(api::handlers::templates::update_template))
        .route("/templates/{template_id}", delete(api::handlers::templates::delete_template))
        // Projects and comments
        .route("/projects", get(api::handlers::projects::list_projects))
        .route("/projects", post(api::handlers::projects::create_project))
        .route("/projects/{project_id}", get(api::handlers::projects::get_project))
        .route("/projects/{project_id}", patch(api::handlers::projects::update_project))
        .route("/projects/{project_id}", delete(api::handlers::projects::delete_project))
        .route("/projects/{project_id}/comments", get(api::handlers::projects::list_comments))
        .route("/projects/{project_id}/comments", post(api::handlers::projects::create_comment))
        // Tasks
        .route("/tasks", get(api::handlers::tasks::list_tasks))
        .route("/tasks", post(api::handlers::tasks::create_task))
        .route("/tasks/grouped", get(api::handlers::tasks::grouped_tasks))
        .route("/tasks/{task_id}", patch(api::handlers::tasks::update_task))
        .route("/tasks/{task_id}", delete(api::handlers::tasks::delete_task))
        // Payments ledger and balances
        .route("/payments", get(api::handlers::payments::list_payments))
        .route("/payments", post(api::handlers::payments::create_payment))
        .route("/payments/{payment_id}", delete(api::handlers::payments::delete_payment))
        .route("/accounting/editors", get(api::handlers::payments::list_editor_balances))
        .route("/accounting/editors/{editor_id}", get(api::handlers::payments::get_editor_balance))
        // Activity log
        .route("/activity", get(api::handlers::activity::list_activity))
        // Shorts plans and their tasks
        .route("/shorts/plans", get(api::handlers::shorts::list_plans))
        .route("/shorts/plans", post(api::handlers::shorts::create_plan))
        .route("/shorts/plans/{plan_id}", get(api::handlers::shorts::get_plan))
        .route("/shorts/plans/{plan_id}", patch(api::handlers::shorts::update_plan))
        .route("/shorts/plans/{plan_id}", delete(api::handlers::shorts::delete_plan))
        .route("/shorts/plans/{plan_id}/generate", post(api::handlers::shorts::generate_week))
        .route(
            "/shorts/plans/{plan_id}/generate-current",
            post(api::handlers::shorts::generate_current_week),
        )
        .route("/shorts/tasks", get(api::handlers::shorts::list_shorts_tasks))
        .route("/shorts/tasks/{task_id}", patch(api::handlers::shorts::update_shorts_task))
        .route("/shorts/tasks/{task_id}/approve", post(api::handlers::shorts::approve_shorts_task))
        .route("/shorts/tasks/{task_id}/reject", post(api::handlers::shorts::reject_shorts_task))
        .route("/shorts/mine", get(api::handlers::shorts::my_shorts))
        // Weekly closures
        .route("/shorts/closures", get(api::handlers::closures::list_closures))
        .route("/shorts/closures/{closure_id}", get(api::handlers::closures::get_closure))
        .route("/shorts/closures/{closure_id}/confirm", post(api::handlers::closures::confirm_closure))
        .route(
            "/shorts/closures/{closure_id}/mark-editor-paid",
            post(api::handlers::closures::mark_editor_paid),
        )
        .route(
            "/shorts/closures/{closure_id}/mark-client-charged",
            post(api::handlers::closures::mark_client_charged),
        )
        .route("/shorts/closures/{closure_id}/reopen", post(api::handlers::closures::reopen_closure))
        // Overview
        .route("/dashboard", get(api::handlers::dashboard::get_dashboard))
        .route("/dashboard/editor", get(api::handlers::dashboard::get_editor_dashboard))
        .route("/inbox", get(api::handlers::inbox::get_inbox))
        .route("/inbox/{item_id}/resolve", post(api::handlers::inbox::resolve_inbox_item))
        // Weekly reports
        .route("/reports/weekly", get(api::handlers::reports::list_reports))
        .route("/reports/weekly/generate", post(api::handlers::reports::generate_reports))
        .route("/reports/weekly/{report_id}/mark-paid", post(api::handlers::reports::mark_report_paid))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/admin/api/v1", api_routes)
        .merge(Scalar::with_url("/admin/docs", AdminApiDoc::openapi()))
        .route("/api-docs/openapi.json", get(|| async { axum::Json(AdminApiDoc::openapi()) }));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Background tasks running alongside the HTTP server.
///
/// Dropping this without calling [`shutdown`](BackgroundServices::shutdown) still cancels the
/// tasks through `drop_guard`.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Start the shorts week generator if enabled.
fn setup_background_services(pool: PgPool, config: &Config, shutdown_token: tokio_util::sync::CancellationToken) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    let auto_generate = config.shorts.auto_generate.clone();
    if auto_generate.enabled {
        let handle = tokio::spawn(scheduler::run_week_generator(
            pool,
            auto_generate,
            config.shorts.week_starts_on,
            shutdown_token.clone(),
        ));
        background_tasks.push(handle);
    } else {
        info!("Shorts week generation disabled");
    }

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// Owns the router, the pool and the background services for the lifetime of the process.
///
/// 1. [`Application::new`] connects, migrates, ensures the admin user and starts background work
/// 2. [`Application::serve`] serves until the shutdown future resolves, then tears everything down
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting editdesk with configuration: {:#?}", config);
        if config.auth.dev_bypass.enabled {
            warn!("Development login bypass is enabled: admin/admin and editor/editor log in without a password");
        }

        let pool = setup_database(&config).await?;

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let bg_services = setup_background_services(pool.clone(), &config, shutdown_token);

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "editdesk listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{create_test_admin, create_test_app, create_test_app_with, create_test_config};
    use axum::http::StatusCode;

    #[sqlx::test]
    async fn test_create_initial_admin_user_new_user(pool: PgPool) {
        let user_id = create_initial_admin_user("owner", Some("first-password"), &pool)
            .await
            .expect("Should create admin user successfully");

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .get_by_username("owner")
            .await
            .expect("Should be able to query user")
            .expect("User should exist");

        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.auth_source, "system");
        let hash = user.password_hash.expect("password should be set");
        assert!(password::verify_string("first-password", &hash).unwrap());
    }

    #[sqlx::test]
    async fn test_create_initial_admin_user_existing_user(pool: PgPool) {
        let existing = create_test_admin(&pool).await;

        let returned = create_initial_admin_user(&existing.username, Some("rotated-password"), &pool)
            .await
            .expect("Should handle existing user successfully");
        assert_eq!(returned, existing.id);

        // Without a password the existing hash is left alone
        let again = create_initial_admin_user(&existing.username, None, &pool).await.unwrap();
        assert_eq!(again, existing.id);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_username(&existing.username).await.unwrap().unwrap();
        let hash = user.password_hash.expect("password should be set");
        assert!(password::verify_string("rotated-password", &hash).unwrap());
    }

    #[sqlx::test]
    async fn test_healthz_and_docs(pool: PgPool) {
        let server = create_test_app(pool);

        let health = server.get("/healthz").await;
        health.assert_status_ok();
        assert_eq!(health.text(), "OK");

        let spec = server.get("/api-docs/openapi.json").await;
        spec.assert_status_ok();
        let spec: serde_json::Value = spec.json();
        assert!(spec["paths"]["/shorts/closures/{closure_id}/confirm"].is_object());
    }

    #[sqlx::test]
    async fn test_api_requires_authentication(pool: PgPool) {
        let server = create_test_app(pool);
        server.get("/admin/api/v1/projects").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_cors_preflight_allows_configured_origin(pool: PgPool) {
        let server = create_test_app_with(pool, |config| {
            config.auth.security.cors.allowed_origins = vec![CorsOrigin::Url("https://app.editdesk.test".parse().unwrap())];
        });

        let response = server
            .method(http::Method::OPTIONS, "/admin/api/v1/projects")
            .add_header("origin", "https://app.editdesk.test")
            .add_header("access-control-request-method", "GET")
            .await;
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://app.editdesk.test"
        );
    }

    #[test]
    fn test_cors_layer_rejects_bad_exposed_header() {
        let mut config = create_test_config();
        config.auth.security.cors.exposed_headers = vec!["not a header".to_string()];
        assert!(create_cors_layer(&config).is_err());
    }
}
