//! Fixtures shared by unit and router tests.

use crate::api::models::shorts::PlanPaymentMode;
use crate::api::models::users::Role;
use crate::config::{AutoGenerateConfig, Config, NativeAuthConfig, PoolSettings, ProxyHeaderAuthConfig, SessionConfig, ShortsConfig};
use crate::db::{
    handlers::{Clients, Repository, ShortsPlans, Users},
    models::{
        clients::{ClientCreateDBRequest, ClientDBResponse},
        shorts::{PlanCreateDBRequest, PlanDBResponse},
        users::{UserCreateDBRequest, UserDBResponse},
    },
};
use crate::types::{ClientId, UserId};
use crate::AppState;
use axum_test::TestServer;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub fn create_test_config() -> Config {
    Config {
        database: crate::config::DatabaseConfig::External {
            // sqlx::test hands out its own pool
            url: "unused".to_string(),
            pool: PoolSettings {
                max_connections: 1,
                min_connections: 1,
                ..Default::default()
            },
        },
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_username: "admin".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        auth: crate::config::AuthConfig {
            native: NativeAuthConfig {
                enabled: true,
                session: SessionConfig {
                    cookie_secure: false,
                    ..Default::default()
                },
                ..Default::default()
            },
            proxy_header: ProxyHeaderAuthConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        },
        shorts: ShortsConfig {
            auto_generate: AutoGenerateConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn create_test_state(pool: PgPool) -> AppState {
    AppState::builder().db(pool).config(create_test_config()).build()
}

/// Full router over the given pool, without background services.
pub fn create_test_app(pool: PgPool) -> TestServer {
    let router = crate::build_router(create_test_state(pool)).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Same as [`create_test_app`], with the config tweaked first.
pub fn create_test_app_with(pool: PgPool, configure: impl FnOnce(&mut Config)) -> TestServer {
    let mut config = create_test_config();
    configure(&mut config);
    let state = AppState::builder().db(pool).config(config).build();
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub async fn create_test_user(pool: &PgPool, role: Role) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let username = format!("test{}_{}", role_prefix(role), Uuid::new_v4().simple());

    let request = UserCreateDBRequest {
        username: username.clone(),
        email: Some(format!("{username}@example.com")),
        full_name: format!("Test {} {}", role_prefix(role), &username[username.len() - 6..]),
        phone: None,
        role,
        payment_frequency: None,
        auth_source: "test".to_string(),
        password_hash: None,
    };

    Users::new(&mut conn).create(&request).await.expect("Failed to create test user")
}

fn role_prefix(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Editor => "editor",
    }
}

pub async fn create_test_admin(pool: &PgPool) -> UserDBResponse {
    create_test_user(pool, Role::Admin).await
}

pub async fn create_test_editor(pool: &PgPool) -> UserDBResponse {
    create_test_user(pool, Role::Editor).await
}

pub async fn create_test_client(pool: &PgPool, name: &str) -> ClientDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let request = ClientCreateDBRequest {
        name: name.to_string(),
        email: None,
        phone: None,
        company: None,
        notes: None,
    };

    Clients::new(&mut conn).create(&request).await.expect("Failed to create test client")
}

/// Two shorts on Monday, Wednesday and Friday; 300 charged and 150 paid per week, fixed.
pub async fn create_test_plan(pool: &PgPool, client_id: ClientId, editor_id: UserId, start_date: NaiveDate) -> PlanDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let request = PlanCreateDBRequest {
        client_id,
        editor_id,
        shorts_per_day: 2,
        active_days: vec![1, 3, 5],
        weekly_rate_client: Decimal::new(300, 0),
        weekly_rate_editor: Decimal::new(150, 0),
        payment_mode: PlanPaymentMode::Fixed,
        start_date,
        currency: "USD".to_string(),
        timezone: "America/Argentina/Buenos_Aires".to_string(),
    };

    ShortsPlans::new(&mut conn).create(&request).await.expect("Failed to create test plan")
}

/// Proxy header identifying `user`, for `TestServer` requests.
pub fn auth_header(user: &UserDBResponse) -> (String, String) {
    (ProxyHeaderAuthConfig::default().header_name, user.username.clone())
}
