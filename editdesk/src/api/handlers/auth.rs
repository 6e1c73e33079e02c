use axum::{Json, extract::State, http::HeaderMap};
use tracing::{info, warn};

use crate::{
    AppState,
    activity::client_ip,
    api::models::{
        auth::{AuthResponse, AuthSuccessResponse, ChangePasswordRequest, LoginInfo, LoginRequest, LoginResponse, LogoutResponse},
        users::{CurrentUser, Role, UserResponse},
    },
    auth::{password, session},
    config::Config,
    db::{
        handlers::{Repository, Users},
        models::{
            activity::ActivityLogCreateDBRequest,
            users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
        },
    },
    errors::Error,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const DEV_BYPASS_SOURCE: &str = "dev_bypass";

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some(INVALID_CREDENTIALS.to_string()),
    }
}

fn native_auth_disabled() -> Error {
    Error::BadRequest {
        message: "Native authentication is disabled".to_string(),
    }
}

/// Get login information
#[utoipa::path(
    get,
    path = "/authentication/login",
    tag = "authentication",
    responses(
        (status = 200, description = "Login info", body = LoginInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_login_info(State(state): State<AppState>) -> Result<Json<LoginInfo>, Error> {
    let enabled = state.config.auth.native.enabled;
    Ok(Json(LoginInfo {
        enabled,
        dev_bypass: enabled && state.config.auth.dev_bypass.enabled,
        message: if enabled {
            "Native login is enabled".to_string()
        } else {
            "Native login is disabled".to_string()
        },
    }))
}

/// Role granted by the development bypass for a username/password pair, if any.
fn dev_bypass_role(request: &LoginRequest) -> Option<Role> {
    match (request.username.as_str(), request.password.as_str()) {
        ("admin", "admin") => Some(Role::Admin),
        ("editor", "editor") => Some(Role::Editor),
        _ => None,
    }
}

/// Fetch the local user backing a dev bypass login, creating it on first use.
///
/// An existing row is only reused when it has the bypass role and was created by the bypass
/// itself (or is the configured admin); anything else is treated as bad credentials.
async fn dev_bypass_user(users: &mut Users<'_>, username: &str, role: Role, admin_username: &str) -> Result<UserDBResponse, Error> {
    if let Some(user) = users.get_by_username(username).await? {
        if user.role != role || (user.auth_source != DEV_BYPASS_SOURCE && user.username != admin_username) {
            warn!("Development login bypass refused for existing user '{username}'");
            return Err(invalid_credentials());
        }
        return Ok(user);
    }

    info!("Creating local {username} user for development login");
    let request = UserCreateDBRequest {
        username: username.to_string(),
        email: None,
        full_name: match role {
            Role::Admin => "Admin".to_string(),
            Role::Editor => "Editor".to_string(),
        },
        phone: None,
        role,
        payment_frequency: None,
        auth_source: DEV_BYPASS_SOURCE.to_string(),
        password_hash: None,
    };
    Ok(users.create(&request).await?)
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Native authentication is disabled"),
        (status = 401, description = "Invalid credentials or deactivated account"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, headers: HeaderMap, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(native_auth_disabled());
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let bypass_role = dev_bypass_role(&request).filter(|_| state.config.auth.dev_bypass.enabled);
    let user = match bypass_role {
        Some(role) => {
            warn!("Development login bypass used for '{}'", request.username);
            dev_bypass_user(&mut user_repo, &request.username, role, &state.config.admin_username).await?
        }
        None => {
            let user = user_repo.get_by_username(&request.username).await?.ok_or_else(invalid_credentials)?;
            let hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;
            if !password::verify_blocking(request.password, hash).await? {
                return Err(invalid_credentials());
            }
            user
        }
    };

    if !user.is_active {
        return Err(Error::Unauthenticated {
            message: Some("User account is deactivated".to_string()),
        });
    }

    user_repo.touch_last_login(user.id).await?;

    let current_user = CurrentUser::from(&user);
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(user.id)
                .action("login")
                .entity_type("user")
                .entity_id(user.id)
                .entity_name(user.full_name.clone())
                .maybe_ip_address(client_ip(&headers))
                .build(),
        )
        .await;

    let auth_response = AuthResponse {
        user: UserResponse::from(user),
        message: "Login successful".to_string(),
    };

    Ok(LoginResponse { auth_response, cookie })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap, current_user: Option<CurrentUser>) -> Result<LogoutResponse, Error> {
    if let Some(user) = current_user {
        state
            .activity()
            .record(
                ActivityLogCreateDBRequest::builder()
                    .user_id(user.id)
                    .action("logout")
                    .entity_type("user")
                    .entity_id(user.id)
                    .entity_name(user.full_name)
                    .maybe_ip_address(client_ip(&headers))
                    .build(),
            )
            .await;
    }

    let cookie = format!(
        "{}=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0",
        state.config.auth.native.session.cookie_name
    );

    let auth_response = AuthSuccessResponse {
        message: "Logout successful".to_string(),
    };

    Ok(LogoutResponse { auth_response, cookie })
}

/// Change password for authenticated user
#[utoipa::path(
    post,
    path = "/authentication/password-change",
    request_body = ChangePasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed successfully", body = AuthSuccessResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Current password is incorrect"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<AuthSuccessResponse>, Error> {
    if !state.config.auth.native.enabled {
        return Err(native_auth_disabled());
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("User not found".to_string()),
    })?;

    let password_hash = user.password_hash.clone().ok_or_else(|| Error::BadRequest {
        message: "Cannot change password for users without a local password".to_string(),
    })?;

    if !password::verify_blocking(request.current_password, password_hash).await? {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    password::validate_length(&request.new_password, &state.config.auth.native.password)?;
    let new_password_hash = password::hash_blocking(request.new_password).await?;

    let update_request = UserUpdateDBRequest {
        password_hash: Some(new_password_hash),
        ..Default::default()
    };
    user_repo.update(current_user.id, &update_request).await?;

    state
        .activity()
        .record(
            ActivityLogCreateDBRequest::builder()
                .user_id(user.id)
                .action("change_password")
                .entity_type("user")
                .entity_id(user.id)
                .entity_name(user.full_name)
                .build(),
        )
        .await;

    Ok(Json(AuthSuccessResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// Helper function to create a session cookie
fn create_session_cookie(token: &str, config: &Config) -> String {
    let session_config = &config.auth.native.session;
    let max_age = session_config.timeout.as_secs();

    let secure = if session_config.cookie_secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; HttpOnly{}; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, secure, session_config.cookie_same_site, max_age
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_app_with, create_test_editor};
    use axum::http::StatusCode;
    use sqlx::PgPool;

    async fn set_password(pool: &PgPool, user: &UserDBResponse, plain: &str) {
        let hash = password::hash_string(plain).unwrap();
        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn)
            .update(
                user.id,
                &UserUpdateDBRequest {
                    password_hash: Some(hash),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    fn login_request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[sqlx::test]
    async fn test_login_info(pool: PgPool) {
        let server = create_test_app(pool);
        let info: LoginInfo = server.get("/authentication/login").await.json();
        assert!(info.enabled);
        assert!(!info.dev_bypass);
    }

    #[sqlx::test]
    async fn test_login_success_sets_cookie(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        set_password(&pool, &editor, "correct-horse").await;
        let server = create_test_app(pool.clone());

        let response = server
            .post("/authentication/login")
            .json(&login_request(&editor.username, "correct-horse"))
            .await;

        response.assert_status_ok();
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(cookie.starts_with("editdesk_session="));
        assert!(cookie.contains("HttpOnly"));

        let body: AuthResponse = response.json();
        assert_eq!(body.user.id, editor.id);
        assert_eq!(body.message, "Login successful");

        let mut conn = pool.acquire().await.unwrap();
        let reloaded = Users::new(&mut conn).get_by_id(editor.id).await.unwrap().unwrap();
        assert!(reloaded.last_login.is_some());

        // The cookie authenticates follow-up requests
        let token = cookie.split(';').next().unwrap();
        let me = server.get("/admin/api/v1/users/current").add_header("cookie", token).await;
        me.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_login_wrong_password(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        set_password(&pool, &editor, "correct-horse").await;
        let server = create_test_app(pool);

        let response = server
            .post("/authentication/login")
            .json(&login_request(&editor.username, "battery-staple"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), INVALID_CREDENTIALS);

        let unknown = server.post("/authentication/login").json(&login_request("nobody", "whatever")).await;
        unknown.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.text(), INVALID_CREDENTIALS);
    }

    #[sqlx::test]
    async fn test_login_deactivated_user(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        set_password(&pool, &editor, "correct-horse").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            Users::new(&mut conn).delete(editor.id).await.unwrap();
        }
        let server = create_test_app(pool);

        let response = server
            .post("/authentication/login")
            .json(&login_request(&editor.username, "correct-horse"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "User account is deactivated");
    }

    #[sqlx::test]
    async fn test_login_native_disabled(pool: PgPool) {
        let server = create_test_app_with(pool, |config| config.auth.native.enabled = false);
        let response = server.post("/authentication/login").json(&login_request("admin", "admin")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_dev_bypass_creates_local_users(pool: PgPool) {
        let server = create_test_app_with(pool.clone(), |config| config.auth.dev_bypass.enabled = true);

        let info: LoginInfo = server.get("/authentication/login").await.json();
        assert!(info.dev_bypass);

        let first: AuthResponse = server.post("/authentication/login").json(&login_request("editor", "editor")).await.json();
        assert_eq!(first.user.role, Role::Editor);
        assert_eq!(first.user.auth_source, "dev_bypass");

        // Second login reuses the same row
        let second: AuthResponse = server.post("/authentication/login").json(&login_request("editor", "editor")).await.json();
        assert_eq!(first.user.id, second.user.id);

        let admin: AuthResponse = server.post("/authentication/login").json(&login_request("admin", "admin")).await.json();
        assert_eq!(admin.user.role, Role::Admin);
    }

    #[sqlx::test]
    async fn test_dev_bypass_rejects_mismatched_existing_users(pool: PgPool) {
        // A real admin that happens to be called "editor"
        let mut conn = pool.acquire().await.unwrap();
        let seeded = Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                username: "editor".to_string(),
                email: None,
                full_name: "Not An Editor".to_string(),
                phone: None,
                role: Role::Admin,
                payment_frequency: None,
                auth_source: "native".to_string(),
                password_hash: None,
            })
            .await
            .unwrap();
        drop(conn);
        let server = create_test_app_with(pool.clone(), |config| config.auth.dev_bypass.enabled = true);

        let response = server.post("/authentication/login").json(&login_request("editor", "editor")).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), INVALID_CREDENTIALS);

        // Right role but not created by the bypass
        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn)
            .update(
                seeded.id,
                &UserUpdateDBRequest {
                    role: Some(Role::Editor),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        drop(conn);
        let response = server.post("/authentication/login").json(&login_request("editor", "editor")).await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        // The configured admin is reused even though the bypass did not create it
        let admin_id = crate::create_initial_admin_user("admin", None, &pool).await.unwrap();
        let admin: AuthResponse = server.post("/authentication/login").json(&login_request("admin", "admin")).await.json();
        assert_eq!(admin.user.id, admin_id);
        assert_eq!(admin.user.role, Role::Admin);
    }

    #[test]
    fn test_session_cookie_secure_flag() {
        let mut config = crate::test_utils::create_test_config();
        let insecure = create_session_cookie("token", &config);
        assert!(!insecure.contains("Secure"));

        config.auth.native.session.cookie_secure = true;
        let secure = create_session_cookie("token", &config);
        assert!(secure.contains("; Secure;"));
        assert!(!secure.contains("Secure="));
    }

    #[sqlx::test]
    async fn test_dev_bypass_off_by_default(pool: PgPool) {
        let server = create_test_app(pool);
        let response = server.post("/authentication/login").json(&login_request("admin", "admin")).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_logout_clears_cookie(pool: PgPool) {
        let server = create_test_app(pool);
        let response = server.post("/authentication/logout").await;
        response.assert_status_ok();
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with("editdesk_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[sqlx::test]
    async fn test_change_password(pool: PgPool) {
        let editor = create_test_editor(&pool).await;
        set_password(&pool, &editor, "old-password").await;
        let server = create_test_app(pool.clone());
        let (name, value) = crate::test_utils::auth_header(&editor);

        let wrong = server
            .post("/authentication/password-change")
            .add_header(name.clone(), value.clone())
            .json(&ChangePasswordRequest {
                current_password: "not-it".to_string(),
                new_password: "new-password".to_string(),
            })
            .await;
        wrong.assert_status(StatusCode::UNAUTHORIZED);

        let short = server
            .post("/authentication/password-change")
            .add_header(name.clone(), value.clone())
            .json(&ChangePasswordRequest {
                current_password: "old-password".to_string(),
                new_password: "short".to_string(),
            })
            .await;
        short.assert_status(StatusCode::BAD_REQUEST);

        let ok = server
            .post("/authentication/password-change")
            .add_header(name, value)
            .json(&ChangePasswordRequest {
                current_password: "old-password".to_string(),
                new_password: "new-password".to_string(),
            })
            .await;
        ok.assert_status_ok();

        let response = server
            .post("/authentication/login")
            .json(&login_request(&editor.username, "new-password"))
            .await;
        response.assert_status_ok();
    }
}
