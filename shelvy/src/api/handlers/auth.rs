use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        auth::{
            AuthResponse, AuthSuccessResponse, ChangePasswordRequest, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest,
            RegisterResponse, RegistrationInfo,
        },
        users::{CurrentUser, UserResponse, normalize_username},
    },
    auth::{password, session},
    db::{
        handlers::{Repository, ShelfSettings, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
};

/// Get registration information
#[utoipa::path(
    get,
    path = "/authentication/register",
    tag = "authentication",
    responses(
        (status = 200, description = "Registration info", body = RegistrationInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_registration_info(State(state): State<AppState>) -> Result<Json<RegistrationInfo>, Error> {
    let enabled = state.config.auth.allow_registration;
    Ok(Json(RegistrationInfo {
        enabled,
        message: if enabled {
            "Registration is enabled".to_string()
        } else {
            "Registration is disabled".to_string()
        },
    }))
}

/// Register a new reader
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Reader registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email or username already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let username = normalize_username(&request.username)?;
    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }
    let password_config = &state.config.auth.password;
    password::validate_password(&request.password, password_config.min_length, password_config.max_length)?;

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    // Duplicate email or username surfaces as a unique violation (409)
    let created_user = Users::new(&mut tx)
        .create(&UserCreateDBRequest {
            username,
            email,
            display_name: request.display_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            password_hash,
        })
        .await?;
    // Every reader starts with default shelf settings
    ShelfSettings::new(&mut tx).get_or_create(created_user.id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let user_response = UserResponse::from(created_user);
    let current_user = user_response.clone().into();
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    let auth_response = AuthResponse {
        user: user_response,
        token,
        message: "Registration successful".to_string(),
    };

    Ok(RegisterResponse { auth_response, cookie })
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo
        .get_user_by_email(request.email.trim())
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        })?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        });
    }

    let user_response = UserResponse::from(user);
    let current_user = user_response.clone().into();
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    let auth_response = AuthResponse {
        user: user_response,
        token,
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
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: clear_session_cookie(&state.config),
    })
}

/// Change password for authenticated reader
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
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<AuthSuccessResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("User not found".to_string()),
    })?;

    let current_password = request.current_password.clone();
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&current_password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    let password_config = &state.config.auth.password;
    password::validate_password(&request.new_password, password_config.min_length, password_config.max_length)?;

    let new_password_hash = tokio::task::spawn_blocking({
        let password = request.new_password.clone();
        move || password::hash_string(&password)
    })
    .await
    .map_err(|e| Error::Internal {
        operation: format!("spawn password hashing task: {e}"),
    })??;

    user_repo
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                password_hash: Some(new_password_hash),
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(AuthSuccessResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// Helper function to create a session cookie
pub(crate) fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.session;
    let max_age = session_config.timeout.as_secs();

    format!(
        "{}={}; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, session_config.cookie_secure, session_config.cookie_same_site, max_age
    )
}

/// Expired cookie that makes the browser drop the session
pub(crate) fn clear_session_cookie(config: &crate::config::Config) -> String {
    format!(
        "{}=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0",
        config.auth.session.cookie_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_PASSWORD, create_test_state, create_test_user};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use sqlx::PgPool;

    fn auth_server(state: AppState) -> TestServer {
        let app = axum::Router::new()
            .route("/auth/register", axum::routing::post(register))
            .route("/auth/login", axum::routing::post(login))
            .route("/auth/logout", axum::routing::post(logout))
            .route("/auth/password-change", axum::routing::post(change_password))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    fn register_request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username.to_lowercase()),
            password: password.to_string(),
            display_name: Some("Test Reader".to_string()),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_success(pool: PgPool) {
        let server = auth_server(create_test_state(pool.clone()));

        let response = server.post("/auth/register").json(&register_request("NewReader", "password123")).await;

        response.assert_status(StatusCode::CREATED);
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(cookie.starts_with("shelvy_session="));

        let body: AuthResponse = response.json();
        assert_eq!(body.user.username, "newreader");
        assert_eq!(body.message, "Registration successful");
        assert!(!body.token.is_empty());

        // Default shelf settings exist
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shelf_settings WHERE user_id = $1")
            .bind(body.user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    async fn test_register_disabled(pool: PgPool) {
        let mut state = create_test_state(pool);
        state.config.auth.allow_registration = false;
        let server = auth_server(state);

        let response = server.post("/auth/register").json(&register_request("reader", "password123")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_password_validation(pool: PgPool) {
        let mut state = create_test_state(pool);
        state.config.auth.password.min_length = 10;
        let server = auth_server(state);

        let response = server.post("/auth/register").json(&register_request("reader", "short")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_register_duplicate_username_conflicts(pool: PgPool) {
        create_test_user(&pool, "taken").await;
        let server = auth_server(create_test_state(pool));

        let mut request = register_request("taken", "password123");
        request.email = "someone-else@example.com".to_string();
        let response = server.post("/auth/register").json(&request).await;

        response.assert_status(StatusCode::CONFLICT);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "This username is already taken");
    }

    #[sqlx::test]
    async fn test_register_rejects_bad_username(pool: PgPool) {
        let server = auth_server(create_test_state(pool));
        let response = server.post("/auth/register").json(&register_request("no spaces", "password123")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_and_wrong_password(pool: PgPool) {
        let user = create_test_user(&pool, "loginreader").await;
        let server = auth_server(create_test_state(pool));

        let response = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: user.email.clone(),
                password: TEST_PASSWORD.to_string(),
            })
            .await;
        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").is_some());
        let body: AuthResponse = response.json();
        assert_eq!(body.user.id, user.id);

        let response = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: user.email,
                password: "not the password".to_string(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_login_unknown_email(pool: PgPool) {
        let server = auth_server(create_test_state(pool));
        let response = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "whatever123".to_string(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_logout_expires_cookie(pool: PgPool) {
        let server = auth_server(create_test_state(pool));
        let response = server.post("/auth/logout").await;
        response.assert_status_ok();
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[sqlx::test]
    async fn test_change_password(pool: PgPool) {
        let user = create_test_user(&pool, "changer").await;
        let server = auth_server(create_test_state(pool));
        let (name, value) = crate::test_utils::auth_header(&user);

        let wrong = server
            .post("/auth/password-change")
            .add_header(name.clone(), value.clone())
            .json(&ChangePasswordRequest {
                current_password: "wrong password".to_string(),
                new_password: "brand new password".to_string(),
            })
            .await;
        wrong.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .post("/auth/password-change")
            .add_header(name, value)
            .json(&ChangePasswordRequest {
                current_password: TEST_PASSWORD.to_string(),
                new_password: "brand new password".to_string(),
            })
            .await;
        response.assert_status_ok();

        let login = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: user.email,
                password: "brand new password".to_string(),
            })
            .await;
        login.assert_status_ok();
    }
}
