use crate::{
    api::common::ensure_in_school,
    auth::{
        auth::AuthUser,
        csrf::{ACCESS_COOKIE, CSRF_COOKIE},
        jwt::{Subject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, AppResult},
    model::role::Role,
    models::{Claims, LoginReqDto, TokenType, UserSql},
};
use actix_web::{
    HttpRequest, HttpResponse,
    cookie::{Cookie, SameSite, time::Duration as CookieDuration},
    http::header,
    web,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
    /// Echo in `x-csrf-token` when authenticating with the cookie
    csrf_token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserReq {
    #[schema(example = "jdoe")]
    pub username: String,
    pub password: String,
    #[schema(example = "teacher")]
    pub role: Role,
    pub school_id: Option<u64>,
    /// Required when `role` is teacher
    pub teacher_id: Option<u64>,
    /// Required when `role` is student
    pub student_id: Option<u64>,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    error!(error = %e, "Token signing failed");
    AppError::internal("Could not issue tokens", "Try signing in again")
}

async fn store_refresh(pool: &MySqlPool, claims: &Claims) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await?;
    Ok(())
}

fn session_cookies(access_token: &str, csrf_token: &str, config: &Config) -> [Cookie<'static>; 2] {
    let max_age = CookieDuration::seconds(config.access_token_ttl as i64);

    let access = Cookie::build(ACCESS_COOKIE, access_token.to_owned())
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .finish();

    // readable by the page so it can be echoed back in the header
    let csrf = Cookie::build(CSRF_COOKIE, csrf_token.to_owned())
        .path("/")
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .finish();

    [access, csrf]
}

fn removal_cookies() -> [Cookie<'static>; 2] {
    [ACCESS_COOKIE, CSRF_COOKIE].map(|name| {
        let mut cookie = Cookie::build(name, "").path("/").finish();
        cookie.make_removal();
        cookie
    })
}

/// Issues an access/refresh pair and the matching session cookies.
async fn issue_session(
    subject: &Subject,
    pool: &MySqlPool,
    config: &Config,
) -> AppResult<HttpResponse> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
            .map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh(pool, &refresh_claims).await?;

    let csrf_token = Uuid::new_v4().to_string();
    let [access_cookie, csrf_cookie] = session_cookies(&access_token, &csrf_token, config);

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(csrf_cookie)
        .json(LoginResponse {
            access_token,
            refresh_token,
            csrf_token,
        }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in; also sets access_token and csrf_token cookies", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials or inactive account")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(AppError::bad_request("Username or password required"));
    }

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, school_id, teacher_id, student_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        AppError::Unauthorized("Invalid credentials".into())
    })?;

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: inactive account");
        return Err(AppError::Unauthorized("Account is inactive".into()));
    }

    let subject = Subject {
        user_id: db_user.id,
        username: db_user.username,
        role: db_user.role_id,
        school_id: db_user.school_id,
        teacher_id: db_user.teacher_id,
        student_id: db_user.student_id,
    };
    let response = issue_session(&subject, pool.get_ref(), &config).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(subject.user_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = subject.user_id, "Login successful");
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let unauthorized = || AppError::Unauthorized("Invalid refresh token".into());

    let token = bearer(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| unauthorized())?;
    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    // Revoke-on-use: only the first presenter of a refresh token wins.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND revoked = FALSE AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await?;

    if revoked.rows_affected() == 0 {
        info!(user_id = claims.user_id, "Refresh token unknown or already used");
        return Err(unauthorized());
    }

    let is_active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM users WHERE id = ?")
        .bind(claims.user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .unwrap_or(false);
    if !is_active {
        return Err(AppError::Unauthorized("Account is inactive".into()));
    }

    debug!(user_id = claims.user_id, "Refresh token rotated");
    issue_session(&Subject::from(&claims), pool.get_ref(), &config).await
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out; cookies cleared")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let [access_cookie, csrf_cookie] = removal_cookies();
    let mut response = HttpResponse::NoContent();
    response.cookie(access_cookie).cookie(csrf_cookie);

    // Only a valid refresh token revokes anything; the response is the same either way.
    let claims = bearer(&req)
        .and_then(|token| verify_token(token, &config.jwt_secret).ok())
        .filter(|c| c.token_type == TokenType::Refresh);

    if let Some(claims) = claims {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(&claims.jti)
            .execute(pool.get_ref())
            .await?;
        info!(user_id = claims.user_id, "Logged out");
    }

    Ok(response.finish())
}

/// School a new account lands in, given who is creating it.
fn school_for_new_user(auth: &AuthUser, req: &CreateUserReq) -> AppResult<Option<u64>> {
    match (auth.role, req.role) {
        (Role::SystemAdmin, Role::SystemAdmin) => Ok(None),
        (Role::SystemAdmin, _) => auth.school_for_write(req.school_id).map(Some),
        (Role::SchoolAdmin, Role::Teacher | Role::Student) => {
            auth.school_for_write(req.school_id).map(Some)
        }
        (Role::SchoolAdmin, _) => Err(AppError::forbidden(
            "School admins may only create teacher or student accounts",
        )),
        _ => Err(AppError::forbidden("Admin only")),
    }
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Role not allowed for caller"),
        (status = 409, description = "Username already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUserReq>,
) -> AppResult<HttpResponse> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Username and password must not be empty"));
    }

    let school_id = school_for_new_user(&auth, &payload)?;

    let (teacher_id, student_id) = match (payload.role, school_id) {
        (Role::Teacher, Some(school)) => {
            let id = payload
                .teacher_id
                .ok_or_else(|| AppError::bad_request("teacher_id is required for teachers"))?;
            ensure_in_school(pool.get_ref(), "teachers", id, school, "Teacher").await?;
            (Some(id), None)
        }
        (Role::Student, Some(school)) => {
            let id = payload
                .student_id
                .ok_or_else(|| AppError::bad_request("student_id is required for students"))?;
            ensure_in_school(pool.get_ref(), "students", id, school, "Student").await?;
            (None, Some(id))
        }
        _ => (None, None),
    };

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AppError::internal("Failed to register user", "Try again")
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password, role_id, school_id, teacher_id, student_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(hashed)
    .bind(payload.role.id())
    .bind(school_id)
    .bind(teacher_id)
    .bind(student_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            AppError::Conflict("Username already exists".into())
        } else {
            e.into()
        }
    })?;

    info!(user_id = result.last_insert_id(), role = %payload.role, "User created");

    Ok(HttpResponse::Created().json(json!({
        "message": "User created",
        "id": result.last_insert_id(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Current identity", body = AuthUser)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(auth)
}
