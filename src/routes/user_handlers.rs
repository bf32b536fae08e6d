use axum::{
    Extension, Json, debug_handler,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{ApiResponse, FormPage, ValidForm};
use crate::{
    auth::{OTP_USER_COOKIE, SESSION_COOKIE, SessionUser, removal_cookie},
    error::{AppError, AppResult},
    identity::{IdentityError, Registration},
    state::AppState,
};

#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(ToSchema, Deserialize)]
pub struct OtpForm {
    /// Falls back to the account remembered at registration
    #[serde(default)]
    pub username: Option<String>,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct SessionInfo {
    pub username: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct NextStep {
    pub username: String,
    /// Page the client should continue with
    pub next: String,
}

fn required<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("The {field} field is required")));
    }
    Ok(value)
}

#[debug_handler]
#[utoipa::path(
    get,
    path = "/u/login",
    tag = "user",
    responses(
        (status = OK, body = ApiResponse<FormPage>),
        (status = UNAUTHORIZED, description = "Already logged in")
    )
)]
pub async fn show_login_page() -> Json<ApiResponse<FormPage>> {
    Json(ApiResponse::ok(FormPage::new(
        "Login",
        "/u/login",
        &["username", "password"],
    )))
}

/// Sign in with the identity provider and start a session
#[debug_handler]
#[utoipa::path(
    post,
    path = "/u/login",
    tag = "user",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "Session cookie set", body = ApiResponse<SessionInfo>),
        (status = BAD_REQUEST, description = "Invalid credentials or unconfirmed account"),
        (status = UNAUTHORIZED, description = "Already logged in")
    )
)]
pub async fn perform_login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidForm(form): ValidForm<LoginForm>,
) -> AppResult<Response> {
    let username = required(&form.username, "username")?.to_string();
    if form.password.is_empty() {
        return Err(AppError::BadRequest("The password field is required".to_string()));
    }

    match state.identity.sign_in(&username, &form.password).await {
        Ok(()) => {}
        Err(IdentityError::NotConfirmed) => {
            info!(username = %username, "Login attempt on unconfirmed account");
            let jar = jar.add(state.sessions.otp_user_cookie(username));
            return Ok((jar, AppError::from(IdentityError::NotConfirmed)).into_response());
        }
        Err(err) => return Err(err.into()),
    }

    let token = state
        .sessions
        .issue(&username)
        .map_err(|e| AppError::InternalError(e.into()))?;
    let jar = jar
        .add(state.sessions.session_cookie(token))
        .add(removal_cookie(OTP_USER_COOKIE, "/u"));

    Ok((
        jar,
        Json(ApiResponse::with_msg(
            "Successful Login",
            SessionInfo { username },
        )),
    )
        .into_response())
}

/// Drop the session cookie
#[debug_handler]
#[utoipa::path(
    get,
    path = "/u/logout",
    tag = "user",
    responses(
        (status = SEE_OTHER, description = "Session cleared, redirected to /"),
        (status = UNAUTHORIZED, description = "Not logged in")
    ),
    security(("session_cookie" = []))
)]
pub async fn logout(Extension(user): Extension<SessionUser>, jar: CookieJar) -> (CookieJar, Redirect) {
    info!(username = %user.username, "User logged out");
    (jar.add(removal_cookie(SESSION_COOKIE, "/")), Redirect::to("/"))
}

#[debug_handler]
#[utoipa::path(
    get,
    path = "/u/register",
    tag = "user",
    responses(
        (status = OK, body = ApiResponse<FormPage>),
        (status = UNAUTHORIZED, description = "Already logged in")
    )
)]
pub async fn show_registration_page() -> Json<ApiResponse<FormPage>> {
    Json(ApiResponse::ok(FormPage::new(
        "Register",
        "/u/register",
        &["username", "password", "email"],
    )))
}

/// Create an unconfirmed account; a one-time code is emailed to the user
#[debug_handler]
#[utoipa::path(
    post,
    path = "/u/register",
    tag = "user",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "Account created, confirmation pending", body = ApiResponse<NextStep>),
        (status = BAD_REQUEST, description = "Missing or rejected field"),
        (status = CONFLICT, description = "Username taken"),
        (status = UNAUTHORIZED, description = "Already logged in")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidForm(form): ValidForm<RegisterForm>,
) -> AppResult<(CookieJar, Json<ApiResponse<NextStep>>)> {
    let username = required(&form.username, "username")?.to_string();
    let email = required(&form.email, "email")?.to_string();
    if form.password.is_empty() {
        return Err(AppError::BadRequest("The password field is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    let registration = Registration {
        username: username.clone(),
        password: form.password,
        email,
    };
    state.identity.sign_up(&registration).await?;

    let jar = jar.add(state.sessions.otp_user_cookie(username.clone()));
    Ok((
        jar,
        Json(ApiResponse::with_msg(
            "Registration successful, check your email for the verification code",
            NextStep {
                username,
                next: "/u/otp".to_string(),
            },
        )),
    ))
}

#[debug_handler]
#[utoipa::path(
    get,
    path = "/u/otp",
    tag = "user",
    responses(
        (status = OK, body = ApiResponse<FormPage>),
        (status = UNAUTHORIZED, description = "Already logged in")
    )
)]
pub async fn show_otp_page(jar: CookieJar) -> Json<ApiResponse<FormPage>> {
    let mut page = FormPage::new("Verify your account", "/u/otp", &["username", "code"]);
    page.username = jar.get(OTP_USER_COOKIE).map(|c| c.value().to_string());
    Json(ApiResponse::ok(page))
}

/// Confirm an account with its one-time code
#[debug_handler]
#[utoipa::path(
    post,
    path = "/u/otp",
    tag = "user",
    request_body(content = OtpForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = OK, description = "Account confirmed", body = ApiResponse<NextStep>),
        (status = BAD_REQUEST, description = "Unknown account, wrong or expired code"),
        (status = UNAUTHORIZED, description = "Already logged in")
    )
)]
pub async fn otp(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidForm(form): ValidForm<OtpForm>,
) -> AppResult<(CookieJar, Json<ApiResponse<NextStep>>)> {
    let username = form
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| jar.get(OTP_USER_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| {
            AppError::BadRequest("No pending registration, provide a username".to_string())
        })?;
    let code = required(&form.code, "code")?;

    if let Err(err) = state.identity.confirm_sign_up(&username, code).await {
        warn!(username = %username, "Account confirmation failed: {err}");
        return Err(err.into());
    }

    let jar = jar.add(removal_cookie(OTP_USER_COOKIE, "/u"));
    Ok((
        jar,
        Json(ApiResponse::with_msg(
            "Account confirmed, please log in",
            NextStep {
                username,
                next: "/u/login".to_string(),
            },
        )),
    ))
}
