#![allow(clippy::needless_for_each)]
mod global_handlers;
mod misc_handlers;
mod project_handlers;
mod user_handlers;

use crate::{
    auth::SESSION_COOKIE,
    error::AppError,
    middleware::{apply_axum_middleware, ensure_logged_in, ensure_not_logged_in, set_user_status},
    state::AppState,
};
use axum::{Form, Json, Router, extract::FromRequest, middleware, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "global", description = "Index, about and leaderboard pages"),
        (name = "user", description = "Registration, confirmation and login"),
        (name = "project", description = "Project pages and voting"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Cookie(
                        utoipa::openapi::security::ApiKeyValue::with_description(
                            SESSION_COOKIE,
                            "Session token set by POST /u/login",
                        ),
                    ),
                ),
            );
        }
    }
}

/// Response wrapper for API responses
#[derive(ToSchema, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            msg: None,
            data: Some(data),
        }
    }

    pub fn with_msg(msg: impl Into<String>, data: T) -> Self {
        Self {
            code: 0,
            msg: Some(msg.into()),
            data: Some(data),
        }
    }
}

/// `Form` whose rejections (missing field, wrong content type) render as
/// [`AppError::BadRequest`]
#[derive(FromRequest)]
#[from_request(via(Form), rejection(AppError))]
pub struct ValidForm<T>(pub T);

/// Describes a form the client should render and submit
#[derive(ToSchema, Serialize, Deserialize)]
pub struct FormPage {
    pub title: String,
    /// Where the form is posted
    pub action: String,
    /// Field names, submitted as `application/x-www-form-urlencoded`
    pub fields: Vec<String>,
    /// Pre-filled username, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl FormPage {
    fn new(title: &str, action: &str, fields: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            action: action.to_string(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
            username: None,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // No gate
    let public = OpenApiRouter::new()
        .routes(routes!(misc_handlers::ping))
        .routes(routes!(misc_handlers::health))
        .routes(routes!(global_handlers::show_index_page))
        .routes(routes!(global_handlers::show_about_page));

    // Anonymous users only
    let guest = OpenApiRouter::new()
        .routes(routes!(
            user_handlers::show_login_page,
            user_handlers::perform_login
        ))
        .routes(routes!(
            user_handlers::show_registration_page,
            user_handlers::register
        ))
        .routes(routes!(user_handlers::show_otp_page, user_handlers::otp))
        .route_layer(middleware::from_fn(ensure_not_logged_in));

    // Logged-in users only
    let member = OpenApiRouter::new()
        .routes(routes!(global_handlers::show_leaderboard_page))
        .routes(routes!(user_handlers::logout))
        .routes(routes!(
            project_handlers::get_project,
            project_handlers::vote_for_project
        ))
        .routes(routes!(
            project_handlers::show_project_creation_page,
            project_handlers::create_project
        ))
        .routes(routes!(project_handlers::show_user_votes))
        .route_layer(middleware::from_fn(ensure_logged_in));

    let (routes, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(public)
        .merge(guest)
        .merge(member)
        .split_for_parts();

    let full_router = routes
        .merge(Scalar::with_url("/scalar", openapi.clone()))
        .route("/openapi.json", get(|| async move { Json(openapi) }))
        // runs before any gate
        .layer(middleware::from_fn_with_state(state.clone(), set_user_status))
        .with_state(state);

    // Apply middleware
    apply_axum_middleware(full_router)
}
