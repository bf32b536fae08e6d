use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ApiResponse;
use crate::{
    middleware::CurrentUser,
    model::{LeaderboardEntry, Project},
    state::AppState,
};

#[derive(ToSchema, Serialize, Deserialize)]
pub struct IndexPage {
    pub title: String,
    /// Logged-in username, absent for anonymous visitors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub projects: Vec<Project>,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct AboutPage {
    pub title: String,
    pub summary: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub title: String,
    pub entries: Vec<LeaderboardEntry>,
}

/// List every project
#[debug_handler]
#[utoipa::path(
    get,
    path = "/",
    tag = "global",
    responses((status = OK, body = ApiResponse<IndexPage>))
)]
pub async fn show_index_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<IndexPage>> {
    Json(ApiResponse::ok(IndexPage {
        title: "Home Page".to_string(),
        user: user.map(|user| user.username),
        projects: state.catalog.all().await,
    }))
}

#[debug_handler]
#[utoipa::path(
    get,
    path = "/g/about",
    tag = "global",
    responses((status = OK, body = ApiResponse<AboutPage>))
)]
pub async fn show_about_page() -> Json<ApiResponse<AboutPage>> {
    Json(ApiResponse::ok(AboutPage {
        title: "About".to_string(),
        summary: "Register, confirm your account with the code we email you, \
                  then vote once for each project you like."
            .to_string(),
    }))
}

/// Projects ranked by votes
#[debug_handler]
#[utoipa::path(
    get,
    path = "/g/leaderboard",
    tag = "global",
    responses(
        (status = OK, body = ApiResponse<LeaderboardPage>),
        (status = UNAUTHORIZED, description = "Not logged in")
    ),
    security(("session_cookie" = []))
)]
pub async fn show_leaderboard_page(
    State(state): State<AppState>,
) -> Json<ApiResponse<LeaderboardPage>> {
    Json(ApiResponse::ok(LeaderboardPage {
        title: "Leaderboard".to_string(),
        entries: state.catalog.leaderboard().await,
    }))
}
