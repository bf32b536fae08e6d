use axum::{
    Extension, Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::{ApiResponse, FormPage, ValidForm};
use crate::{
    auth::SessionUser,
    error::{AppError, AppResult},
    model::Project,
    state::AppState,
};

#[derive(ToSchema, Deserialize)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct ProjectPage {
    pub project: Project,
    /// Whether the current user already voted for it
    pub voted: bool,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct VotesPage {
    pub title: String,
    pub projects: Vec<Project>,
}

async fn find_project(state: &AppState, project_id: &str) -> AppResult<Project> {
    state
        .catalog
        .get(project_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Project {project_id} not found")))
}

#[debug_handler]
#[utoipa::path(
    get,
    path = "/project/view/{project_id}",
    tag = "project",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = OK, body = ApiResponse<ProjectPage>),
        (status = NOT_FOUND, description = "Unknown project"),
        (status = UNAUTHORIZED, description = "Not logged in")
    ),
    security(("session_cookie" = []))
)]
pub async fn get_project(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(project_id): Path<String>,
) -> AppResult<Json<ApiResponse<ProjectPage>>> {
    let project = find_project(&state, &project_id).await?;
    let voted = state
        .repository
        .voted_project_ids(&user.username)
        .await?
        .contains(&project.id);

    Ok(Json(ApiResponse::ok(ProjectPage { project, voted })))
}

/// Vote for a project, once per user
#[debug_handler]
#[utoipa::path(
    post,
    path = "/project/view/{project_id}",
    tag = "project",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = OK, description = "Vote recorded", body = ApiResponse<ProjectPage>),
        (status = NOT_FOUND, description = "Unknown project"),
        (status = CONFLICT, description = "Already voted for this project"),
        (status = UNAUTHORIZED, description = "Not logged in")
    ),
    security(("session_cookie" = []))
)]
pub async fn vote_for_project(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(project_id): Path<String>,
) -> AppResult<Json<ApiResponse<ProjectPage>>> {
    find_project(&state, &project_id).await?;

    state
        .repository
        .cast_vote(&user.username, &project_id)
        .await?;

    let project = state
        .catalog
        .record_vote(&project_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Project {project_id} not found")))?;
    info!(username = %user.username, project_id = %project.id, votes = project.votes, "Vote accepted");

    Ok(Json(ApiResponse::with_msg(
        "Thanks for voting!",
        ProjectPage {
            project,
            voted: true,
        },
    )))
}

#[debug_handler]
#[utoipa::path(
    get,
    path = "/project/create",
    tag = "project",
    responses(
        (status = OK, body = ApiResponse<FormPage>),
        (status = UNAUTHORIZED, description = "Not logged in")
    ),
    security(("session_cookie" = []))
)]
pub async fn show_project_creation_page() -> Json<ApiResponse<FormPage>> {
    Json(ApiResponse::ok(FormPage::new(
        "Create New Project",
        "/project/create",
        &["title", "description"],
    )))
}

#[debug_handler]
#[utoipa::path(
    post,
    path = "/project/create",
    tag = "project",
    request_body(content = ProjectForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = CREATED, body = ApiResponse<Project>),
        (status = BAD_REQUEST, description = "Missing title or description"),
        (status = UNAUTHORIZED, description = "Not logged in")
    ),
    security(("session_cookie" = []))
)]
pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    ValidForm(form): ValidForm<ProjectForm>,
) -> AppResult<(StatusCode, Json<ApiResponse<Project>>)> {
    let title = form.title.trim();
    let description = form.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest(
            "A project needs a title and a description".to_string(),
        ));
    }

    let project = Project::new(title.to_string(), description.to_string(), user.username);
    state.repository.create_project(&project).await?;
    state.catalog.insert(project.clone()).await;
    info!(project_id = %project.id, owner = %project.owner, "Project created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_msg("Project created", project)),
    ))
}

/// Projects the current user voted for
#[debug_handler]
#[utoipa::path(
    get,
    path = "/project/votes",
    tag = "project",
    responses(
        (status = OK, body = ApiResponse<VotesPage>),
        (status = UNAUTHORIZED, description = "Not logged in")
    ),
    security(("session_cookie" = []))
)]
pub async fn show_user_votes(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<Json<ApiResponse<VotesPage>>> {
    let ids = state.repository.voted_project_ids(&user.username).await?;
    Ok(Json(ApiResponse::ok(VotesPage {
        title: "Your Votes".to_string(),
        projects: state.catalog.select(&ids).await,
    })))
}
