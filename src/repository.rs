use async_trait::async_trait;
use thiserror::Error;

use crate::model::Project;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project {0} not found")]
    ProjectNotFound(String),

    #[error("project {0} already exists")]
    ProjectExists(String),

    #[error("user {username} already voted for project {project_id}")]
    AlreadyVoted {
        username: String,
        project_id: String,
    },

    #[error("malformed item: {0}")]
    Malformed(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for projects and per-user vote records
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    async fn health_check(&self) -> bool;

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError>;

    /// Fails with [`StoreError::ProjectExists`] if the id is taken.
    async fn create_project(&self, project: &Project) -> Result<(), StoreError>;

    /// Records the vote and bumps the project's counter as one unit.
    ///
    /// A second vote by the same user for the same project fails with
    /// [`StoreError::AlreadyVoted`] and leaves the counter untouched.
    async fn cast_vote(&self, username: &str, project_id: &str) -> Result<(), StoreError>;

    async fn voted_project_ids(&self, username: &str) -> Result<Vec<String>, StoreError>;
}
