use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A project users can vote for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Username of the creator
    pub owner: String,
    pub votes: u64,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// New project with a fresh id and no votes
    pub fn new(title: String, description: String, owner: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            owner,
            votes: 0,
            created_at: Utc::now(),
        }
    }
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub project_id: String,
    pub title: String,
    pub votes: u64,
}
