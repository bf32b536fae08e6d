use tokio::sync::RwLock;

use crate::model::{LeaderboardEntry, Project};

/// In-memory copy of the projects table.
///
/// Loaded once at startup, then kept in step with the writes this process
/// makes (new projects and votes).
#[derive(Debug, Default)]
pub struct ProjectCatalog {
    projects: RwLock<Vec<Project>>,
}

impl ProjectCatalog {
    pub fn new(projects: Vec<Project>) -> Self {
        Self {
            projects: RwLock::new(projects),
        }
    }

    /// All projects, oldest first
    pub async fn all(&self) -> Vec<Project> {
        self.projects.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Project> {
        self.projects
            .read()
            .await
            .iter()
            .find(|project| project.id == id)
            .cloned()
    }

    pub async fn insert(&self, project: Project) {
        self.projects.write().await.push(project);
    }

    /// Bump the cached vote count; returns the updated project
    pub async fn record_vote(&self, id: &str) -> Option<Project> {
        let mut projects = self.projects.write().await;
        let project = projects.iter_mut().find(|project| project.id == id)?;
        project.votes += 1;
        Some(project.clone())
    }

    /// Projects whose id is in `ids`, in catalog order
    pub async fn select(&self, ids: &[String]) -> Vec<Project> {
        self.projects
            .read()
            .await
            .iter()
            .filter(|project| ids.contains(&project.id))
            .cloned()
            .collect()
    }

    /// Ranked by votes, most first; ties broken by title
    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut projects = self.all().await;
        projects.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.title.cmp(&b.title)));
        projects
            .into_iter()
            .enumerate()
            .map(|(index, project)| LeaderboardEntry {
                rank: index + 1,
                project_id: project.id,
                title: project.title,
                votes: project.votes,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn project(id: &str, title: &str, votes: u64) -> Project {
        Project {
            votes,
            id: id.to_string(),
            ..Project::new(title.to_string(), "desc".to_string(), "owner".to_string())
        }
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_votes_then_title() {
        let catalog = ProjectCatalog::new(vec![
            project("a", "Zebra", 2),
            project("b", "Apple", 5),
            project("c", "Mango", 2),
        ]);

        let ranked: Vec<(usize, String)> = catalog
            .leaderboard()
            .await
            .into_iter()
            .map(|entry| (entry.rank, entry.project_id))
            .collect();

        assert_eq!(
            ranked,
            vec![
                (1, "b".to_string()),
                (2, "c".to_string()),
                (3, "a".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_record_vote_updates_cached_count() {
        let catalog = ProjectCatalog::new(vec![project("a", "Zebra", 2)]);

        let updated = catalog.record_vote("a").await.unwrap();
        assert_eq!(updated.votes, 3);
        assert_eq!(catalog.get("a").await.unwrap().votes, 3);
        assert!(catalog.record_vote("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_insert_appends_and_select_keeps_order() {
        let catalog = ProjectCatalog::default();
        catalog.insert(project("a", "First", 0)).await;
        catalog.insert(project("b", "Second", 0)).await;
        catalog.insert(project("c", "Third", 0)).await;

        assert_eq!(catalog.all().await.len(), 3);
        let selected: Vec<String> = catalog
            .select(&["c".to_string(), "a".to_string()])
            .await
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(selected, vec!["a".to_string(), "c".to_string()]);
    }
}
