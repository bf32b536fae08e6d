#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, header},
};
use serde_json::Value;
use tower::ServiceExt;
use unicorn_vote::{
    auth::SessionKeys,
    catalog::ProjectCatalog,
    identity::{IdentityError, IdentityProvider, Registration},
    model::Project,
    repository::{Repository, StoreError},
    routes::build_router,
    state::AppState,
};

pub const VALID_CODE: &str = "123456";
/// Code that [`FakeIdentity`] treats as issued too long ago
pub const EXPIRED_CODE: &str = "000001";

/// Projects and vote sets kept in memory, with the same conflict rules as
/// the DynamoDB implementation
#[derive(Default)]
pub struct InMemoryRepository {
    projects: Mutex<HashMap<String, Project>>,
    votes: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl InMemoryRepository {
    pub fn with_projects(projects: &[Project]) -> Self {
        let repository = Self::default();
        {
            let mut stored = repository.projects.lock().unwrap();
            for project in projects {
                stored.insert(project.id.clone(), project.clone());
            }
        }
        repository
    }

    pub fn stored_votes(&self, project_id: &str) -> Option<u64> {
        self.projects
            .lock()
            .unwrap()
            .get(project_id)
            .map(|project| project.votes)
    }

    pub fn contains(&self, project_id: &str) -> bool {
        self.projects.lock().unwrap().contains_key(project_id)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn health_check(&self) -> bool {
        true
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self.projects.lock().unwrap().values().cloned().collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }

    async fn create_project(&self, project: &Project) -> Result<(), StoreError> {
        let mut projects = self.projects.lock().unwrap();
        if projects.contains_key(&project.id) {
            return Err(StoreError::ProjectExists(project.id.clone()));
        }
        projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn cast_vote(&self, username: &str, project_id: &str) -> Result<(), StoreError> {
        let mut projects = self.projects.lock().unwrap();
        let mut votes = self.votes.lock().unwrap();

        let voted = votes.entry(username.to_string()).or_default();
        if voted.contains(project_id) {
            return Err(StoreError::AlreadyVoted {
                username: username.to_string(),
                project_id: project_id.to_string(),
            });
        }
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.to_string()))?;

        voted.insert(project_id.to_string());
        project.votes += 1;
        Ok(())
    }

    async fn voted_project_ids(&self, username: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .get(username)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }
}

struct Account {
    password: String,
    confirmed: bool,
}

/// Identity provider that accepts [`VALID_CODE`] as every account's code
#[derive(Default)]
pub struct FakeIdentity {
    accounts: Mutex<HashMap<String, Account>>,
}

impl FakeIdentity {
    /// A confirmed account, ready to sign in
    pub fn with_user(username: &str, password: &str) -> Self {
        let identity = Self::default();
        identity.accounts.lock().unwrap().insert(
            username.to_string(),
            Account {
                password: password.to_string(),
                confirmed: true,
            },
        );
        identity
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, registration: &Registration) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&registration.username) {
            return Err(IdentityError::UsernameExists);
        }
        if registration.password.len() < 8 {
            return Err(IdentityError::InvalidInput(
                "Password did not conform with policy".to_string(),
            ));
        }
        accounts.insert(
            registration.username.clone(),
            Account {
                password: registration.password.clone(),
                confirmed: false,
            },
        );
        Ok(())
    }

    async fn confirm_sign_up(&self, username: &str, code: &str) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(username)
            .ok_or(IdentityError::UserNotFound)?;
        match code {
            VALID_CODE => {}
            EXPIRED_CODE => return Err(IdentityError::ExpiredCode),
            _ => return Err(IdentityError::CodeMismatch),
        }
        account.confirmed = true;
        Ok(())
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<(), IdentityError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(username) {
            Some(account) if account.password == password => {
                if account.confirmed {
                    Ok(())
                } else {
                    Err(IdentityError::NotConfirmed)
                }
            }
            _ => Err(IdentityError::InvalidCredentials),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub repository: Arc<InMemoryRepository>,
}

impl TestApp {
    pub fn new(projects: Vec<Project>, identity: FakeIdentity) -> Self {
        let repository = Arc::new(InMemoryRepository::with_projects(&projects));
        let state = AppState::new(
            repository.clone(),
            Arc::new(identity),
            ProjectCatalog::new(projects),
            SessionKeys::new("integration-test-secret", 3600, false),
        );
        Self {
            router: build_router(state.clone()),
            state,
            repository,
        }
    }

    /// `Cookie` header value of a valid session for `username`
    pub fn session_for(&self, username: &str) -> String {
        format!("token={}", self.state.sessions.issue(username).unwrap())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(request(Method::GET, path, cookie, None)).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body = serde_urlencoded::to_string(fields).unwrap();
        self.send(request(Method::POST, path, cookie, Some(body)))
            .await
    }
}

pub fn request(method: Method, path: &str, cookie: Option<&str>, form: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match form {
        Some(form) => builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn project(id: &str, title: &str, votes: u64) -> Project {
    Project {
        id: id.to_string(),
        votes,
        ..Project::new(title.to_string(), format!("{title} description"), "owner".to_string())
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `Set-Cookie` header for `name`, if the response sets it
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .map(str::to_string)
}

/// `name=value` pair from a `Set-Cookie` header, usable as a `Cookie` header
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}
