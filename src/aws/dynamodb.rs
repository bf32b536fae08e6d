//! DynamoDB persistence for projects and user vote records.
//!
//! | table | hash key | attributes |
//! |---|---|---|
//! | projects | `project_id` (S) | `title`, `description`, `owner` (S), `votes` (N), `created_at` (S, RFC 3339) |
//! | users | `username` (S) | `voted_projects` (SS) |

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::{
    Client,
    operation::transact_write_items::TransactWriteItemsError,
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ScalarAttributeType, TransactWriteItem, Update,
    },
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    config::DynamoDbConfig,
    model::Project,
    repository::{Repository, StoreError},
};

const PROJECT_KEY: &str = "project_id";
const USER_KEY: &str = "username";
const VOTED_PROJECTS: &str = "voted_projects";
const VOTES: &str = "votes";

type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Clone)]
pub struct DynamoRepository {
    client: Client,
    projects_table: String,
    users_table: String,
}

impl DynamoRepository {
    pub fn new(client: Client, projects_table: String, users_table: String) -> Self {
        Self {
            client,
            projects_table,
            users_table,
        }
    }

    pub fn from_conf(sdk_config: &SdkConfig, config: &DynamoDbConfig) -> Self {
        Self::new(
            Client::new(sdk_config),
            config.projects_table.clone(),
            config.users_table.clone(),
        )
    }

    /// Create both tables if they do not exist yet (idempotent)
    pub async fn ensure_tables(&self) -> Result<(), StoreError> {
        ensure_table(&self.client, &self.projects_table, PROJECT_KEY).await?;
        ensure_table(&self.client, &self.users_table, USER_KEY).await
    }
}

fn backend<E>(context: String, err: E) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StoreError::Backend(anyhow::Error::new(err).context(context))
}

async fn ensure_table(client: &Client, table_name: &str, hash_key: &str) -> Result<(), StoreError> {
    match client.describe_table().table_name(table_name).send().await {
        Ok(_) => {
            debug!(table = table_name, "Table already exists");
            return Ok(());
        }
        Err(err) => {
            let missing = err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception());
            if !missing {
                return Err(backend(format!("Failed to describe table {table_name}"), err));
            }
        }
    }

    info!(table = table_name, "Creating table");
    let key_schema = KeySchemaElement::builder()
        .attribute_name(hash_key)
        .key_type(KeyType::Hash)
        .build()
        .map_err(|e| backend(format!("Invalid key schema for {table_name}"), e))?;
    let attribute = AttributeDefinition::builder()
        .attribute_name(hash_key)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| backend(format!("Invalid attribute definition for {table_name}"), e))?;

    let created = client
        .create_table()
        .table_name(table_name)
        .key_schema(key_schema)
        .attribute_definitions(attribute)
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;

    match created {
        Ok(_) => {
            info!(table = table_name, "Table created");
            Ok(())
        }
        // another instance is creating it concurrently
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_in_use_exception()) =>
        {
            debug!(table = table_name, "Table is already being created");
            Ok(())
        }
        Err(err) => Err(backend(format!("Failed to create table {table_name}"), err)),
    }
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Result<&'a str, StoreError> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(String::as_str)
        .ok_or_else(|| StoreError::Malformed(format!("missing string attribute `{name}`")))
}

pub(crate) fn project_from_item(item: &Item) -> Result<Project, StoreError> {
    let id = string_attr(item, PROJECT_KEY)?;
    let votes = match item.get(VOTES) {
        None => 0,
        Some(value) => value
            .as_n()
            .ok()
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| StoreError::Malformed(format!("project {id} has invalid `votes`")))?,
    };
    let created_at = match item.get("created_at") {
        // rows written before timestamps were recorded
        None => DateTime::<Utc>::default(),
        Some(value) => value
            .as_s()
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .ok_or_else(|| {
                StoreError::Malformed(format!("project {id} has invalid `created_at`"))
            })?,
    };

    Ok(Project {
        id: id.to_string(),
        title: string_attr(item, "title")?.to_string(),
        description: string_attr(item, "description")?.to_string(),
        owner: string_attr(item, "owner")?.to_string(),
        votes,
        created_at,
    })
}

pub(crate) fn project_to_item(project: &Project) -> Item {
    HashMap::from([
        (PROJECT_KEY.to_string(), AttributeValue::S(project.id.clone())),
        ("title".to_string(), AttributeValue::S(project.title.clone())),
        (
            "description".to_string(),
            AttributeValue::S(project.description.clone()),
        ),
        ("owner".to_string(), AttributeValue::S(project.owner.clone())),
        (VOTES.to_string(), AttributeValue::N(project.votes.to_string())),
        (
            "created_at".to_string(),
            AttributeValue::S(project.created_at.to_rfc3339()),
        ),
    ])
}

/// Why a vote transaction was cancelled, from its per-item cancellation codes
#[derive(Debug, PartialEq, Eq)]
enum VoteRejection {
    AlreadyVoted,
    ProjectMissing,
}

/// Item 0 is the user update, item 1 the project counter update.
fn classify_cancellation(codes: &[Option<&str>]) -> Option<VoteRejection> {
    let failed = |index: usize| {
        codes
            .get(index)
            .copied()
            .flatten()
            .is_some_and(|code| code == "ConditionalCheckFailed")
    };
    if failed(0) {
        Some(VoteRejection::AlreadyVoted)
    } else if failed(1) {
        Some(VoteRejection::ProjectMissing)
    } else {
        None
    }
}

#[async_trait]
impl Repository for DynamoRepository {
    async fn health_check(&self) -> bool {
        self.client
            .describe_table()
            .table_name(&self.projects_table)
            .send()
            .await
            .is_ok()
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .scan()
                .table_name(&self.projects_table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| backend(format!("Failed to scan {}", self.projects_table), e))?;

            for item in page.items() {
                projects.push(project_from_item(item)?);
            }

            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        info!(count = projects.len(), "Loaded projects");
        Ok(projects)
    }

    async fn create_project(&self, project: &Project) -> Result<(), StoreError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.projects_table)
            .set_item(Some(project_to_item(project)))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", PROJECT_KEY)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::ProjectExists(project.id.clone()))
            }
            Err(err) => Err(backend(format!("Failed to store project {}", project.id), err)),
        }
    }

    async fn cast_vote(&self, username: &str, project_id: &str) -> Result<(), StoreError> {
        let record_vote = Update::builder()
            .table_name(&self.users_table)
            .key(USER_KEY, AttributeValue::S(username.to_string()))
            .update_expression("ADD #voted :project_set")
            .condition_expression("attribute_not_exists(#voted) OR NOT contains(#voted, :project_id)")
            .expression_attribute_names("#voted", VOTED_PROJECTS)
            .expression_attribute_values(
                ":project_set",
                AttributeValue::Ss(vec![project_id.to_string()]),
            )
            .expression_attribute_values(":project_id", AttributeValue::S(project_id.to_string()))
            .build()
            .map_err(|e| backend("Invalid vote update".to_string(), e))?;

        let bump_counter = Update::builder()
            .table_name(&self.projects_table)
            .key(PROJECT_KEY, AttributeValue::S(project_id.to_string()))
            .update_expression("ADD #votes :one")
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#votes", VOTES)
            .expression_attribute_names("#pk", PROJECT_KEY)
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .build()
            .map_err(|e| backend("Invalid counter update".to_string(), e))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().update(record_vote).build())
            .transact_items(TransactWriteItem::builder().update(bump_counter).build())
            .send()
            .await;

        let err = match result {
            Ok(_) => {
                info!(username, project_id, "Vote recorded");
                return Ok(());
            }
            Err(err) => err,
        };

        let rejection = match err.as_service_error() {
            Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) => {
                let codes: Vec<Option<&str>> = cancelled
                    .cancellation_reasons()
                    .iter()
                    .map(|reason| reason.code())
                    .collect();
                classify_cancellation(&codes)
            }
            _ => None,
        };

        match rejection {
            Some(VoteRejection::AlreadyVoted) => Err(StoreError::AlreadyVoted {
                username: username.to_string(),
                project_id: project_id.to_string(),
            }),
            Some(VoteRejection::ProjectMissing) => {
                Err(StoreError::ProjectNotFound(project_id.to_string()))
            }
            None => Err(backend(
                format!("Failed to record vote of {username} for {project_id}"),
                err,
            )),
        }
    }

    async fn voted_project_ids(&self, username: &str) -> Result<Vec<String>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.users_table)
            .key(USER_KEY, AttributeValue::S(username.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| backend(format!("Failed to read votes of {username}"), e))?;

        let Some(item) = output.item() else {
            return Ok(Vec::new());
        };

        let mut ids = match item.get(VOTED_PROJECTS) {
            None => Vec::new(),
            Some(value) => value
                .as_ss()
                .map_err(|_| {
                    StoreError::Malformed(format!("user {username} has invalid `{VOTED_PROJECTS}`"))
                })?
                .clone(),
        };
        ids.sort();
        Ok(ids)
    }
}
