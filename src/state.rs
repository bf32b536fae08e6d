use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    auth::SessionKeys,
    aws::{self, CognitoIdentity, DynamoRepository, ssm::fetch_parameter},
    catalog::ProjectCatalog,
    config::AppSettings,
    identity::IdentityProvider,
    repository::Repository,
};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub catalog: Arc<ProjectCatalog>,
    pub sessions: SessionKeys,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn Repository>,
        identity: Arc<dyn IdentityProvider>,
        catalog: ProjectCatalog,
        sessions: SessionKeys,
    ) -> Self {
        Self {
            repository,
            identity,
            catalog: Arc::new(catalog),
            sessions,
        }
    }
}

/// Connect to Cognito, SSM and DynamoDB and load the project catalog
pub async fn init_state_with_aws(config: &AppSettings) -> Result<AppState> {
    let sdk_config = aws::load_sdk_config(&config.aws).await;

    let ssm = aws_sdk_ssm::Client::new(&sdk_config);
    let client_id = fetch_parameter(&ssm, &config.cognito.client_id_parameter)
        .await
        .context("Cannot resolve the Cognito app client id")?;
    let identity = CognitoIdentity::from_conf(&sdk_config, &config.cognito, client_id);

    let repository = DynamoRepository::from_conf(&sdk_config, &config.dynamodb);
    if config.dynamodb.create_tables {
        repository.ensure_tables().await?;
    }

    let projects = repository.list_projects().await?;
    info!(count = projects.len(), "Project catalog ready");

    Ok(AppState::new(
        Arc::new(repository),
        Arc::new(identity),
        ProjectCatalog::new(projects),
        SessionKeys::from_conf(&config.session),
    ))
}
