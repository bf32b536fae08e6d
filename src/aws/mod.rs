pub mod cognito;
pub mod dynamodb;
mod secret_hash;
pub mod ssm;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::info;

use crate::config::AwsConfig;

pub use cognito::CognitoIdentity;
pub use dynamodb::DynamoRepository;
pub use secret_hash::SecretHasher;

/// Load the process-wide AWS configuration shared by every service client
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    if let Some(endpoint) = &config.endpoint_url {
        info!(endpoint, "Using AWS endpoint override");
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}
