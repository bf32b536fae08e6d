use anyhow::{Context, Result, anyhow};
use aws_sdk_ssm::Client;
use tracing::info;

/// Read a (possibly encrypted) SSM parameter and return its value
pub async fn fetch_parameter(client: &Client, name: &str) -> Result<String> {
    let output = client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
        .with_context(|| format!("Failed to fetch SSM parameter {name}"))?;

    let value = output
        .parameter()
        .and_then(|parameter| parameter.value())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("SSM parameter {name} has no value"))?;

    info!(parameter = name, "Fetched SSM parameter");
    Ok(value.to_string())
}
