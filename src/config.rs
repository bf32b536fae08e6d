use serde::{Deserialize, Serialize};
use serde_variant::to_variant_name;
use std::{fs, path::Path};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}
impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        to_variant_name(self).expect("only enum supported").fmt(f)
    }
}
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logger configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggerConfig {
    /// Enable log write to stdout
    pub enable: bool,

    /// Set the logger level.
    ///
    /// * options: `trace` | `debug` | `info` | `warn` | `error`
    #[serde(default)]
    pub level: LogLevel,

    /// Set the logger format.
    ///
    /// * options: `compact` | `pretty` | `json`
    #[serde(default)]
    pub format: LogFormat,

    /// Override our custom tracing filter.
    ///
    /// Set this to your own filter if you want to see traces from internal
    /// libraries, e.g. the AWS SDK. See more [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives)
    pub override_filter: Option<String>,
}

/// Sentry configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentryConfig {
    pub dsn: String,
    pub traces_sample_rate: f32,
}

/// Server configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// The address on which the server should listen on for incoming
    /// connections.
    #[serde(default = "default_binding")]
    pub binding: String,
    /// The port on which the server should listen for incoming connections.
    pub port: i32,
    /// The webserver host
    pub host: String,
}

fn default_binding() -> String {
    "localhost".to_string()
}

impl ServerConfig {
    #[must_use]
    pub fn full_url(&self) -> String {
        format!("{}:{}", self.binding, self.port)
    }
}

/// Shared AWS client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// Endpoint override for local emulators (DynamoDB Local, LocalStack).
    pub endpoint_url: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
        }
    }
}

fn default_region() -> String {
    "eu-west-1".to_string()
}

/// Cognito user pool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CognitoConfig {
    #[serde(default = "default_user_pool_id")]
    pub user_pool_id: String,
    /// Name of the SSM parameter holding the app client id
    #[serde(default = "default_client_id_parameter")]
    pub client_id_parameter: String,
    /// Only set when the app client was created with a secret
    pub client_secret: Option<String>,
}

impl Default for CognitoConfig {
    fn default() -> Self {
        Self {
            user_pool_id: default_user_pool_id(),
            client_id_parameter: default_client_id_parameter(),
            client_secret: None,
        }
    }
}

fn default_user_pool_id() -> String {
    "CognitoUnicornUserPool".to_string()
}

fn default_client_id_parameter() -> String {
    "CognitoAppClientID".to_string()
}

/// DynamoDB table names
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DynamoDbConfig {
    #[serde(default = "default_projects_table")]
    pub projects_table: String,
    #[serde(default = "default_users_table")]
    pub users_table: String,
    /// Create missing tables on startup
    #[serde(default)]
    pub create_tables: bool,
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self {
            projects_table: default_projects_table(),
            users_table: default_users_table(),
            create_tables: false,
        }
    }
}

fn default_projects_table() -> String {
    "Projects".to_string()
}

fn default_users_table() -> String {
    "Users".to_string()
}

/// Session cookie settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// HMAC secret used to sign session tokens
    pub secret: String,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_ttl_seconds() -> u64 {
    3600
}

/// Complete application settings that combines all configuration layers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppSettings {
    pub logger: LoggerConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub cognito: CognitoConfig,
    #[serde(default)]
    pub dynamodb: DynamoDbConfig,
    pub session: SessionConfig,
    pub sentry: Option<SentryConfig>,
}

impl AppSettings {
    pub fn new(config: &Path) -> Result<Self, ConfigError> {
        info!(selected_path =? config, "loading environment from");
        let content = fs::read_to_string(config)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<Self>(content)?)
    }
}

impl std::fmt::Display for AppSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let content = toml::to_string(self).unwrap_or_default();
        write!(f, "{content}")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[logger]
enable = true

[server]
port = 8080
host = "http://localhost:8080"

[session]
secret = "change-me"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let settings = AppSettings::from_toml(MINIMAL).unwrap();

        assert_eq!(settings.server.full_url(), "localhost:8080");
        assert_eq!(settings.aws.region, "eu-west-1");
        assert!(settings.aws.endpoint_url.is_none());
        assert_eq!(settings.cognito.user_pool_id, "CognitoUnicornUserPool");
        assert_eq!(settings.cognito.client_id_parameter, "CognitoAppClientID");
        assert_eq!(settings.dynamodb.projects_table, "Projects");
        assert_eq!(settings.dynamodb.users_table, "Users");
        assert!(!settings.dynamodb.create_tables);
        assert_eq!(settings.session.ttl_seconds, 3600);
        assert!(!settings.session.secure_cookie);
        assert!(settings.sentry.is_none());
    }

    #[test]
    fn test_full_config() {
        let content = r#"
[logger]
enable = true
level = "debug"
format = "json"

[server]
binding = "0.0.0.0"
port = 3000
host = "https://vote.example.com"

[aws]
region = "us-east-1"
endpoint_url = "http://localhost:8000"

[cognito]
user_pool_id = "pool"
client_id_parameter = "ClientId"
client_secret = "s3cr3t"

[dynamodb]
projects_table = "p"
users_table = "u"
create_tables = true

[session]
secret = "abc"
ttl_seconds = 60
secure_cookie = true
"#;
        let settings = AppSettings::from_toml(content).unwrap();

        assert_eq!(settings.logger.level.to_string(), "debug");
        assert!(matches!(settings.logger.format, LogFormat::Json));
        assert_eq!(settings.server.full_url(), "0.0.0.0:3000");
        assert_eq!(
            settings.aws.endpoint_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(settings.cognito.client_secret.as_deref(), Some("s3cr3t"));
        assert!(settings.dynamodb.create_tables);
        assert_eq!(settings.session.ttl_seconds, 60);
        assert!(settings.session.secure_cookie);
    }

    #[test]
    fn test_missing_session_section_is_rejected() {
        let content = r#"
[logger]
enable = false

[server]
port = 8080
host = "localhost"
"#;
        assert!(matches!(
            AppSettings::from_toml(content),
            Err(ConfigError::ParseError(_))
        ));
    }
}
