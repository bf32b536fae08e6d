use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("username already exists")]
    UsernameExists,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user is not confirmed")]
    NotConfirmed,

    #[error("verification code mismatch")]
    CodeMismatch,

    #[error("verification code expired")]
    ExpiredCode,

    #[error("user not found")]
    UserNotFound,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Details collected by the registration form
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// User sign-up, confirmation and sign-in against the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Creates an unconfirmed account; the provider mails a one-time code.
    async fn sign_up(&self, registration: &Registration) -> Result<(), IdentityError>;

    async fn confirm_sign_up(&self, username: &str, code: &str) -> Result<(), IdentityError>;

    async fn sign_in(&self, username: &str, password: &str) -> Result<(), IdentityError>;
}
