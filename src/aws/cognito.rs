use anyhow::anyhow;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cognitoidentityprovider::{
    Client,
    operation::{
        confirm_sign_up::ConfirmSignUpError, initiate_auth::InitiateAuthError,
        sign_up::SignUpError,
    },
    types::{AttributeType, AuthFlowType},
};
use tracing::{info, warn};

use super::secret_hash::SecretHasher;
use crate::{
    config::CognitoConfig,
    identity::{IdentityError, IdentityProvider, Registration},
};

/// Identity provider backed by a Cognito user pool app client
#[derive(Debug, Clone)]
pub struct CognitoIdentity {
    client: Client,
    user_pool_id: String,
    client_id: String,
    hasher: Option<SecretHasher>,
}

impl CognitoIdentity {
    pub fn new(
        client: Client,
        user_pool_id: String,
        client_id: String,
        client_secret: Option<String>,
    ) -> Self {
        let hasher = client_secret.map(|secret| SecretHasher::new(client_id.clone(), secret));
        Self {
            client,
            user_pool_id,
            client_id,
            hasher,
        }
    }

    /// Build the identity client from the shared AWS configuration and the
    /// app client id fetched at startup
    pub fn from_conf(sdk_config: &SdkConfig, config: &CognitoConfig, client_id: String) -> Self {
        Self::new(
            Client::new(sdk_config),
            config.user_pool_id.clone(),
            client_id,
            config.client_secret.clone(),
        )
    }

    fn secret_hash(&self, username: &str) -> Option<String> {
        self.hasher.as_ref().map(|hasher| hasher.hash(username))
    }
}

fn backend<E>(operation: &str, err: E) -> IdentityError
where
    E: std::error::Error + Send + Sync + 'static,
{
    IdentityError::Backend(anyhow::Error::new(err).context(format!("Cognito {operation} failed")))
}

fn invalid_input(message: Option<&str>) -> IdentityError {
    IdentityError::InvalidInput(
        message
            .unwrap_or("Invalid registration details")
            .to_string(),
    )
}

/// Domain outcome of a `SignUp` service error; `None` means backend failure
fn sign_up_failure(err: &SignUpError) -> Option<IdentityError> {
    match err {
        SignUpError::UsernameExistsException(_) => Some(IdentityError::UsernameExists),
        SignUpError::InvalidPasswordException(e) => Some(invalid_input(e.message())),
        SignUpError::InvalidParameterException(e) => Some(invalid_input(e.message())),
        _ => None,
    }
}

fn confirm_sign_up_failure(err: &ConfirmSignUpError) -> Option<IdentityError> {
    match err {
        ConfirmSignUpError::CodeMismatchException(_) => Some(IdentityError::CodeMismatch),
        ConfirmSignUpError::ExpiredCodeException(_) => Some(IdentityError::ExpiredCode),
        ConfirmSignUpError::UserNotFoundException(_) => Some(IdentityError::UserNotFound),
        _ => None,
    }
}

/// Unknown users are reported like wrong passwords
fn initiate_auth_failure(err: &InitiateAuthError) -> Option<IdentityError> {
    match err {
        InitiateAuthError::NotAuthorizedException(_)
        | InitiateAuthError::UserNotFoundException(_) => Some(IdentityError::InvalidCredentials),
        InitiateAuthError::UserNotConfirmedException(_) => Some(IdentityError::NotConfirmed),
        _ => None,
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentity {
    async fn sign_up(&self, registration: &Registration) -> Result<(), IdentityError> {
        let email = AttributeType::builder()
            .name("email")
            .value(&registration.email)
            .build()
            .map_err(|e| backend("SignUp", e))?;

        let result = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(&registration.username)
            .password(&registration.password)
            .user_attributes(email)
            .set_secret_hash(self.secret_hash(&registration.username))
            .send()
            .await;

        match result {
            Ok(output) => {
                info!(
                    user_pool_id = %self.user_pool_id,
                    username = %registration.username,
                    confirmed = output.user_confirmed(),
                    "User signed up"
                );
                Ok(())
            }
            Err(err) => {
                let failure = err.as_service_error().and_then(sign_up_failure);
                Err(failure.unwrap_or_else(|| backend("SignUp", err)))
            }
        }
    }

    async fn confirm_sign_up(&self, username: &str, code: &str) -> Result<(), IdentityError> {
        let result = self
            .client
            .confirm_sign_up()
            .client_id(&self.client_id)
            .username(username)
            .confirmation_code(code)
            .set_secret_hash(self.secret_hash(username))
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(username, "User confirmed");
                Ok(())
            }
            Err(err) => {
                let failure = err.as_service_error().and_then(confirm_sign_up_failure);
                Err(failure.unwrap_or_else(|| backend("ConfirmSignUp", err)))
            }
        }
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<(), IdentityError> {
        let mut request = self
            .client
            .initiate_auth()
            .client_id(&self.client_id)
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .auth_parameters("USERNAME", username)
            .auth_parameters("PASSWORD", password);
        if let Some(hash) = self.secret_hash(username) {
            request = request.auth_parameters("SECRET_HASH", hash);
        }

        match request.send().await {
            Ok(output) => {
                if output.authentication_result().is_none() {
                    warn!(username, challenge = ?output.challenge_name(), "Unsupported auth challenge");
                    return Err(IdentityError::Backend(anyhow!(
                        "Cognito returned challenge {:?} instead of tokens",
                        output.challenge_name()
                    )));
                }
                info!(username, "User signed in");
                Ok(())
            }
            Err(err) => {
                let failure = err.as_service_error().and_then(initiate_auth_failure);
                Err(failure.unwrap_or_else(|| backend("InitiateAuth", err)))
            }
        }
    }
}
