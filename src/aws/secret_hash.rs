use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Cognito `SECRET_HASH` generator
///
/// App clients created with a client secret require every user-facing call
/// to carry `Base64(HMAC_SHA256(client_secret, username + client_id))`.
/// See https://docs.aws.amazon.com/cognito/latest/developerguide/signing-up-users-in-your-app.html#cognito-user-pools-computing-secret-hash
#[derive(Clone)]
pub struct SecretHasher {
    client_id: String,
    client_secret: String,
}

impl SecretHasher {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// Compute the secret hash for `username`
    pub fn hash(&self, username: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.client_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(username.as_bytes());
        mac.update(self.client_id.as_bytes());

        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretHasher")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_username_then_client_id() {
        // Well-known vector: HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let hasher = SecretHasher::new("jumps over the lazy dog".to_string(), "key".to_string());
        assert_eq!(
            hasher.hash("The quick brown fox "),
            "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg="
        );
    }

    #[test]
    fn test_hash_depends_on_username() {
        let hasher = SecretHasher::new("client-id".to_string(), "client-secret".to_string());
        assert_eq!(
            hasher.hash("alice"),
            "qROqM+PMKX09MK8ulDVm8LCWdCRqQQEUG9HcF+N7/S4="
        );
        assert_ne!(hasher.hash("alice"), hasher.hash("bob"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let hasher = SecretHasher::new("client-id".to_string(), "client-secret".to_string());
        let rendered = format!("{hasher:?}");
        assert!(rendered.contains("client-id"));
        assert!(!rendered.contains("client-secret"));
    }
}
