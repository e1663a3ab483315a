use async_trait::async_trait;
use std::sync::Arc;

/// Bcrypt work factor used for every stored password.
pub const BCRYPT_COST: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// PasswordHasher
///
/// One-way, salted hashing of account secrets. `verify` never errors: a wrong
/// password and a corrupt stored hash are the same answer (`false`), so callers
/// can only ever report "invalid credentials".
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    async fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// HasherState
///
/// Shared handle to the hasher held in `AppState`.
pub type HasherState = Arc<dyn PasswordHasher>;

/// BcryptHasher
///
/// bcrypt with a fresh random salt per call. Hashing is CPU-bound on purpose, so both
/// operations run on tokio's blocking pool and never stall the request dispatch threads.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self { cost: BCRYPT_COST }
    }
}

impl BcryptHasher {
    /// Custom work factor. Tests use bcrypt's minimum (4) to stay fast.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let plaintext = plaintext.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || {
            bcrypt::hash(plaintext, cost).map_err(|e| PasswordError::Hashing(e.to_string()))
        })
        .await
        .map_err(|e| PasswordError::Hashing(format!("task join error: {e}")))?
    }

    async fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let plaintext = plaintext.to_string();
        let hash = hash.to_string();

        match tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "stored password hash could not be parsed");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptHasher {
        BcryptHasher::with_cost(4)
    }

    #[tokio::test]
    async fn hash_and_verify() {
        let hash = hasher().hash("senha123").await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(hasher().verify("senha123", &hash).await);
        assert!(!hasher().verify("senha124", &hash).await);
    }

    #[tokio::test]
    async fn same_plaintext_gets_a_fresh_salt() {
        let first = hasher().hash("senha123").await.unwrap();
        let second = hasher().hash("senha123").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn malformed_hash_is_a_plain_mismatch() {
        assert!(!hasher().verify("senha123", "not-a-bcrypt-hash").await);
        assert!(!hasher().verify("senha123", "").await);
    }

    #[test]
    fn default_cost_is_ten() {
        assert_eq!(BcryptHasher::default().cost, 10);
    }
}
