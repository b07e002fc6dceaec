//! Auth session
//!
//! Exchanges credentials for a bearer token, keeps it in a [`KeyValueStore`]
//! and hands it to authenticated requests. Clones share one session.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use super::error::{parse_response, ClientError};
use crate::config::ClientConfig;
use crate::db::UserProfile;
use crate::routes::auth::{AuthResponse, VerifyResponse};
use crate::storage::KeyValueStore;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "authToken";

/// Storage key for the signed-in user's display name
pub const USER_NAME_KEY: &str = "currentUserName";

/// Token and profile of the signed-in user
#[derive(Debug, Clone, PartialEq)]
pub struct SignedIn {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthSessionInner>,
}

struct AuthSessionInner {
    http: reqwest::Client,
    api_url: String,
    storage: Arc<dyn KeyValueStore>,
    current: RwLock<Option<SignedIn>>,
}

#[derive(Serialize)]
struct SignupBody<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    registration_no: Option<&'a str>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl AuthSession {
    /// Create a signed-out session against `api_url` (e.g. `http://host/api`)
    pub fn new(api_url: impl Into<String>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, storage)
    }

    /// Create a signed-out session against the configured API
    pub fn from_config(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        Self::new(config.api_url.clone(), storage)
    }

    pub fn with_client(
        http: reqwest::Client,
        api_url: impl Into<String>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(AuthSessionInner {
                http,
                api_url,
                storage,
                current: RwLock::new(None),
            }),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.inner.api_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.inner.api_url, path)
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.current.read().as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.inner.current.read().as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.current.read().is_some()
    }

    /// Verify a stored token and sign in with it
    ///
    /// Any failure, including a network error, drops the stored token.
    pub async fn restore(&self) -> Option<UserProfile> {
        let token = match self.inner.storage.get(TOKEN_KEY).await {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored token");
                return None;
            }
        };

        match self.verify(&token).await {
            Ok(user) => {
                tracing::debug!(user_id = user.id, "Restored session");
                *self.inner.current.write() = Some(SignedIn {
                    token,
                    user: user.clone(),
                });
                Some(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "Stored token rejected, signing out");
                self.logout().await;
                None
            }
        }
    }

    async fn verify(&self, token: &str) -> Result<UserProfile, ClientError> {
        let response = self
            .http()
            .get(self.endpoint("/auth/verify"))
            .bearer_auth(token)
            .send()
            .await?;
        let body: VerifyResponse = parse_response(response, "Verification failed").await?;
        Ok(body.user)
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
        registration_no: Option<&str>,
    ) -> Result<UserProfile, ClientError> {
        require_credentials(email, password)?;
        let response = self
            .http()
            .post(self.endpoint("/auth/signup"))
            .json(&SignupBody {
                email,
                password,
                name,
                registration_no,
            })
            .send()
            .await?;
        let body: AuthResponse = parse_response(response, "Signup failed").await?;
        self.sign_in(body).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        require_credentials(email, password)?;
        let response = self
            .http()
            .post(self.endpoint("/auth/login"))
            .json(&LoginBody { email, password })
            .send()
            .await?;
        let body: AuthResponse = parse_response(response, "Login failed").await?;
        self.sign_in(body).await
    }

    async fn sign_in(&self, body: AuthResponse) -> Result<UserProfile, ClientError> {
        let storage = &self.inner.storage;
        storage.set(TOKEN_KEY, &body.token).await?;
        if let Err(e) = storage.set(USER_NAME_KEY, &body.user.name).await {
            // Never leave a token behind for a session that did not start
            if let Err(rollback) = storage.remove(TOKEN_KEY).await {
                tracing::warn!(error = %rollback, "Failed to roll back stored token");
            }
            return Err(e.into());
        }

        tracing::info!(user_id = body.user.id, "Signed in");
        let user = body.user.clone();
        *self.inner.current.write() = Some(SignedIn {
            token: body.token,
            user: body.user,
        });
        Ok(user)
    }

    /// Forget the token and the stored user name
    pub async fn logout(&self) {
        self.inner.current.write().take();
        for key in [TOKEN_KEY, USER_NAME_KEY] {
            if let Err(e) = self.inner.storage.remove(key).await {
                tracing::warn!(key = key, error = %e, "Failed to clear auth storage");
            }
        }
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), ClientError> {
    if email.is_empty() || password.is_empty() {
        return Err(ClientError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    /// Accepts every write except the user name
    struct NameRejectingStore(MemoryStore);

    #[async_trait::async_trait]
    impl KeyValueStore for NameRejectingStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == USER_NAME_KEY {
                return Err(StorageError::Backend("disk full".to_string()));
            }
            self.0.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key).await
        }
    }

    fn offline_session(storage: MemoryStore) -> AuthSession {
        // Port 9 (discard) is never served in tests
        AuthSession::new("http://127.0.0.1:9/api/", Arc::new(storage))
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let session = offline_session(MemoryStore::new());
        assert_eq!(session.api_url(), "http://127.0.0.1:9/api");
        assert_eq!(session.endpoint("/auth/login"), "http://127.0.0.1:9/api/auth/login");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_from_config_uses_api_url() {
        let config = ClientConfig {
            api_url: "http://reader.local:3001/api/".to_string(),
            ..ClientConfig::default()
        };
        let session = AuthSession::from_config(&config, Arc::new(MemoryStore::new()));
        assert_eq!(session.api_url(), "http://reader.local:3001/api");
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected_locally() {
        let session = offline_session(MemoryStore::new());
        assert!(matches!(
            session.login("", "secret").await,
            Err(ClientError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unverifiable_token_is_dropped() {
        let storage = MemoryStore::new();
        storage.set(TOKEN_KEY, "stale").await.unwrap();
        storage.set(USER_NAME_KEY, "Alice").await.unwrap();

        let session = offline_session(storage.clone());
        assert!(session.restore().await.is_none());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_failed_name_write_rolls_back_token() {
        let inner = MemoryStore::new();
        let session = AuthSession::new(
            "http://127.0.0.1:9/api",
            Arc::new(NameRejectingStore(inner.clone())),
        );
        let response = AuthResponse {
            message: "Login successful".to_string(),
            token: "token".to_string(),
            user: UserProfile {
                id: 1,
                email: "a@example.com".to_string(),
                name: "Alice".to_string(),
            },
        };

        let result = session.sign_in(response).await;
        assert!(matches!(result, Err(ClientError::Storage(_))));
        assert!(!session.is_authenticated());
        assert!(!inner.contains_key(TOKEN_KEY));
    }

    #[tokio::test]
    async fn test_restore_without_token() {
        let session = offline_session(MemoryStore::new());
        assert!(session.restore().await.is_none());
        assert!(session.token().is_none());
    }
}
