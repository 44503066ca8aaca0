//! Credential exchange and API key validation
//!
//! Sign-in posts the credentials together with the fixed client
//! identification constants and stores the returned access token with an
//! estimated expiry. Settings are only written on success.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::app::client::{HttpTransport, RequestBody};
use crate::app::models::{SignInRequest, SignInResponse};
use crate::app::race::{race_against_timer, Raced};
use crate::constants::{api, auth};
use crate::errors::{snippet, AuthError, AuthResult, TransportError};
use crate::settings::SettingsProvider;

/// Authentication timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfig {
    /// Estimated lifetime of an access token
    pub token_lifetime: Duration,
    /// Sign-in is abandoned after this long
    pub sign_in_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_lifetime: auth::TOKEN_LIFETIME,
            sign_in_timeout: auth::SIGN_IN_TIMEOUT,
        }
    }
}

/// Signs in and validates API keys against the configured server
#[derive(Debug, Clone)]
pub struct AuthService {
    transport: HttpTransport,
    config: AuthConfig,
}

impl AuthService {
    /// Create a service over the given transport
    pub fn new(transport: HttpTransport, config: AuthConfig) -> Self {
        Self { transport, config }
    }

    fn settings(&self) -> &Arc<dyn SettingsProvider> {
        self.transport.settings()
    }

    /// Exchange username and password for a bearer token
    ///
    /// On success the token and its estimated expiry are persisted and the
    /// token is returned.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - empty username or password
    /// * `AuthError::SignInRejected` - the server set its error flag
    /// * `AuthError::EmptyToken` - success reported without a token
    /// * `AuthError::Transport` - network failure or non-2xx without a message
    pub async fn sign_in(&self, username: &str, password: &str) -> AuthResult<String> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidInput {
                reason: "username is empty".to_string(),
            });
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput {
                reason: "password is empty".to_string(),
            });
        }

        let request = SignInRequest {
            username: username.to_string(),
            password: password.to_string(),
            client_type: auth::CLIENT_TYPE_ID.to_string(),
            auth: auth::AUTH_METHOD_ID.to_string(),
            os: auth::OS_ID.to_string(),
        };

        info!("Signing in as {}", username);
        let response = self
            .transport
            .send(
                Method::POST,
                api::SIGN_IN,
                RequestBody::json(&request)?,
                &[],
            )
            .await?;

        let parsed = response.json::<SignInResponse>();
        if !response.is_success() {
            let body = response.text();
            warn!(
                "Sign-in returned HTTP {}: {}",
                response.status,
                snippet(&body)
            );
            return match parsed {
                Ok(SignInResponse {
                    message: Some(message),
                    ..
                }) => Err(AuthError::SignInRejected { message }),
                _ => Err(AuthError::Transport(TransportError::Status {
                    status: response.status,
                    body,
                })),
            };
        }

        let parsed = parsed?;
        if parsed.error {
            let message = parsed
                .message
                .unwrap_or_else(|| "unknown error".to_string());
            warn!("Sign-in rejected: {}", message);
            return Err(AuthError::SignInRejected { message });
        }

        let token = parsed.tokens.access.trim().to_string();
        if token.is_empty() {
            warn!("Sign-in succeeded without an access token");
            return Err(AuthError::EmptyToken);
        }

        let lifetime = chrono::Duration::from_std(self.config.token_lifetime)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let mut settings = self.settings().load().await?;
        settings.auth_token = token.clone();
        settings.auth_token_expires_at = Some(Utc::now() + lifetime);
        self.settings().save(&settings).await?;

        info!("Signed in as {}", username);
        Ok(token)
    }

    /// [`sign_in`](Self::sign_in) raced against the configured timeout
    ///
    /// A sign-in that loses the race keeps running in the background and
    /// may still store its token.
    pub async fn sign_in_with_timeout(&self, username: &str, password: &str) -> AuthResult<String> {
        let service = self.clone();
        let username = username.to_string();
        let password = password.to_string();
        let limit = self.config.sign_in_timeout;

        match race_against_timer("sign-in", limit, async move {
            service.sign_in(&username, &password).await
        })
        .await
        {
            Raced::Completed(result) => result,
            Raced::TimedOut => Err(AuthError::TimedOut {
                seconds: limit.as_secs(),
            }),
        }
    }

    /// Whether the stored credentials are accepted by the job list endpoint
    ///
    /// Any status in [200, 404) counts as accepted; some servers answer an
    /// empty list with 404. Transport failures count as rejected.
    pub async fn validate_api_key(&self) -> bool {
        match self.transport.get_raw(api::JOB_LIST).await {
            Ok(response) => {
                let accepted = (200..404).contains(&response.status);
                debug!(
                    "API key probe returned HTTP {} (accepted: {})",
                    response.status, accepted
                );
                accepted
            }
            Err(e) => {
                warn!("API key probe failed: {}", e);
                false
            }
        }
    }

    /// Store an API key
    pub async fn set_api_key(&self, api_key: &str) -> AuthResult<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AuthError::InvalidInput {
                reason: "API key is empty".to_string(),
            });
        }

        let mut settings = self.settings().load().await?;
        settings.api_key = api_key.to_string();
        self.settings().save(&settings).await?;
        info!("Stored API key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::ClientConfig;
    use crate::settings::{MemorySettingsStore, Settings};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer, config: AuthConfig) -> (AuthService, MemorySettingsStore) {
        let store = MemorySettingsStore::new(Settings {
            base_url: format!("{}/api/v1", server.uri()),
            ..Settings::default()
        });
        let client = ClientConfig::default().build_http_client().unwrap();
        let transport = HttpTransport::new(client, Arc::new(store.clone()));
        (AuthService::new(transport, config), store)
    }

    #[tokio::test]
    async fn test_sign_in_stores_token_and_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/user/signin"))
            .and(body_partial_json(serde_json::json!({
                "username": "alice",
                "password": "pw",
                "type": auth::CLIENT_TYPE_ID,
                "auth": auth::AUTH_METHOD_ID,
                "os": auth::OS_ID,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"tokens":{"access":"tok-1","refresh":"r"},"error":false}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let (service, store) = service_for(&server, AuthConfig::default());
        let before = Utc::now();
        let token = service.sign_in("alice", "pw").await.unwrap();

        assert_eq!(token, "tok-1");
        let settings = store.load().await.unwrap();
        assert_eq!(settings.auth_token, "tok-1");
        let expiry = settings.auth_token_expires_at.unwrap();
        assert!(expiry >= before + chrono::Duration::minutes(59));
        assert!(expiry <= Utc::now() + chrono::Duration::minutes(61));
        assert!(!settings.token_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_sign_in_error_flag_leaves_settings_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/user/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"tokens":{"access":"","refresh":""},"error":true,"message":"bad password"}"#,
            ))
            .mount(&server)
            .await;

        let (service, store) = service_for(&server, AuthConfig::default());
        let before = store.load().await.unwrap();

        match service.sign_in("alice", "wrong").await {
            Err(AuthError::SignInRejected { message }) => assert_eq!(message, "bad password"),
            other => panic!("Expected SignInRejected, got {:?}", other),
        }
        assert_eq!(store.load().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_sign_in_empty_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/user/signin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"tokens":{"access":"  "},"error":false}"#),
            )
            .mount(&server)
            .await;

        let (service, store) = service_for(&server, AuthConfig::default());
        assert!(matches!(
            service.sign_in("alice", "pw").await,
            Err(AuthError::EmptyToken)
        ));
        assert!(store.load().await.unwrap().auth_token.is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_http_error_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/user/signin"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":true,"message":"locked"}"#),
            )
            .mount(&server)
            .await;
        let (service, _) = service_for(&server, AuthConfig::default());
        assert!(matches!(
            service.sign_in("alice", "pw").await,
            Err(AuthError::SignInRejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_sign_in_rejects_blank_input() {
        let server = MockServer::start().await;
        let (service, _) = service_for(&server, AuthConfig::default());
        assert!(matches!(
            service.sign_in("  ", "pw").await,
            Err(AuthError::InvalidInput { .. })
        ));
        assert!(matches!(
            service.sign_in("alice", "").await,
            Err(AuthError::InvalidInput { .. })
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/user/signin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"tokens":{"access":"late"},"error":false}"#)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = AuthConfig {
            sign_in_timeout: Duration::from_millis(50),
            ..AuthConfig::default()
        };
        let (service, _) = service_for(&server, config);
        assert!(matches!(
            service.sign_in_with_timeout("alice", "pw").await,
            Err(AuthError::TimedOut { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_api_key_status_window() {
        for (status, expected) in [(200, true), (204, true), (302, true), (403, false), (404, false), (500, false)] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/v1/integration/job/list"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let (service, _) = service_for(&server, AuthConfig::default());
            assert_eq!(service.validate_api_key().await, expected, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_validate_api_key_transport_failure_is_rejection() {
        let store = MemorySettingsStore::default();
        let client = ClientConfig::default().build_http_client().unwrap();
        let service = AuthService::new(
            HttpTransport::new(client, Arc::new(store)),
            AuthConfig::default(),
        );
        assert!(!service.validate_api_key().await);
    }

    #[tokio::test]
    async fn test_set_api_key() {
        let server = MockServer::start().await;
        let (service, store) = service_for(&server, AuthConfig::default());

        service.set_api_key("  key-42 ").await.unwrap();
        assert_eq!(store.load().await.unwrap().api_key, "key-42");
        assert!(service.set_api_key("").await.is_err());
    }
}
