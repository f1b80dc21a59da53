//! Account endpoints and session lifecycle
//!
//! Login stores the returned token pair in the client's [`TokenStore`];
//! logout clears it. Both go through the same store the request pipeline
//! reads, so the authenticated/unauthenticated signal stays consistent.
//!
//! [`TokenStore`]: crate::auth::TokenStore

use photox_core::SessionEndReason;
use photox_domain::TokenPair;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::client::ApiClient;
use super::errors::{ApiError, ValidationError};
use super::request::{ApiRequest, RequestKind};
use super::types::LoginResponse;

const LOGIN_PATH: &str = "/users/login/";
const REGISTER_PATH: &str = "/users/register/";
const CURRENT_USER_PATH: &str = "/users/me/";
const CHANGE_PASSWORD_PATH: &str = "/users/password/change/";

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|err| ApiError::Internal(format!("failed to encode request body: {err}")))
}

/// Authentication service
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token pair and store it.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingField`] before any request for an empty
    ///   username or password
    /// - [`ApiError::InvalidCredentials`] on a 401; login never triggers a
    ///   token refresh
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        if username.trim().is_empty() {
            return Err(ValidationError::MissingField("username").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let request = ApiRequest::post(LOGIN_PATH)
            .json(json!({ "username": username, "password": password }))
            .kind(RequestKind::Login);
        let response: LoginResponse = self.client.send(request).await?;

        self.client
            .tokens()
            .store_tokens(TokenPair::new(response.access.clone(), response.refresh.clone()))
            .await?;
        info!("Signed in");
        Ok(response)
    }

    #[instrument(skip(self, user))]
    pub async fn register<B: Serialize>(&self, user: &B) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::post(REGISTER_PATH).json(encode(user)?)).await
    }

    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(CURRENT_USER_PATH)).await
    }

    #[instrument(skip(self, user))]
    pub async fn update_user<B: Serialize>(&self, user: &B) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::put(CURRENT_USER_PATH).json(encode(user)?)).await
    }

    #[instrument(skip(self, passwords))]
    pub async fn change_password<B: Serialize>(&self, passwords: &B) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::put(CHANGE_PASSWORD_PATH).json(encode(passwords)?)).await
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Shares the refresh coordinator with the request pipeline, so this
    /// never runs alongside an automatic refresh.
    ///
    /// # Errors
    ///
    /// [`ApiError::SessionExpired`] when no refresh token is stored or the
    /// server rejects it; the session is torn down in both cases
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.client.refresh().await
    }

    /// Clear both tokens and notify the session observer
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.client.coordinator().end_session(SessionEndReason::LoggedOut).await;
        info!("Signed out");
    }

    pub async fn is_authenticated(&self) -> bool {
        self.client.is_authenticated().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use photox_domain::ClientConfig;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{SessionEvents, TokenStore};

    async fn auth_for(
        server: &MockServer,
        tokens: Option<TokenPair>,
    ) -> (AuthApi, SessionEvents) {
        let store = Arc::new(TokenStore::in_memory());
        if let Some(tokens) = tokens {
            store.store_tokens(tokens).await.unwrap();
        }
        let events = SessionEvents::new();
        let client = ApiClient::builder()
            .config(ClientConfig::new(server.uri(), Duration::from_secs(5)))
            .token_store(store)
            .session_observer(Arc::new(events.clone()))
            .build()
            .unwrap();
        (AuthApi::new(client), events)
    }

    #[tokio::test]
    async fn login_stores_token_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({"username": "ada", "password": "s3cret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "access-1",
                "refresh": "refresh-1",
                "user": {"username": "ada"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (auth, _) = auth_for(&server, None).await;
        let response = auth.login("ada", "s3cret").await.unwrap();

        assert_eq!(response.extra["user"]["username"], "ada");
        assert!(auth.is_authenticated().await);
        assert_eq!(auth.client.tokens().refresh_token().await.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn empty_credentials_never_reach_the_server() {
        let server = MockServer::start().await;
        let (auth, _) = auth_for(&server, None).await;

        let err = auth.login("  ", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ValidationError::MissingField("username"))));

        let err = auth.login("ada", "").await.unwrap_err();
        assert_eq!(err.to_string(), "password is required");

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn explicit_refresh_rotates_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/token/refresh/"))
            .and(body_json(json!({"refresh": "refresh-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
            .expect(1)
            .mount(&server)
            .await;

        let (auth, _) =
            auth_for(&server, Some(TokenPair::new("access-1", Some("refresh-1".into())))).await;
        auth.refresh().await.unwrap();

        assert_eq!(auth.client.tokens().access_token().await.as_deref(), Some("access-2"));
        assert_eq!(auth.client.tokens().refresh_token().await.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn logout_clears_tokens_and_notifies() {
        let server = MockServer::start().await;
        let (auth, events) =
            auth_for(&server, Some(TokenPair::new("access-1", Some("refresh-1".into())))).await;
        let mut ended = events.subscribe();

        auth.logout().await;

        assert!(!auth.is_authenticated().await);
        assert_eq!(ended.recv().await.unwrap(), SessionEndReason::LoggedOut);
    }
}
