//! Integration tests for the token refresh path
//!
//! **Coverage:**
//! - Concurrent 401s share one refresh and all succeed on replay
//! - A rejected refresh tears the session down once
//! - Login failures never reach the refresh endpoint

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::time::Duration;

use futures::future::join_all;
use photox_core::SessionEndReason;
use photox_domain::TokenPair;
use photox_infra::{ApiError, ApiRequest, AuthApi};
use serde_json::json;
use support::{client_for, signed_in};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REFRESH_PATH: &str = "/users/token/refresh/";

async fn mount_protected_resource(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ada"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;
    mount_protected_resource(&server).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "fresh"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let test = client_for(&server, Some(signed_in("stale"))).await;
    let calls =
        (0..4).map(|_| test.client.execute(ApiRequest::get("/users/me/"))).collect::<Vec<_>>();
    let results = join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap(), json!({"username": "ada"}));
    }
    assert_eq!(test.tokens.access_token().await.as_deref(), Some("fresh"));
    assert_eq!(test.tokens.refresh_token().await.as_deref(), Some("refresh-token"));
    assert!(!test.client.coordinator().is_refreshing());
}

#[tokio::test]
async fn rejected_refresh_ends_the_session() {
    let server = MockServer::start().await;
    mount_protected_resource(&server).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Token is invalid or expired"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let test = client_for(&server, Some(signed_in("stale"))).await;
    let mut ended = test.events.subscribe();

    let first = test.client.execute(ApiRequest::get("/users/me/"));
    let second = test.client.execute(ApiRequest::get("/users/me/"));
    let (first, second) = tokio::join!(first, second);

    let errors = [first.unwrap_err(), second.unwrap_err()];
    let expired =
        errors.iter().filter(|err| matches!(err, ApiError::SessionExpired { .. })).count();
    let unauthorized = errors.iter().filter(|err| matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(expired, 1, "only the call that started the refresh sees the expiry");
    assert_eq!(unauthorized.count(), 1, "the waiting call gets its own 401 back");

    assert!(!test.client.is_authenticated().await);
    assert_eq!(ended.recv().await.unwrap(), SessionEndReason::RefreshFailed);
    assert!(ended.try_recv().is_err(), "the session ends exactly once");
}

#[tokio::test]
async fn unauthorized_without_refresh_token_skips_the_exchange() {
    let server = MockServer::start().await;
    mount_protected_resource(&server).await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "fresh"})))
        .expect(0)
        .mount(&server)
        .await;

    let test = client_for(&server, Some(TokenPair::new("stale", None))).await;
    let err = test.client.execute(ApiRequest::get("/users/me/")).await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired { .. }));
    assert_eq!(err.to_string(), "session expired, please sign in again");
    assert!(!test.client.is_authenticated().await);
}

#[tokio::test]
async fn failed_login_reports_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "bad"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let test = client_for(&server, None).await;
    let err = AuthApi::new(test.client.clone()).login("ada", "wrong").await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidCredentials { .. }));
    assert_eq!(err.status_code(), Some(401));
}
