//! Shared fixtures for the API integration tests

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, RgbImage};
use photox_domain::{ClientConfig, ImageFile, TokenPair};
use photox_infra::{ApiClient, SessionEvents, TokenStore};
use wiremock::{Match, MockServer, Request};

/// Client wired to a mock server plus handles on its token store and
/// session events.
pub struct TestClient {
    pub client: ApiClient,
    pub tokens: Arc<TokenStore>,
    pub events: SessionEvents,
}

/// Build a client against `server`, optionally signed in with `tokens`.
pub async fn client_for(server: &MockServer, tokens: Option<TokenPair>) -> TestClient {
    let store = Arc::new(TokenStore::in_memory());
    if let Some(tokens) = tokens {
        store.store_tokens(tokens).await.expect("in-memory store accepts tokens");
    }
    let events = SessionEvents::new();
    let client = ApiClient::builder()
        .config(ClientConfig::new(server.uri(), Duration::from_secs(5)))
        .token_store(Arc::clone(&store))
        .session_observer(Arc::new(events.clone()))
        .build()
        .expect("client should build");

    TestClient { client, tokens: store, events }
}

/// Token pair with a refresh token
pub fn signed_in(access: &str) -> TokenPair {
    TokenPair::new(access, Some("refresh-token".to_string()))
}

/// Encoded PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("png encoding should succeed");
    bytes.into_inner()
}

pub fn png_file(name: &str, width: u32, height: u32) -> ImageFile {
    ImageFile::new(name, "image/png", png_bytes(width, height))
}

/// Matches requests whose raw body contains `needle`; multipart bodies are
/// not valid UTF-8 once they carry image bytes.
pub struct BodyContains(pub &'static str);

impl Match for BodyContains {
    fn matches(&self, request: &Request) -> bool {
        let needle = self.0.as_bytes();
        request.body.windows(needle.len()).any(|window| window == needle)
    }
}
