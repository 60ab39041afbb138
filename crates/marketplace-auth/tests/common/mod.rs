/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for marketplace-auth tests

#![allow(dead_code)]

use std::sync::Arc;

use marketplace_auth::{ApiClient, AuthSession, MockWalletProvider, SessionStore, WalletAdapter};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WALLET: &str = "0xABCD";
pub const PUBLIC_KEY: &str = "0xpk";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Backend user bound to `wallet`
pub fn user_json(wallet: &str) -> Value {
    json!({
        "id": "u-1",
        "email": "ada@example.com",
        "name": "Ada",
        "wallet": wallet,
        "country": "UK",
        "role": "BUYER"
    })
}

pub fn mock_provider() -> Arc<MockWalletProvider> {
    Arc::new(MockWalletProvider::new(WALLET, PUBLIC_KEY))
}

/// Session over `server` with an in-memory store
pub fn session_for(server: &MockServer, provider: Arc<MockWalletProvider>) -> Arc<AuthSession> {
    session_with_store(server, provider, Arc::new(SessionStore::in_memory()))
}

pub fn session_with_store(
    server: &MockServer,
    provider: Arc<MockWalletProvider>,
    store: Arc<SessionStore>,
) -> Arc<AuthSession> {
    let api = ApiClient::with_base_url(&server.uri()).expect("valid mock server url");
    session_with_api(api, provider, store)
}

pub fn session_with_api(
    api: ApiClient,
    provider: Arc<MockWalletProvider>,
    store: Arc<SessionStore>,
) -> Arc<AuthSession> {
    Arc::new(AuthSession::new(api, Arc::new(WalletAdapter::new(provider)), store))
}

pub async fn mount_login_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "user": user_json(WALLET) }
        })))
        .mount(server)
        .await;
}

pub async fn mount_current_user(server: &MockServer, wallet: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": user_json(wallet)
        })))
        .mount(server)
        .await;
}

/// JSON bodies of every request the server saw on `endpoint`
pub async fn bodies_for(server: &MockServer, endpoint: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == endpoint)
        .filter_map(|request| serde_json::from_slice(&request.body).ok())
        .collect()
}
