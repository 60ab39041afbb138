/*
[INPUT]:  Signed login/registration payloads
[OUTPUT]: Backend session cookies and auth responses
[POS]:    HTTP layer - auth endpoints (bypass the refresh interceptor)
[UPDATE]: When auth endpoints or payloads change
*/

use crate::http::{ApiClient, ApiRequest, Result};
use crate::types::{AuthResponse, LoginRequest, RefreshData, RegisterRequest};

impl ApiClient {
    /// Login with a wallet signature
    ///
    /// POST /v1/auth/login
    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        let request = ApiRequest::post("/v1/auth/login").json(req)?;
        self.request_direct(&request).await
    }

    /// Register a new wallet owner
    ///
    /// POST /v1/auth/register
    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        let request = ApiRequest::post("/v1/auth/register").json(req)?;
        self.request_direct(&request).await
    }

    /// Renew the session cookie
    ///
    /// POST /v1/auth/refresh
    pub async fn refresh_session(&self) -> Result<()> {
        self.request_direct::<RefreshData>(&ApiRequest::post("/v1/auth/refresh"))
            .await
            .map(|_| ())
    }

    /// Invalidate the server-side session
    ///
    /// POST /v1/auth/logout
    pub async fn logout(&self) -> Result<()> {
        self.request_direct::<serde_json::Value>(&ApiRequest::post("/v1/auth/logout"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{ApiClient, MarketError};
    use crate::types::{LoginRequest, RegisterRequest, RegistrationDetails, Role};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn login_request() -> LoginRequest {
        LoginRequest {
            wallet: "0xABCD".to_string(),
            signature: "sig1".to_string(),
            message: "APTOS\nmessage: hi\nnonce: n1".to_string(),
            nonce: "n1".to_string(),
            timestamp: 1_700_000_000_000,
            public_key: "0xpk".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_sends_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/login"))
            .and(body_json(serde_json::json!({
                "wallet": "0xABCD",
                "signature": "sig1",
                "message": "APTOS\nmessage: hi\nnonce: n1",
                "nonce": "n1",
                "timestamp": 1_700_000_000_000_i64,
                "publicKey": "0xpk",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {"accessToken": "a", "refreshToken": "r"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let response = client.login(&login_request()).await.unwrap();
        assert!(response.success);
        assert_eq!(
            response.data.unwrap().access_token.as_deref(),
            Some("a")
        );
    }

    #[tokio::test]
    async fn test_login_401_does_not_trigger_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "success": false,
                "message": "Invalid signature",
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut events = client.subscribe_session_events();
        let err = client.login(&login_request()).await.unwrap_err();
        assert!(matches!(err, MarketError::Api { code: 401, .. }));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_body_carries_form_and_signature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/register"))
            .and(body_json(serde_json::json!({
                "email": "ada@example.com",
                "name": "Ada",
                "country": "UK",
                "wallet": "0xABCD",
                "signature": "sig1",
                "message": "APTOS\nmessage: hi\nnonce: n1",
                "nonce": "n1",
                "role": "SELLER",
                "timestamp": 1_700_000_000_000_i64,
                "publicKey": "0xpk",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "success": true,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let details = RegistrationDetails {
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            country: "UK".to_string(),
            role: Role::Seller,
        };
        let request = RegisterRequest::new(details, &login_request());
        assert!(client.register(&request).await.unwrap().success);
    }
}
