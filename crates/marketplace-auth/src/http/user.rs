/*
[INPUT]:  Session cookie
[OUTPUT]: Current user profile and activity stats
[POS]:    HTTP layer - user endpoints (go through the refresh interceptor)
[UPDATE]: When adding new user endpoints
*/

use crate::http::client::require_data;
use crate::http::{ApiClient, ApiRequest, Result};
use crate::types::{AuthenticatedUser, UpdateUserRequest, UserStats};

impl ApiClient {
    /// Fetch the user bound to the current session
    ///
    /// GET /v1/user/me
    pub async fn current_user(&self) -> Result<AuthenticatedUser> {
        self.get_data("/v1/user/me").await
    }

    /// Update name and/or country of the current user
    ///
    /// PATCH /v1/user/me
    pub async fn update_current_user(&self, req: &UpdateUserRequest) -> Result<()> {
        let request = ApiRequest::patch("/v1/user/me").json(req)?;
        self.request::<serde_json::Value>(&request).await.map(|_| ())
    }

    /// Activity counters for the current user
    ///
    /// GET /v1/user/stats
    pub async fn user_stats(&self) -> Result<UserStats> {
        let envelope = self
            .request::<UserStats>(&ApiRequest::get("/v1/user/stats"))
            .await?;
        require_data(envelope, "/v1/user/stats")
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{ApiClient, MarketError};
    use crate::types::{Role, UpdateUserRequest};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_current_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {
                    "id": "u-1",
                    "email": "ada@example.com",
                    "name": "Ada",
                    "wallet": "0xABCD",
                    "country": "UK",
                    "role": "BUYER"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let user = client.current_user().await.unwrap();
        assert_eq!(user.wallet, "0xABCD");
        assert_eq!(user.role, Role::Buyer);
    }

    #[tokio::test]
    async fn test_current_user_without_data_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true
            })))
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let err = client.current_user().await.unwrap_err();
        assert!(matches!(err, MarketError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_update_and_stats() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/user/me"))
            .and(body_json(serde_json::json!({"country": "FR"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "updated"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/user/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {
                    "activeListings": 3,
                    "totalOrders": 10,
                    "completedOrders": 8,
                    "totalAmount": 125.5,
                    "role": "SELLER"
                }
            })))
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let update = UpdateUserRequest {
            name: None,
            country: Some("FR".to_string()),
        };
        client.update_current_user(&update).await.unwrap();

        let stats = client.user_stats().await.unwrap();
        assert_eq!(stats.active_listings, 3);
        assert_eq!(stats.role, Role::Seller);
    }
}
