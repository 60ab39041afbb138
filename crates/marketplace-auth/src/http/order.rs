/*
[INPUT]:  Session cookie, order ids
[OUTPUT]: Typed orders for the signed-in user
[POS]:    HTTP layer - order endpoints (go through the refresh interceptor)
[UPDATE]: When adding new order endpoints
*/

use crate::http::client::path_id;
use crate::http::{ApiClient, Result};
use crate::types::Order;

impl ApiClient {
    /// Orders placed by (or sold to) the current user
    ///
    /// GET /v1/user/orders
    pub async fn user_orders(&self) -> Result<Vec<Order>> {
        self.get_data("/v1/user/orders").await
    }

    /// GET /v1/order/{id}
    pub async fn order(&self, id: &str) -> Result<Order> {
        self.get_data(&format!("/v1/order/{}", path_id(id)?)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::http::ApiClient;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_user_orders_and_detail() {
        let server = MockServer::start().await;
        let order = json!({
            "id": "o-1",
            "status": "PENDING",
            "createdAt": "2024-03-02T08:30:00Z",
            "product": {"name": "Ceramic mug", "price": 12.5, "images": [], "category": "home"},
            "buyer": {"id": "u-1", "name": "Ada", "email": "ada@example.com", "wallet": "0xABCD"}
        });
        Mock::given(method("GET"))
            .and(path("/v1/user/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [order.clone()]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/order/o-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": order
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let orders = client.user_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, "PENDING");

        let detail = client.order("o-1").await.unwrap();
        assert_eq!(detail.buyer.unwrap().wallet, "0xABCD");
        assert!(detail.transaction.is_none());
    }
}
