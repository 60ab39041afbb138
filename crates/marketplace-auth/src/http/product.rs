/*
[INPUT]:  Session cookie, product ids, new listings
[OUTPUT]: Typed marketplace listings
[POS]:    HTTP layer - product endpoints (go through the refresh interceptor)
[UPDATE]: When adding new product endpoints
*/

use crate::http::client::{path_id, require_data};
use crate::http::{ApiClient, ApiRequest, MarketError, Result};
use crate::types::{CreateProductRequest, Product};

impl ApiClient {
    /// All listings
    ///
    /// GET /v1/product
    pub async fn products(&self) -> Result<Vec<Product>> {
        self.get_data("/v1/product").await
    }

    /// GET /v1/product/{id}
    pub async fn product(&self, id: &str) -> Result<Product> {
        self.get_data(&format!("/v1/product/{}", path_id(id)?)).await
    }

    /// Publish a listing for the signed-in seller
    ///
    /// POST /v1/product
    pub async fn create_product(&self, req: &CreateProductRequest) -> Result<Product> {
        req.validate().map_err(MarketError::Validation)?;
        let request = ApiRequest::post("/v1/product").json(req)?;
        let envelope = self.request::<Product>(&request).await?;
        require_data(envelope, "/v1/product")
    }

    /// Listings owned by the current user
    ///
    /// GET /v1/user/products
    pub async fn user_products(&self) -> Result<Vec<Product>> {
        self.get_data("/v1/user/products").await
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{ApiClient, MarketError};
    use crate::types::CreateProductRequest;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn product_json(id: &str) -> Value {
        json!({
            "id": id,
            "name": "Ceramic mug",
            "price": 12.5,
            "description": "Hand thrown",
            "quantity": 4,
            "images": [],
            "category": "home",
            "isAvailable": true,
            "createdAt": "2024-03-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_list_and_get_products() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/product"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "ok",
                "data": [product_json("p-1"), product_json("p-2")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/product/p-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": product_json("p-2")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let products = client.products().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price, Decimal::new(125, 1));

        let product = client.product("p-2").await.unwrap();
        assert_eq!(product.quantity, Some(4));
    }

    #[tokio::test]
    async fn test_missing_product_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/product/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "message": "Product not found"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let err = client.product("gone").await.unwrap_err();
        assert!(matches!(err, MarketError::Api { code: 404, .. }));
        assert!(matches!(
            client.product("../user/me").await,
            Err(MarketError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_product_posts_listing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/product"))
            .and(body_json(json!({
                "name": "Ceramic mug",
                "price": 12.5,
                "description": "Hand thrown",
                "quantity": 4,
                "category": "home",
                "images": []
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "message": "Product created",
                "data": product_json("p-9")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut listing = CreateProductRequest {
            name: "Ceramic mug".to_string(),
            price: Decimal::new(125, 1),
            description: "Hand thrown".to_string(),
            quantity: 4,
            category: "home".to_string(),
            images: vec![],
        };
        let product = client.create_product(&listing).await.unwrap();
        assert_eq!(product.id, "p-9");

        listing.quantity = 0;
        assert!(matches!(
            client.create_product(&listing).await,
            Err(MarketError::Validation(_))
        ));
    }
}
