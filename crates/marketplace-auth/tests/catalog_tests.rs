/*
[INPUT]:  Mock backend with an expiring session
[OUTPUT]: Test results for product and order clients behind the refresh interceptor
[POS]:    Integration tests - marketplace data endpoints
[UPDATE]: When product/order endpoints or refresh behavior change
*/

mod common;

use common::setup_mock_server;
use marketplace_auth::{ApiClient, MarketError, SessionEvent};
use serde_json::{Value, json};
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn order_json(id: &str) -> Value {
    json!({
        "id": id,
        "status": "COMPLETED",
        "createdAt": "2024-03-02T08:30:00Z",
        "product": {"name": "Ceramic mug", "price": 12.5, "images": [], "category": "home"}
    })
}

#[tokio::test]
async fn test_orders_refresh_then_retry() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/orders"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [order_json("o-1"), order_json("o-2")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(&server.uri()).unwrap();
    let mut events = api.subscribe_session_events();

    let orders = assert_ok!(api.user_orders().await);
    assert_eq!(orders.len(), 2);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_products_share_one_failed_refresh() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/products"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/order/o-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_delay(std::time::Duration::from_millis(200))
                .set_body_json(json!({ "message": "Refresh token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::with_base_url(&server.uri()).unwrap();
    let mut events = api.subscribe_session_events();

    let (products, order) = tokio::join!(api.user_products(), api.order("o-1"));
    let errors = [products.unwrap_err(), order.unwrap_err()];
    assert_eq!(
        errors
            .iter()
            .filter(|err| matches!(err, MarketError::SessionExpired))
            .count(),
        1
    );
    assert!(errors.iter().any(|err| matches!(err, MarketError::Api { code: 401, .. })));

    assert_eq!(events.recv().await.unwrap(), SessionEvent::Expired);
    assert!(events.try_recv().is_err());
}
