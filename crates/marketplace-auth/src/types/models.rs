/*
[INPUT]:  API schema definitions and wallet provider output
[OUTPUT]: Session, user, product and order data structures
[POS]:    Data layer - domain models shared by auth, http and session
[UPDATE]: When API schema or session shape changes
*/

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Role;

/// Placeholder balance reported when the wallet cannot be queried
pub const UNKNOWN_BALANCE: &str = "0.0000";

/// Connected wallet as mirrored in the session store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub address: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    pub balance: String,
    pub connected: bool,
}

impl WalletSession {
    pub fn connected(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: None,
            chain_id: None,
            balance: UNKNOWN_BALANCE.to_string(),
            connected: true,
        }
    }

    /// Whether this session belongs to `address` (hex addresses compare case-insensitively)
    pub fn owns(&self, address: &str) -> bool {
        same_address(&self.address, address)
    }
}

/// Result of a wallet signature: `full_message` is the exact signed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureResult {
    pub signature: String,
    #[serde(rename = "fullMessage")]
    pub full_message: String,
}

/// Marketplace user resolved from `GET /v1/user/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub wallet: String,
    pub country: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Seller/buyer activity counters from `GET /v1/user/stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub active_listings: u64,
    pub total_orders: u64,
    pub completed_orders: u64,
    pub total_amount: f64,
    pub role: Role,
}

/// Seller shown on a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOwner {
    pub id: String,
    pub name: String,
    pub wallet: String,
    pub role: Role,
}

/// Marketplace listing from `/v1/product` and `/v1/user/products`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    pub is_available: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<ProductOwner>,
}

/// Product snapshot embedded in an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProduct {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBuyer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub wallet: String,
}

/// On-chain payment backing an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTransaction {
    pub id: String,
    pub tx_hash: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: String,
}

/// Order from `/v1/user/orders` and `/v1/order/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivery_code: Option<String>,
    pub product: OrderProduct,
    #[serde(default)]
    pub buyer: Option<OrderBuyer>,
    #[serde(default)]
    pub transaction: Option<OrderTransaction>,
}

pub(crate) fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserialize_camel_case() {
        let json = r#"{
            "id": "u-1",
            "email": "ada@example.com",
            "name": "Ada",
            "wallet": "0xABCD",
            "country": "UK",
            "role": "SELLER",
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let user: AuthenticatedUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Seller);
        assert!(user.created_at.is_some());
        assert!(user.updated_at.is_none());
    }

    #[test]
    fn test_product_price_from_json_number() {
        let json = r#"{
            "id": "p-1",
            "name": "Ceramic mug",
            "price": 12.5,
            "images": ["https://cdn.example.com/mug.png"],
            "category": "home",
            "isAvailable": true,
            "createdAt": "2024-03-01T10:00:00Z",
            "user": {"id": "u-2", "name": "Grace", "wallet": "0xBEEF", "role": "SELLER"}
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Decimal::new(125, 1));
        assert!(product.description.is_empty());
        assert_eq!(product.user.unwrap().role, Role::Seller);
    }

    #[test]
    fn test_order_with_transaction() {
        let json = r#"{
            "id": "o-1",
            "status": "COMPLETED",
            "createdAt": "2024-03-02T08:30:00Z",
            "deliveryCode": "X7Q2",
            "product": {"name": "Ceramic mug", "price": 12, "images": [], "category": "home"},
            "transaction": {"id": "t-1", "txHash": "0xfeed", "amount": 12, "status": "CONFIRMED"}
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.product.price, Decimal::new(12, 0));
        assert_eq!(order.transaction.unwrap().tx_hash, "0xfeed");
        assert!(order.buyer.is_none());
    }

    #[test]
    fn test_wallet_session_owns_ignores_case() {
        let session = WalletSession::connected("0xAbCd");
        assert!(session.owns("0xabcd"));
        assert!(!session.owns("0xabce"));
        assert_eq!(session.balance, UNKNOWN_BALANCE);
    }
}
