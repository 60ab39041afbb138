/*
[INPUT]:  Signed challenges and user supplied registration fields
[OUTPUT]: Request bodies for the auth, user and product endpoints
[POS]:    Data layer - request payloads
[UPDATE]: When request payloads change
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Role;

/// Body of `POST /v1/auth/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub wallet: String,
    pub signature: String,
    /// The full message the wallet signed, not the locally built challenge
    pub message: String,
    pub nonce: String,
    pub timestamp: i64,
    pub public_key: String,
}

/// Fields collected by the registration form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDetails {
    pub email: String,
    pub name: String,
    pub country: String,
    pub role: Role,
}

impl RegistrationDetails {
    /// Check the form the same way the storefront does before submitting
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name cannot be empty".to_string());
        }
        if self.country.trim().is_empty() {
            return Err("Country cannot be empty".to_string());
        }
        if !is_plausible_email(&self.email) {
            return Err(format!("Invalid email address: {}", self.email));
        }
        Ok(())
    }
}

/// Body of `POST /v1/auth/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub country: String,
    pub wallet: String,
    pub signature: String,
    pub message: String,
    pub nonce: String,
    pub role: Role,
    pub timestamp: i64,
    pub public_key: String,
}

impl RegisterRequest {
    pub fn new(details: RegistrationDetails, credentials: &LoginRequest) -> Self {
        Self {
            email: details.email,
            name: details.name,
            country: details.country,
            wallet: credentials.wallet.clone(),
            signature: credentials.signature.clone(),
            message: credentials.message.clone(),
            nonce: credentials.nonce.clone(),
            role: details.role,
            timestamp: credentials.timestamp,
            public_key: credentials.public_key.clone(),
        }
    }
}

/// Body of `PATCH /v1/user/me`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.country.is_none()
    }
}

/// Body of `POST /v1/product`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub quantity: u32,
    pub category: String,
    pub images: Vec<String>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name cannot be empty".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("Category cannot be empty".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err(format!("Price must be positive, got {}", self.price));
        }
        if self.quantity == 0 {
            return Err("Quantity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// `local@domain.tld` with no whitespace
fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
