/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod auth;
pub mod client;
pub mod cookies;
pub mod error;
pub mod order;
pub mod product;
pub(crate) mod refresh;
pub mod user;

pub use error::{MarketError, Result, USER_NOT_FOUND_MESSAGE};

pub use client::{ApiClient, ApiRequest, ClientConfig, DEFAULT_API_BASE_URL};
pub use cookies::CookieJar;
