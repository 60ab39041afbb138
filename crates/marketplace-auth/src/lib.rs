/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public marketplace auth crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod session;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    AuthChallenge,
    AuthSession,
    KeypairWallet,
    Keystore,
    LoginOutcome,
    LoginState,
    MockWalletProvider,
    WalletAdapter,
    WalletProvider,
    build_challenge,
};

// Re-export commonly used types from http
pub use http::{
    ApiClient,
    ClientConfig,
    CookieJar,
    MarketError,
    Result,
};

// Re-export commonly used types from session
pub use session::{
    Notice,
    Notifier,
    SessionEvent,
    SessionSnapshot,
    SessionStore,
};

// Re-export all types
pub use types::*;
