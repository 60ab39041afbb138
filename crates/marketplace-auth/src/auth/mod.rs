/*
[INPUT]:  Wallet providers, API client and session store
[OUTPUT]: Signed challenges, wallet adapter and the auth session client
[POS]:    Auth layer - wallet signature authentication
[UPDATE]: When auth flow or wallet integration changes
*/

pub mod adapter;
pub mod keypair_wallet;
pub mod keystore;
pub mod message;
pub mod session;
pub mod wallet;

pub use adapter::{WalletAdapter, WalletTimeouts};
pub use keypair_wallet::KeypairWallet;
pub use keystore::Keystore;
pub use message::{AuthChallenge, build_challenge, generate_nonce};
pub use session::{AuthSession, LoginOutcome, LoginState, SessionListeners};
pub use wallet::{
    MockWalletProvider, NetworkInfo, ProviderError, ProviderResult, SignMessageRequest,
    SignMessageResponse, WalletAccount, WalletEvent, WalletProvider,
};
