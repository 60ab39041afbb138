/*
[INPUT]:  A running marketplace backend (MARKETPLACE_API_URL, optional)
[OUTPUT]: Console output of the sign-in outcome
[POS]:    Examples - wallet signature login with a local keypair
[UPDATE]: When AuthSession or KeypairWallet API changes
*/

//! Example: sign in with a local Ed25519 keypair acting as the wallet
//!
//! Keys are stored under `./.marketplace/keys`; the session is kept in memory.

use std::sync::Arc;

use marketplace_auth::http::DEFAULT_API_BASE_URL;
use marketplace_auth::{
    ApiClient, AuthSession, Keystore, LoginOutcome, SessionStore, WalletAdapter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url =
        std::env::var("MARKETPLACE_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

    // Step 1: Load or create the wallet key
    let keystore = Keystore::new("./.marketplace/keys");
    let wallet = Arc::new(keystore.get_or_create("example")?);
    println!("=== Marketplace Keypair Login Example ===");
    println!("Wallet address: {}", wallet.address());

    // Step 2: Wire the session client
    let api = ApiClient::with_base_url(&base_url)?;
    let session = Arc::new(AuthSession::new(
        api,
        Arc::new(WalletAdapter::new(wallet)),
        Arc::new(SessionStore::in_memory()),
    ));
    let _listeners = session.spawn_listeners();

    // Step 3: Run the handshake
    match session.login().await? {
        LoginOutcome::Authenticated(user) => {
            println!("Signed in as {} <{}> ({})", user.name, user.email, user.role);
        }
        LoginOutcome::NeedsRegistration { wallet } => {
            println!("Wallet {wallet} has no account; call `session.register(details)`");
        }
    }

    session.logout().await;
    Ok(())
}
