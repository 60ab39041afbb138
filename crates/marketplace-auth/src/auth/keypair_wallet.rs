/*
[INPUT]:  Ed25519 secret key bytes and messages to sign
[OUTPUT]: Aptos-style address, framed messages and hex signatures
[POS]:    Auth layer - local wallet provider for headless clients
[UPDATE]: When the signing framing or address derivation changes
*/

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest, Sha3_256};
use tokio::sync::broadcast;

use super::wallet::{
    NetworkInfo, ProviderError, ProviderResult, SignMessageRequest, SignMessageResponse,
    WalletAccount, WalletEvent, WalletProvider,
};

const SIGNING_PREFIX: &str = "APTOS";
/// Authentication key scheme byte for single Ed25519 keys
const ED25519_SCHEME: u8 = 0x00;

/// Ed25519 keypair acting as a wallet, framing messages the way Aptos wallets do
pub struct KeypairWallet {
    signing_key: SigningKey,
    address: String,
    network: NetworkInfo,
    connected: AtomicBool,
    events: broadcast::Sender<WalletEvent>,
}

impl std::fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("address", &self.address)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl KeypairWallet {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Create wallet from existing secret key bytes (32 bytes)
    pub fn from_secret_key(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = derive_address(&signing_key.verifying_key());
        let (events, _) = broadcast::channel(4);
        Self {
            signing_key,
            address,
            network: NetworkInfo::new("Testnet", Some(2)),
            connected: AtomicBool::new(false),
            events,
        }
    }

    pub fn with_network(mut self, network: NetworkInfo) -> Self {
        self.network = network;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// `0x`-prefixed hex public key
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.verifying_key().as_bytes()))
    }

    /// Get the raw secret key bytes
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Message actually signed for a `(message, nonce)` request
    pub fn frame(message: &str, nonce: &str) -> String {
        format!("{SIGNING_PREFIX}\nmessage: {message}\nnonce: {nonce}")
    }

    /// Verify a hex signature over `full_message`
    pub fn verify(&self, full_message: &str, signature_hex: &str) -> bool {
        let Ok(bytes) = hex::decode(signature_hex.trim_start_matches("0x")) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&bytes) else {
            return false;
        };
        self.signing_key
            .verifying_key()
            .verify(full_message.as_bytes(), &signature)
            .is_ok()
    }

    fn account(&self) -> WalletAccount {
        WalletAccount {
            address: self.address.clone(),
            public_key: self.public_key_hex(),
        }
    }
}

/// `0x` + hex(SHA3-256(public key || scheme))
fn derive_address(key: &VerifyingKey) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(key.as_bytes());
    hasher.update([ED25519_SCHEME]);
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[async_trait]
impl WalletProvider for KeypairWallet {
    fn name(&self) -> &str {
        "keypair"
    }

    async fn connect(&self) -> ProviderResult<WalletAccount> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.account())
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn account(&self) -> ProviderResult<Option<WalletAccount>> {
        Ok(self
            .connected
            .load(Ordering::SeqCst)
            .then(|| self.account()))
    }

    async fn network(&self) -> ProviderResult<NetworkInfo> {
        Ok(self.network.clone())
    }

    async fn is_connected(&self) -> ProviderResult<bool> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn sign_message(&self, request: &SignMessageRequest) -> ProviderResult<SignMessageResponse> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ProviderError::new("wallet is locked"));
        }
        let full_message = Self::frame(&request.message, &request.nonce);
        let signature = self.signing_key.sign(full_message.as_bytes());
        Ok(SignMessageResponse {
            signature: hex::encode(signature.to_bytes()),
            full_message,
            prefix: SIGNING_PREFIX.to_string(),
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_stable_for_key() {
        let seed = [7u8; 32];
        let a = KeypairWallet::from_secret_key(&seed);
        let b = KeypairWallet::from_secret_key(&seed);
        assert_eq!(a.address(), b.address());
        assert!(a.address().starts_with("0x"));
        assert_eq!(a.address().len(), 66);
        assert_ne!(a.address(), KeypairWallet::generate().address());
    }

    #[tokio::test]
    async fn test_sign_frames_and_verifies() {
        let wallet = KeypairWallet::generate();
        wallet.connect().await.unwrap();

        let request = SignMessageRequest {
            message: "hello".to_string(),
            nonce: "abc".to_string(),
        };
        let response = wallet.sign_message(&request).await.unwrap();

        assert_eq!(response.full_message, "APTOS\nmessage: hello\nnonce: abc");
        assert_eq!(hex::decode(&response.signature).unwrap().len(), 64);
        assert!(wallet.verify(&response.full_message, &response.signature));
        assert!(!wallet.verify("hello", &response.signature));
    }

    #[tokio::test]
    async fn test_locked_wallet_refuses_to_sign() {
        let wallet = KeypairWallet::generate();
        let request = SignMessageRequest {
            message: "hello".to_string(),
            nonce: "abc".to_string(),
        };
        assert!(wallet.sign_message(&request).await.is_err());
    }
}
