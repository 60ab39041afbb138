/*
[INPUT]:  Wallet address, nonce, epoch-ms timestamp
[OUTPUT]: Challenge text the backend reconstructs for verification
[POS]:    Auth layer - challenge construction
[UPDATE]: Only together with the backend's message format
*/

use chrono::Utc;
use rand::Rng;
use rand::rngs::OsRng;

use crate::types::{LoginRequest, SignatureResult};

const NONCE_LEN: usize = 13;
const NONCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Build the challenge text. Whitespace and line breaks are significant.
pub fn build_challenge(address: &str, nonce: &str, timestamp: i64) -> String {
    format!(
        "\nDATN Aptos Marketplace Authentication\n\n\
         Wallet: {address}\n\
         Nonce: {nonce}\n\
         Timestamp: {timestamp}\n\n\
         This signature proves wallet ownership. No gas cost."
    )
}

/// Random lowercase alphanumeric nonce from the OS RNG
pub fn generate_nonce() -> String {
    let mut rng = OsRng;
    (0..NONCE_LEN)
        .map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char)
        .collect()
}

/// One authentication attempt's challenge; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub address: String,
    pub nonce: String,
    pub timestamp: i64,
    pub message: String,
}

impl AuthChallenge {
    /// Fresh challenge with a new nonce and the current time
    pub fn new(address: &str) -> Self {
        Self::with_parts(address, generate_nonce(), Utc::now().timestamp_millis())
    }

    pub fn with_parts(address: &str, nonce: impl Into<String>, timestamp: i64) -> Self {
        let nonce = nonce.into();
        let message = build_challenge(address, &nonce, timestamp);
        Self {
            address: address.to_string(),
            nonce,
            timestamp,
            message,
        }
    }

    /// Login payload; the wallet's `full_message` replaces the local text
    pub fn into_login_request(self, signed: SignatureResult, public_key: String) -> LoginRequest {
        LoginRequest {
            wallet: self.address,
            signature: signed.signature,
            message: signed.full_message,
            nonce: self.nonce,
            timestamp: self.timestamp,
            public_key,
        }
    }
}
