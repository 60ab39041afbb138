/*
[INPUT]:  Wallet extension capabilities (connect, sign, account, network)
[OUTPUT]: Provider trait consumed by the wallet adapter, plus a mock
[POS]:    Auth layer - wallet integration abstraction
[UPDATE]: When adding new wallet types or changing provider capabilities
*/

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;
const REJECTION_CODES: [&str; 2] = ["4001", "ACTION_REJECTED"];

/// Account exposed by the wallet after authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub address: String,
    pub public_key: String,
}

/// Network the wallet is pointed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub name: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

impl NetworkInfo {
    pub fn new(name: impl Into<String>, chain_id: Option<u64>) -> Self {
        Self {
            name: name.into(),
            chain_id,
        }
    }

    /// Numeric chain id, falling back to `Mainnet` = 1 and anything else = 2
    pub fn resolved_chain_id(&self) -> u64 {
        self.chain_id
            .unwrap_or(if self.name.eq_ignore_ascii_case("mainnet") { 1 } else { 2 })
    }
}

/// Payload handed to the wallet for signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageRequest {
    pub message: String,
    pub nonce: String,
}

/// What the wallet returns; `full_message` is what was actually signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageResponse {
    pub signature: String,
    pub full_message: String,
    pub prefix: String,
}

/// Asynchronous notifications from the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// New active account, or `None` when the wallet locked/disconnected
    AccountChanged(Option<String>),
    NetworkChanged(NetworkInfo),
}

/// Raw failure reported by a wallet provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// User declined in the wallet UI
    pub fn is_rejection(&self) -> bool {
        if let Some(code) = &self.code {
            if REJECTION_CODES.contains(&code.as_str()) {
                return true;
            }
        }
        let message = self.message.to_ascii_lowercase();
        message.contains("rejected") || message.contains("cancelled")
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Trait for wallet providers
///
/// Implement this for a browser extension bridge, a hardware wallet or a
/// local keypair. The adapter layers caching, timeouts and error mapping on
/// top, so implementations only report what the wallet says.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Human readable provider name, for logs
    fn name(&self) -> &str;

    /// Ask the wallet to authorize this client
    async fn connect(&self) -> ProviderResult<WalletAccount>;

    async fn disconnect(&self) -> ProviderResult<()>;

    /// Currently authorized account, if any
    async fn account(&self) -> ProviderResult<Option<WalletAccount>>;

    async fn network(&self) -> ProviderResult<NetworkInfo>;

    async fn is_connected(&self) -> ProviderResult<bool>;

    async fn sign_message(&self, request: &SignMessageRequest) -> ProviderResult<SignMessageResponse>;

    /// Native token balance as a decimal string
    async fn balance(&self, _address: &str) -> ProviderResult<String> {
        Err(ProviderError::new("balance lookup not supported"))
    }

    /// Account and network change notifications
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

#[derive(Debug, Default)]
struct MockScript {
    connect_error: Option<ProviderError>,
    sign_error: Option<ProviderError>,
    signatures: VecDeque<String>,
    sign_delay: Option<Duration>,
    connect_delay: Option<Duration>,
    sign_requests: Vec<SignMessageRequest>,
}

/// Scriptable wallet provider for testing
#[derive(Debug)]
pub struct MockWalletProvider {
    account: WalletAccount,
    network: NetworkInfo,
    balance: Option<String>,
    connected: AtomicBool,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    script: Mutex<MockScript>,
    events: broadcast::Sender<WalletEvent>,
}

impl MockWalletProvider {
    /// Create a mock that connects as `address` and signs with `sig-N` signatures
    pub fn new(address: &str, public_key: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            account: WalletAccount {
                address: address.to_string(),
                public_key: public_key.to_string(),
            },
            network: NetworkInfo::new("Testnet", Some(2)),
            balance: None,
            connected: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            script: Mutex::new(MockScript::default()),
            events,
        }
    }

    pub fn with_network(mut self, network: NetworkInfo) -> Self {
        self.network = network;
        self
    }

    pub fn with_balance(mut self, balance: &str) -> Self {
        self.balance = Some(balance.to_string());
        self
    }

    /// Queue signatures returned by successive `sign_message` calls
    pub fn queue_signatures<I, S>(&self, signatures: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script()
            .signatures
            .extend(signatures.into_iter().map(Into::into));
    }

    pub fn fail_connect(&self, error: ProviderError) {
        self.script().connect_error = Some(error);
    }

    pub fn fail_sign(&self, error: ProviderError) {
        self.script().sign_error = Some(error);
    }

    pub fn delay_sign(&self, delay: Duration) {
        self.script().sign_delay = Some(delay);
    }

    pub fn delay_connect(&self, delay: Duration) {
        self.script().connect_delay = Some(delay);
    }

    /// Push an event to every subscriber
    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn sign_requests(&self) -> Vec<SignMessageRequest> {
        self.script().sign_requests.clone()
    }

    /// Framing the mock applies, mirroring Aptos wallets
    pub fn frame(message: &str, nonce: &str) -> String {
        format!("APTOS\nmessage: {message}\nnonce: {nonce}")
    }

    fn script(&self) -> std::sync::MutexGuard<'_, MockScript> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> ProviderResult<WalletAccount> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, error) = {
            let script = self.script();
            (script.connect_delay, script.connect_error.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = error {
            return Err(error);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.account.clone())
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn account(&self) -> ProviderResult<Option<WalletAccount>> {
        Ok(self
            .connected
            .load(Ordering::SeqCst)
            .then(|| self.account.clone()))
    }

    async fn network(&self) -> ProviderResult<NetworkInfo> {
        Ok(self.network.clone())
    }

    async fn is_connected(&self) -> ProviderResult<bool> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn sign_message(&self, request: &SignMessageRequest) -> ProviderResult<SignMessageResponse> {
        let (delay, error, signature) = {
            let mut script = self.script();
            script.sign_requests.push(request.clone());
            let count = script.sign_requests.len();
            let signature = script
                .signatures
                .pop_front()
                .unwrap_or_else(|| format!("sig-{count}"));
            (script.sign_delay, script.sign_error.clone(), signature)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = error {
            return Err(error);
        }
        Ok(SignMessageResponse {
            signature,
            full_message: Self::frame(&request.message, &request.nonce),
            prefix: "APTOS".to_string(),
        })
    }

    async fn balance(&self, _address: &str) -> ProviderResult<String> {
        self.balance
            .clone()
            .ok_or_else(|| ProviderError::new("balance unavailable"))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("4001"), "whatever", true)]
    #[case(Some("ACTION_REJECTED"), "whatever", true)]
    #[case(None, "User rejected the request", true)]
    #[case(None, "Request cancelled", true)]
    #[case(Some("500"), "internal wallet error", false)]
    fn test_rejection_classification(
        #[case] code: Option<&str>,
        #[case] message: &str,
        #[case] rejected: bool,
    ) {
        let error = ProviderError {
            code: code.map(str::to_string),
            message: message.to_string(),
        };
        assert_eq!(error.is_rejection(), rejected);
    }

    #[test]
    fn test_chain_id_resolution() {
        assert_eq!(NetworkInfo::new("Mainnet", None).resolved_chain_id(), 1);
        assert_eq!(NetworkInfo::new("Testnet", None).resolved_chain_id(), 2);
        assert_eq!(NetworkInfo::new("Devnet", Some(150)).resolved_chain_id(), 150);
    }

    #[tokio::test]
    async fn test_mock_provider_signs_with_queue_then_counter() {
        let provider = MockWalletProvider::new("0xABCD", "0xpk");
        provider.queue_signatures(["sig1"]);
        provider.connect().await.unwrap();

        let request = SignMessageRequest {
            message: "hello".to_string(),
            nonce: "n".to_string(),
        };
        let first = provider.sign_message(&request).await.unwrap();
        let second = provider.sign_message(&request).await.unwrap();

        assert_eq!(first.signature, "sig1");
        assert_eq!(second.signature, "sig-2");
        assert_eq!(first.full_message, "APTOS\nmessage: hello\nnonce: n");
        assert_eq!(provider.sign_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_account_follows_connection() {
        let provider = MockWalletProvider::new("0xABCD", "0xpk");
        assert!(provider.account().await.unwrap().is_none());
        provider.connect().await.unwrap();
        assert!(provider.is_connected().await.unwrap());
        provider.disconnect().await.unwrap();
        assert!(provider.account().await.unwrap().is_none());
    }
}
