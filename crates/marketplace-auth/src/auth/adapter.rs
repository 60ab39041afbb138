/*
[INPUT]:  A wallet provider (or none, when no wallet is installed)
[OUTPUT]: Typed, time-limited wallet operations with a cached account
[POS]:    Auth layer - wallet adapter used by the session client
[UPDATE]: When wallet error mapping or caching rules change
*/

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::http::{MarketError, Result};
use crate::types::{SignatureResult, UNKNOWN_BALANCE};

use super::wallet::{ProviderError, ProviderResult, SignMessageRequest, WalletEvent, WalletProvider};

/// Upper bounds for wallet calls that wait on the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletTimeouts {
    pub connect: Duration,
    pub sign: Duration,
    /// Read-only queries (account, network, balance, disconnect)
    pub query: Duration,
}

impl Default for WalletTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(60),
            sign: Duration::from_secs(120),
            query: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CachedAccount {
    address: Option<String>,
    public_key: Option<String>,
}

/// Wraps a [`WalletProvider`] with caching, timeouts and error mapping.
///
/// The cache lock is never held across an await, so account events can land
/// while a sign request is pending without affecting that request.
pub struct WalletAdapter {
    provider: Option<Arc<dyn WalletProvider>>,
    cache: Mutex<CachedAccount>,
    timeouts: WalletTimeouts,
}

impl fmt::Debug for WalletAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletAdapter")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("cache", &*self.cache())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl WalletAdapter {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self::detect(Some(provider))
    }

    /// Adapter over whatever provider was found; `None` means no wallet is installed
    pub fn detect(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            provider,
            cache: Mutex::new(CachedAccount::default()),
            timeouts: WalletTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: WalletTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Authorize with the wallet and cache the account
    pub async fn connect(&self) -> Result<String> {
        let provider = self.provider()?;
        let account = timed("wallet connect", self.timeouts.connect, provider.connect())
            .await?
            .map_err(|err| map_provider_error("Connection", err))?;

        if account.address.trim().is_empty() {
            return Err(MarketError::InvalidResponse(
                "No account returned from wallet".to_string(),
            ));
        }

        *self.cache() = CachedAccount {
            address: Some(account.address.clone()),
            public_key: Some(account.public_key).filter(|key| !key.is_empty()),
        };
        info!(provider = provider.name(), address = %account.address, "wallet connected");
        Ok(account.address)
    }

    /// Cached address, or the provider's current account
    pub async fn address(&self) -> Option<String> {
        if let Some(address) = self.cache().address.clone() {
            return Some(address);
        }
        self.refresh_account().await.map(|(address, _)| address)
    }

    /// Cached public key, or the provider's current account key
    pub async fn public_key(&self) -> Option<String> {
        if let Some(key) = self.cache().public_key.clone() {
            return Some(key);
        }
        self.refresh_account().await.map(|(_, key)| key)
    }

    /// Sign `message`; the returned `full_message` is the canonical signed payload
    pub async fn sign_message(&self, message: &str, nonce: &str) -> Result<SignatureResult> {
        let provider = self.provider()?;
        if self.cache().address.is_none() {
            return Err(MarketError::NotConnected);
        }

        let request = SignMessageRequest {
            message: message.to_string(),
            nonce: nonce.to_string(),
        };
        let response = timed("wallet signature", self.timeouts.sign, provider.sign_message(&request))
            .await?
            .map_err(|err| map_provider_error("Signature", err))?;

        if response.signature.is_empty() {
            return Err(MarketError::InvalidResponse(
                "Failed to get signature from wallet".to_string(),
            ));
        }

        let full_message = if response.full_message.is_empty() {
            debug!("wallet returned no framed message, using challenge as signed payload");
            request.message
        } else {
            response.full_message
        };

        Ok(SignatureResult {
            signature: response.signature,
            full_message,
        })
    }

    /// Best-effort provider disconnect; the local cache is always cleared
    pub async fn disconnect(&self) {
        if let Some(provider) = &self.provider {
            match timed("wallet disconnect", self.timeouts.query, provider.disconnect()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "wallet disconnect failed"),
                Err(err) => warn!(error = %err, "wallet disconnect failed"),
            }
        }
        self.reset();
    }

    /// Forget the cached account without talking to the wallet
    pub fn reset(&self) {
        *self.cache() = CachedAccount::default();
    }

    /// Balance for display; [`UNKNOWN_BALANCE`] when it cannot be read
    pub async fn balance(&self, address: &str) -> String {
        let Some(provider) = &self.provider else {
            return UNKNOWN_BALANCE.to_string();
        };
        match timed("wallet balance", self.timeouts.query, provider.balance(address)).await {
            Ok(Ok(balance)) => balance,
            Ok(Err(err)) => {
                debug!(error = %err, "balance lookup failed");
                UNKNOWN_BALANCE.to_string()
            }
            Err(err) => {
                debug!(error = %err, "balance lookup failed");
                UNKNOWN_BALANCE.to_string()
            }
        }
    }

    /// Chain id of the wallet's network; `None` when it cannot be read
    pub async fn chain_id(&self) -> Option<u64> {
        let provider = self.provider.as_ref()?;
        match timed("wallet network", self.timeouts.query, provider.network()).await {
            Ok(Ok(network)) => Some(network.resolved_chain_id()),
            Ok(Err(err)) => {
                debug!(error = %err, "network lookup failed");
                None
            }
            Err(err) => {
                debug!(error = %err, "network lookup failed");
                None
            }
        }
    }

    pub async fn is_connected(&self) -> bool {
        let Some(provider) = &self.provider else {
            return false;
        };
        matches!(
            timed("wallet status", self.timeouts.query, provider.is_connected()).await,
            Ok(Ok(true))
        )
    }

    /// Wallet account/network events, if a wallet is installed
    pub fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        self.provider.as_ref().map(|provider| provider.subscribe())
    }

    pub fn cached_address(&self) -> Option<String> {
        self.cache().address.clone()
    }

    /// Apply an account switch reported by the wallet
    pub(crate) fn apply_account_change(&self, address: Option<&str>) {
        let mut cache = self.cache();
        match address {
            None => *cache = CachedAccount::default(),
            Some(address) if cache.address.as_deref() != Some(address) => {
                *cache = CachedAccount {
                    address: Some(address.to_string()),
                    public_key: None,
                };
            }
            Some(_) => {}
        }
    }

    fn provider(&self) -> Result<&Arc<dyn WalletProvider>> {
        self.provider.as_ref().ok_or(MarketError::WalletUnavailable)
    }

    async fn refresh_account(&self) -> Option<(String, String)> {
        let provider = self.provider.as_ref()?;
        let account = match timed("wallet account", self.timeouts.query, provider.account()).await {
            Ok(Ok(Some(account))) => account,
            Ok(Ok(None)) => return None,
            Ok(Err(err)) => {
                debug!(error = %err, "account lookup failed");
                return None;
            }
            Err(err) => {
                debug!(error = %err, "account lookup failed");
                return None;
            }
        };

        *self.cache() = CachedAccount {
            address: Some(account.address.clone()),
            public_key: Some(account.public_key.clone()),
        };
        Some((account.address, account.public_key))
    }

    fn cache(&self) -> MutexGuard<'_, CachedAccount> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run `future` with a deadline; the future is dropped on timeout
async fn timed<T, F>(operation: &str, limit: Duration, future: F) -> Result<ProviderResult<T>>
where
    F: Future<Output = ProviderResult<T>>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| MarketError::Timeout {
            operation: operation.to_string(),
            duration_ms: limit.as_millis() as u64,
        })
}

fn map_provider_error(action: &str, err: ProviderError) -> MarketError {
    if err.is_rejection() {
        MarketError::rejected(action)
    } else {
        MarketError::Wallet(err.message)
    }
}
