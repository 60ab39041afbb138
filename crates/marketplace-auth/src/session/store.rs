/*
[INPUT]:  Wallet sessions and users from the auth client, wallet events
[OUTPUT]: Observable, persisted session snapshot
[POS]:    Session layer - the single shared mutable session state
[UPDATE]: When session fields or the user/wallet invariant change
*/

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

use crate::http::{MarketError, Result};
use crate::types::{AuthenticatedUser, WalletSession};

use super::persist::SessionFile;

/// Whole-store value; every write replaces it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub wallet: Option<WalletSession>,
    #[serde(default)]
    pub user: Option<AuthenticatedUser>,
}

impl SessionSnapshot {
    /// Connected wallet with a user bound to it
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.is_consistent()
    }

    /// A user only exists alongside a connected wallet with the same address
    pub fn is_consistent(&self) -> bool {
        match (&self.user, &self.wallet) {
            (None, _) => true,
            (Some(user), Some(wallet)) => wallet.connected && wallet.owns(&user.wallet),
            (Some(_), None) => false,
        }
    }

    /// Drop whatever breaks the user/wallet invariant
    pub fn sanitize(mut self) -> Self {
        if self.wallet.as_ref().is_some_and(|wallet| !wallet.connected) {
            self.wallet = None;
        }
        if !self.is_consistent() {
            debug!("discarding user without a matching connected wallet");
            self.user = None;
        }
        self
    }
}

/// Injectable session store with `watch` subscription.
///
/// Readers never block. Writers queue on `writer`, which is held across the
/// state replacement and the file write so persisted order matches publish
/// order.
#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<SessionSnapshot>,
    writer: Mutex<Option<SessionFile>>,
}

impl SessionStore {
    /// Store without persistence
    pub fn in_memory() -> Self {
        Self {
            state: watch::Sender::new(SessionSnapshot::default()),
            writer: Mutex::new(None),
        }
    }

    /// Rehydrate from `path`, persisting every later write back to it
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = SessionFile::new(path);
        let snapshot = file.load().await?;
        info!(
            path = %file.path().display(),
            authenticated = snapshot.is_authenticated(),
            "session store opened"
        );
        Ok(Self {
            state: watch::Sender::new(snapshot),
            writer: Mutex::new(Some(file)),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn wallet(&self) -> Option<WalletSession> {
        self.state.borrow().wallet.clone()
    }

    pub fn user(&self) -> Option<AuthenticatedUser> {
        self.state.borrow().user.clone()
    }

    /// Record a connected wallet; a user bound to another address is dropped
    pub async fn connect_wallet(&self, wallet: WalletSession) -> Result<()> {
        self.write(|state| {
            if state
                .user
                .as_ref()
                .is_some_and(|user| !wallet.owns(&user.wallet))
            {
                state.user = None;
            }
            state.wallet = Some(wallet);
            Ok(())
        })
        .await
    }

    /// Bind `user`; rejected unless the connected wallet has the same address
    pub async fn set_user(&self, user: AuthenticatedUser) -> Result<()> {
        self.write(|state| {
            match &state.wallet {
                Some(wallet) if wallet.connected && wallet.owns(&user.wallet) => {}
                Some(wallet) => {
                    return Err(MarketError::InvalidState(format!(
                        "user wallet {} does not match connected wallet {}",
                        user.wallet, wallet.address
                    )));
                }
                None => {
                    return Err(MarketError::InvalidState(
                        "cannot set user without a connected wallet".to_string(),
                    ));
                }
            }
            state.user = Some(user);
            Ok(())
        })
        .await
    }

    pub async fn update_balance(&self, balance: String) -> Result<()> {
        self.write(|state| {
            if let Some(wallet) = state.wallet.as_mut() {
                wallet.balance = balance;
            }
            Ok(())
        })
        .await
    }

    pub async fn update_chain_id(&self, chain_id: Option<u64>) -> Result<()> {
        self.write(|state| {
            if let Some(wallet) = state.wallet.as_mut() {
                wallet.chain_id = chain_id;
            }
            Ok(())
        })
        .await
    }

    /// Wallet switched accounts (`None` = locked or disconnected)
    pub async fn account_changed(&self, address: Option<&str>) -> Result<()> {
        self.write(|state| {
            match address {
                None => *state = SessionSnapshot::default(),
                Some(address) if state.wallet.as_ref().is_some_and(|w| w.owns(address)) => {}
                Some(address) => {
                    let chain_id = state.wallet.as_ref().and_then(|w| w.chain_id);
                    let mut wallet = WalletSession::connected(address);
                    wallet.chain_id = chain_id;
                    state.wallet = Some(wallet);
                    state.user = None;
                }
            }
            Ok(())
        })
        .await
    }

    /// Reset to the unauthenticated, disconnected state
    pub async fn clear(&self) -> Result<()> {
        self.write(|state| {
            *state = SessionSnapshot::default();
            Ok(())
        })
        .await
    }

    async fn write<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut SessionSnapshot) -> Result<()>,
    {
        let writer = self.writer.lock().await;

        let mut next = self.state.borrow().clone();
        update(&mut next)?;
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });

        if changed {
            if let Some(file) = writer.as_ref() {
                file.save(&next).await?;
            }
        }
        Ok(())
    }
}
