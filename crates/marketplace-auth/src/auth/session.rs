/*
[INPUT]:  Wallet adapter, API client, session store
[OUTPUT]: Login/register/logout orchestration and observable login state
[POS]:    Auth layer - drives the wallet signature handshake end to end
[UPDATE]: When auth flow steps, notices or teardown rules change
*/

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::http::{ApiClient, MarketError, Result};
use crate::session::{Notice, Notifier, SessionEvent, SessionStore};
use crate::types::{
    AuthenticatedUser, LoginRequest, RegisterRequest, RegistrationDetails, UpdateUserRequest,
    WalletSession,
};

use super::adapter::WalletAdapter;
use super::message::AuthChallenge;
use super::wallet::WalletEvent;

/// Where the current authentication attempt stands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoginState {
    #[default]
    Idle,
    Connecting,
    Signing,
    Verifying,
    Authenticated,
    /// Wallet is connected but the backend has no account for it
    NeedsRegistration { wallet: String },
    Failed { reason: String },
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginState::Idle => write!(f, "idle"),
            LoginState::Connecting => write!(f, "connecting"),
            LoginState::Signing => write!(f, "signing"),
            LoginState::Verifying => write!(f, "verifying"),
            LoginState::Authenticated => write!(f, "authenticated"),
            LoginState::NeedsRegistration { wallet } => write!(f, "needs registration ({wallet})"),
            LoginState::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of a login attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(AuthenticatedUser),
    NeedsRegistration { wallet: String },
}

/// Orchestrates wallet connect, challenge signing and backend verification.
///
/// One attempt runs at a time; a second `login`/`register` while one is in
/// flight fails with [`MarketError::AttemptInProgress`]. Any unrecoverable
/// error resets the wallet cache and the store to unauthenticated.
#[derive(Debug)]
pub struct AuthSession {
    api: ApiClient,
    wallet: Arc<WalletAdapter>,
    store: Arc<SessionStore>,
    notifier: Notifier,
    state: watch::Sender<LoginState>,
    attempt: Mutex<()>,
}

impl AuthSession {
    pub fn new(api: ApiClient, wallet: Arc<WalletAdapter>, store: Arc<SessionStore>) -> Self {
        Self {
            api,
            wallet,
            store,
            notifier: Notifier::new(),
            state: watch::Sender::new(LoginState::Idle),
            attempt: Mutex::new(()),
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn wallet(&self) -> &Arc<WalletAdapter> {
        &self.wallet
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn state(&self) -> LoginState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LoginState> {
        self.state.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }

    /// Full handshake: connect, sign a fresh challenge, verify, load the user
    pub async fn login(&self) -> Result<LoginOutcome> {
        let _attempt = self
            .attempt
            .try_lock()
            .map_err(|_| MarketError::AttemptInProgress)?;

        match self.run_login().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.fail(&err).await;
                Err(err)
            }
        }
    }

    /// Create the backend account for the connected wallet, then sign in.
    ///
    /// The registration signature is reused for the immediate login: the
    /// signed payload is identical and the form fields are not part of it.
    pub async fn register(&self, details: RegistrationDetails) -> Result<AuthenticatedUser> {
        let _attempt = self
            .attempt
            .try_lock()
            .map_err(|_| MarketError::AttemptInProgress)?;

        details.validate().map_err(MarketError::Validation)?;
        let address = self.wallet.cached_address().ok_or(MarketError::NotConnected)?;

        match self.run_register(&address, details).await {
            Ok(user) => Ok(user),
            Err(err) => {
                self.fail(&err).await;
                Err(err)
            }
        }
    }

    /// Backend logout (errors ignored), then local teardown including the
    /// cookie jar. Idempotent.
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            warn!(error = %err, "backend logout failed, clearing local session anyway");
        }
        self.wallet.disconnect().await;
        self.clear_local().await;
        self.set_state(LoginState::Idle);
        self.notifier.success("Logged out successfully");
    }

    /// Re-fetch the current user and store it
    pub async fn refresh_user(&self) -> Result<AuthenticatedUser> {
        let user = self.api.current_user().await?;
        self.store.set_user(user.clone()).await?;
        Ok(user)
    }

    /// `PATCH /v1/user/me`, then re-hydrate the stored user
    pub async fn update_profile(&self, update: UpdateUserRequest) -> Result<AuthenticatedUser> {
        let result = self.run_update_profile(update).await;
        match &result {
            Ok(_) => self.notifier.success("Profile updated successfully"),
            Err(err) => self.notifier.error(err.user_message()),
        }
        result
    }

    /// Validate a rehydrated session against the backend.
    ///
    /// Auth and not-found errors clear the store; network errors keep the
    /// persisted state and are returned.
    pub async fn restore(&self) -> Result<Option<AuthenticatedUser>> {
        let snapshot = self.store.snapshot();
        let (Some(wallet), Some(_)) = (snapshot.wallet, snapshot.user) else {
            debug!("no persisted session to restore");
            return Ok(None);
        };

        match self.api.current_user().await {
            Ok(user) if wallet.owns(&user.wallet) => {
                self.store.set_user(user.clone()).await?;
                self.set_state(LoginState::Authenticated);
                info!(wallet = %wallet.address, "session restored");
                Ok(Some(user))
            }
            Ok(user) => {
                warn!(stored = %wallet.address, backend = %user.wallet, "restored user belongs to another wallet");
                self.clear_local().await;
                Ok(None)
            }
            Err(err) if err.is_auth_error() || err.is_not_registered() => {
                info!(error = %err, "persisted session rejected by backend");
                self.clear_local().await;
                self.set_state(LoginState::Idle);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Start session-expiry and wallet-event listeners; they stop when the
    /// returned handle is dropped
    pub fn spawn_listeners(self: &Arc<Self>) -> SessionListeners {
        let mut tasks = Vec::with_capacity(2);

        let session = Arc::clone(self);
        let mut expiry = self.api.subscribe_session_events();
        tasks.push(tokio::spawn(async move {
            loop {
                match expiry.recv().await {
                    Ok(SessionEvent::Expired) => session.expire().await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "session event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        if let Some(mut events) = self.wallet.subscribe() {
            let session = Arc::clone(self);
            tasks.push(tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => session.handle_wallet_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "wallet event listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }

        SessionListeners { tasks }
    }

    async fn run_login(&self) -> Result<LoginOutcome> {
        self.set_state(LoginState::Connecting);
        let address = self.connect_wallet().await?;

        self.set_state(LoginState::Signing);
        let credentials = self.sign_challenge(&address).await?;

        self.set_state(LoginState::Verifying);
        match self.verify(&credentials).await {
            Ok(user) => {
                self.notifier.success("Login successful!");
                Ok(LoginOutcome::Authenticated(user))
            }
            Err(err) if err.is_not_registered() => {
                info!(wallet = %address, "wallet has no account, registration required");
                self.set_state(LoginState::NeedsRegistration {
                    wallet: address.clone(),
                });
                self.notifier.error(MarketError::WalletNotRegistered.to_string());
                Ok(LoginOutcome::NeedsRegistration { wallet: address })
            }
            Err(err) => Err(err),
        }
    }

    async fn run_register(&self, address: &str, details: RegistrationDetails) -> Result<AuthenticatedUser> {
        self.set_state(LoginState::Signing);
        let credentials = self.sign_challenge(address).await?;

        self.set_state(LoginState::Verifying);
        self.api
            .register(&RegisterRequest::new(details, &credentials))
            .await?;
        info!(wallet = %address, "wallet registered");
        self.notifier.success("Registration successful! Logging you in...");

        let user = self.verify(&credentials).await?;
        self.notifier.success("Welcome!");
        Ok(user)
    }

    async fn run_update_profile(&self, update: UpdateUserRequest) -> Result<AuthenticatedUser> {
        if !self.store.is_authenticated() {
            return Err(MarketError::InvalidState("not signed in".to_string()));
        }
        if update.is_empty() {
            return Err(MarketError::Validation("nothing to update".to_string()));
        }
        self.api.update_current_user(&update).await?;
        self.refresh_user().await
    }

    async fn connect_wallet(&self) -> Result<String> {
        let address = self.wallet.connect().await?;
        let public_key = self.wallet.public_key().await;
        let balance = self.wallet.balance(&address).await;
        let chain_id = self.wallet.chain_id().await;

        self.store
            .connect_wallet(WalletSession {
                address: address.clone(),
                public_key,
                chain_id,
                balance,
                connected: true,
            })
            .await?;
        self.notifier.success("Wallet connected successfully!");
        Ok(address)
    }

    async fn sign_challenge(&self, address: &str) -> Result<LoginRequest> {
        let challenge = AuthChallenge::new(address);
        let signed = self
            .wallet
            .sign_message(&challenge.message, &challenge.nonce)
            .await?;
        let public_key = self.wallet.public_key().await.ok_or_else(|| {
            MarketError::InvalidResponse("Wallet did not provide a public key".to_string())
        })?;
        debug!(wallet = %address, nonce = %challenge.nonce, "challenge signed");
        Ok(challenge.into_login_request(signed, public_key))
    }

    /// Submit signed credentials and load the user into the store
    async fn verify(&self, credentials: &LoginRequest) -> Result<AuthenticatedUser> {
        self.api
            .login(credentials)
            .await
            .map_err(classify_login_error)?;
        let user = self.api.current_user().await?;
        self.store.set_user(user.clone()).await?;
        self.set_state(LoginState::Authenticated);
        info!(wallet = %credentials.wallet, user = %user.id, "authenticated");
        Ok(user)
    }

    async fn fail(&self, err: &MarketError) {
        warn!(error = %err, "authentication attempt failed");
        self.wallet.reset();
        self.clear_local().await;
        let reason = err.user_message();
        self.set_state(LoginState::Failed {
            reason: reason.clone(),
        });
        self.notifier.error(reason);
    }

    async fn expire(&self) {
        info!("session expired, clearing local session");
        self.wallet.reset();
        self.clear_local().await;
        self.set_state(LoginState::Idle);
        self.notifier.error(MarketError::SessionExpired.to_string());
    }

    async fn handle_wallet_event(&self, event: WalletEvent) {
        let result = match event {
            WalletEvent::AccountChanged(None) => {
                self.wallet.apply_account_change(None);
                self.set_state(LoginState::Idle);
                self.notifier.info("Wallet disconnected");
                self.store.account_changed(None).await
            }
            WalletEvent::AccountChanged(Some(address)) => {
                if self.store.wallet().is_some_and(|wallet| wallet.owns(&address)) {
                    return;
                }
                info!(wallet = %address, "wallet account changed");
                self.wallet.apply_account_change(Some(&address));
                self.set_state(LoginState::Idle);
                self.notifier.info("Wallet account changed");
                self.store.account_changed(Some(&address)).await
            }
            WalletEvent::NetworkChanged(network) => {
                self.notifier.info(format!("Network changed to {}", network.name));
                self.store
                    .update_chain_id(Some(network.resolved_chain_id()))
                    .await
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to apply wallet event");
        }
    }

    /// Forget the stored session and the cookies that back it
    async fn clear_local(&self) {
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "failed to clear session store");
        }
        self.api.clear_cookies().await;
    }

    fn set_state(&self, state: LoginState) {
        debug!(state = %state, "login state");
        self.state.send_replace(state);
    }
}

/// Background listener tasks; aborted on drop
#[derive(Debug)]
pub struct SessionListeners {
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for SessionListeners {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Unknown wallet and rejected signatures get their own variants
fn classify_login_error(err: MarketError) -> MarketError {
    if err.is_not_registered() {
        return MarketError::WalletNotRegistered;
    }
    match err {
        MarketError::Api { code: 401 | 403, message } => {
            MarketError::SignatureVerificationFailed { message }
        }
        other => other,
    }
}
