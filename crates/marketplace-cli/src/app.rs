/*
[INPUT]:  CLI configuration, local keystore, persisted session
[OUTPUT]: Command-level operations over the auth session client
[POS]:    Application layer - wiring between CLI commands and the library
[UPDATE]: When adding commands or changing how the session is assembled
*/

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use marketplace_auth::auth::{SessionListeners, WalletTimeouts};
use marketplace_auth::{
    ApiClient, AuthSession, AuthenticatedUser, CreateProductRequest, KeypairWallet, Keystore,
    LoginOutcome, Order, Product, RegistrationDetails, SessionSnapshot, SessionStore,
    UpdateUserRequest, UserStats, WalletAdapter, WalletProvider,
};

use crate::config::CliConfig;

/// Everything a command needs: the session client plus its background listeners
pub struct App {
    session: Arc<AuthSession>,
    _listeners: SessionListeners,
}

impl App {
    /// Assemble the session from configuration; the wallet is the stored key, if any
    pub async fn open(config: &CliConfig) -> Result<Self> {
        let keystore = Keystore::new(config.key_dir()?);
        let provider = keystore
            .load(&config.wallet_label)
            .with_context(|| format!("load wallet key {:?}", config.wallet_label))?
            .map(|wallet| Arc::new(wallet) as Arc<dyn WalletProvider>);
        if provider.is_none() {
            debug!(label = %config.wallet_label, "no local wallet key");
        }

        let api = ApiClient::with_config(config.client_config()?).context("build API client")?;
        let store = SessionStore::open(config.session_path()?)
            .await
            .context("open session store")?;

        Ok(Self::with_parts(api, provider, Arc::new(store), config.wallet_timeouts()))
    }

    pub fn with_parts(
        api: ApiClient,
        provider: Option<Arc<dyn WalletProvider>>,
        store: Arc<SessionStore>,
        timeouts: WalletTimeouts,
    ) -> Self {
        let wallet = Arc::new(WalletAdapter::detect(provider).with_timeouts(timeouts));
        let session = Arc::new(AuthSession::new(api, wallet, store));
        let listeners = session.spawn_listeners();
        Self {
            session,
            _listeners: listeners,
        }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub async fn login(&self) -> Result<LoginOutcome> {
        Ok(self.session.login().await?)
    }

    pub async fn register(&self, details: RegistrationDetails) -> Result<AuthenticatedUser> {
        Ok(self.session.register(details).await?)
    }

    /// Connect and sign in, then register if the wallet has no account yet
    pub async fn login_or_register(&self, details: RegistrationDetails) -> Result<AuthenticatedUser> {
        match self.login().await? {
            LoginOutcome::Authenticated(user) => {
                info!(user = %user.id, "wallet already registered");
                Ok(user)
            }
            LoginOutcome::NeedsRegistration { .. } => self.register(details).await,
        }
    }

    /// Reuse the persisted session when the backend still accepts it,
    /// otherwise run the wallet handshake
    pub async fn ensure_signed_in(&self) -> Result<AuthenticatedUser> {
        if let Some(user) = self.session.restore().await? {
            return Ok(user);
        }
        match self.login().await? {
            LoginOutcome::Authenticated(user) => Ok(user),
            LoginOutcome::NeedsRegistration { wallet } => Err(anyhow!(
                "wallet {wallet} is not registered, run `marketplace register` first"
            )),
        }
    }

    /// Current user and, when available, their activity counters
    pub async fn whoami(&self) -> Result<(AuthenticatedUser, Option<UserStats>)> {
        let user = self.ensure_signed_in().await?;
        let stats = match self.session.api().user_stats().await {
            Ok(stats) => Some(stats),
            Err(err) => {
                debug!(error = %err, "user stats unavailable");
                None
            }
        };
        Ok((user, stats))
    }

    pub async fn update_profile(&self, update: UpdateUserRequest) -> Result<AuthenticatedUser> {
        self.ensure_signed_in().await?;
        Ok(self.session.update_profile(update).await?)
    }

    /// Public listings, or the signed-in seller's own when `mine` is set
    pub async fn products(&self, mine: bool) -> Result<Vec<Product>> {
        let api = self.session.api();
        if mine {
            self.ensure_signed_in().await?;
            return Ok(api.user_products().await?);
        }
        Ok(api.products().await?)
    }

    pub async fn product(&self, id: &str) -> Result<Product> {
        Ok(self.session.api().product(id).await?)
    }

    pub async fn create_product(&self, listing: CreateProductRequest) -> Result<Product> {
        self.ensure_signed_in().await?;
        let product = self.session.api().create_product(&listing).await?;
        info!(product = %product.id, "listing published");
        Ok(product)
    }

    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.ensure_signed_in().await?;
        Ok(self.session.api().user_orders().await?)
    }

    pub async fn order(&self, id: &str) -> Result<Order> {
        self.ensure_signed_in().await?;
        Ok(self.session.api().order(id).await?)
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    pub fn status(&self) -> SessionSnapshot {
        self.session.store().snapshot()
    }
}

/// Create or load the key for `label`
pub fn keygen(config: &CliConfig, label: &str) -> Result<KeypairWallet> {
    let keystore = Keystore::new(config.key_dir()?);
    let existed = keystore.load(label)?.is_some();
    let wallet = keystore
        .get_or_create(label)
        .with_context(|| format!("create wallet key {label:?}"))?;
    info!(label, address = wallet.address(), created = !existed, "wallet key ready");
    Ok(wallet)
}
