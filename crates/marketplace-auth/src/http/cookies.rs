/*
[INPUT]:  Optional cookie file path, Set-Cookie headers from the backend
[OUTPUT]: Cookie provider for reqwest, persisted across processes
[POS]:    HTTP layer - session credential storage
[UPDATE]: When cookie persistence format or location changes
*/

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, MutexGuard, PoisonError};

use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use tracing::{debug, warn};

use crate::http::{MarketError, Result};

/// Cookie jar shared by every clone of an `ApiClient`.
///
/// With a backing file the jar survives restarts, session cookies included,
/// so a later process talks to the backend as the same session.
#[derive(Clone)]
pub struct CookieJar {
    store: Arc<CookieStoreMutex>,
    path: Option<PathBuf>,
}

impl CookieJar {
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(CookieStoreMutex::new(CookieStore::default())),
            path: None,
        }
    }

    /// Load the jar from `path`; a missing or unreadable file gives an empty jar
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let store = match File::open(&path) {
            Ok(file) => match cookie_store::serde::json::load_all(BufReader::new(file)) {
                Ok(store) => store,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "discarding unreadable cookie file");
                    CookieStore::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => CookieStore::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read cookie file");
                CookieStore::default()
            }
        };

        Self {
            store: Arc::new(CookieStoreMutex::new(store)),
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn provider(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.store)
    }

    /// Number of cookies currently held, expired ones excluded
    pub fn len(&self) -> usize {
        self.lock().iter_unexpired().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the jar to its file (temp file + rename); no-op when in memory
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut bytes = Vec::new();
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(&self.lock(), &mut bytes)
            .map_err(|err| MarketError::Storage(io::Error::other(err)))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "cookies saved");
        Ok(())
    }

    /// Drop every cookie and persist the empty jar
    pub async fn clear(&self) -> Result<()> {
        self.lock().clear();
        self.save().await
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("path", &self.path)
            .field("cookies", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore as _;
    use reqwest::header::HeaderValue;
    use reqwest::Url;
    use uuid::Uuid;

    fn temp_cookie_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("marketplace-test-{}", Uuid::new_v4()))
            .join("cookies.json")
    }

    fn set_cookie(jar: &CookieJar, url: &Url, header: &'static str) {
        let value = HeaderValue::from_static(header);
        jar.provider().set_cookies(&mut std::iter::once(&value), url);
    }

    #[tokio::test]
    async fn test_session_cookie_survives_reopen() {
        let path = temp_cookie_path();
        let url = Url::parse("http://127.0.0.1:3001/api/v1/auth/login").unwrap();

        let jar = CookieJar::open(&path);
        assert!(jar.is_empty());
        set_cookie(&jar, &url, "sid=abc; Path=/; HttpOnly");
        jar.save().await.unwrap();

        let reopened = CookieJar::open(&path);
        assert_eq!(reopened.len(), 1);
        let me = Url::parse("http://127.0.0.1:3001/api/v1/user/me").unwrap();
        let header = reopened.provider().cookies(&me).unwrap();
        assert_eq!(header.to_str().unwrap(), "sid=abc");

        reopened.clear().await.unwrap();
        assert!(CookieJar::open(&path).is_empty());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_cookie_file_starts_empty() {
        let path = temp_cookie_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(CookieJar::open(&path).is_empty());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_save_is_noop() {
        let jar = CookieJar::in_memory();
        assert!(jar.path().is_none());
        jar.save().await.unwrap();
    }
}
