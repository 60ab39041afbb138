/*
[INPUT]:  Wallet label and key storage directory
[OUTPUT]: Persistent local keypair wallets
[POS]:    Auth layer - on-disk storage for headless wallet keys
[UPDATE]: When key storage format or file naming conventions change
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::KeypairWallet;

const KEY_SUFFIX: &str = "_ed25519.key";

/// Manages persistence of local wallet keys
#[derive(Debug, Clone)]
pub struct Keystore {
    key_dir: PathBuf,
}

impl Keystore {
    /// Create a new keystore with the given storage directory
    pub fn new(key_dir: impl AsRef<Path>) -> Self {
        Self {
            key_dir: key_dir.as_ref().to_path_buf(),
        }
    }

    /// Get an existing wallet or create a new one if it doesn't exist
    pub fn get_or_create(&self, label: &str) -> io::Result<KeypairWallet> {
        if let Some(wallet) = self.load(label)? {
            Ok(wallet)
        } else {
            let wallet = KeypairWallet::generate();
            self.save(label, &wallet)?;
            Ok(wallet)
        }
    }

    /// Load a wallet from disk; `Ok(None)` when no key is stored
    pub fn load(&self, label: &str) -> io::Result<Option<KeypairWallet>> {
        validate_label(label)?;
        let path = self.key_file_path(label);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        let bytes = STANDARD
            .decode(content.trim())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let key_bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected 32 key bytes in {}, got {}", path.display(), bytes.len()),
            )
        })?;
        Ok(Some(KeypairWallet::from_secret_key(&key_bytes)))
    }

    /// Save a wallet's secret key for `label`
    pub fn save(&self, label: &str, wallet: &KeypairWallet) -> io::Result<()> {
        validate_label(label)?;
        fs::create_dir_all(&self.key_dir)?;

        let path = self.key_file_path(label);
        fs::write(&path, STANDARD.encode(wallet.secret_key_bytes()))?;
        restrict_permissions(&path)?;
        Ok(())
    }

    /// List all labels that have stored keys
    pub fn list(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.key_dir) {
            for entry in entries.flatten() {
                if let Some(label) = entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(KEY_SUFFIX))
                {
                    labels.push(label.to_string());
                }
            }
        }
        labels.sort();
        labels
    }

    /// Get the expected file path for a label's key
    pub fn key_file_path(&self, label: &str) -> PathBuf {
        self.key_dir.join(format!("{label}{KEY_SUFFIX}"))
    }
}

fn validate_label(label: &str) -> io::Result<()> {
    let valid = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid wallet label: {label:?}"),
        ))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
