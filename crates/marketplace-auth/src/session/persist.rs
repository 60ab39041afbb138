/*
[INPUT]:  Session snapshots from the store
[OUTPUT]: JSON document on disk under a single namespaced key
[POS]:    Session layer - persistence backend
[UPDATE]: When the persisted document layout changes
*/

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::http::Result;

use super::store::SessionSnapshot;

/// Key the session lives under inside the persisted document
pub const PERSIST_KEY: &str = "persist:marketplace";

/// File-backed persistence for [`SessionSnapshot`]
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted snapshot, sanitized.
    ///
    /// A missing file yields an empty snapshot. A corrupted document is
    /// logged and treated as empty so a bad write never locks the user out.
    pub async fn load(&self) -> Result<SessionSnapshot> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no persisted session");
                return Ok(SessionSnapshot::default());
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot = serde_json::from_str::<BTreeMap<String, Value>>(&content)
            .ok()
            .and_then(|mut document| document.remove(PERSIST_KEY))
            .map(serde_json::from_value::<SessionSnapshot>);

        match snapshot {
            Some(Ok(snapshot)) => Ok(snapshot.sanitize()),
            None => {
                warn!(path = %self.path.display(), "persisted session missing, starting empty");
                Ok(SessionSnapshot::default())
            }
            Some(Err(err)) => {
                warn!(path = %self.path.display(), error = %err, "persisted session corrupted, starting empty");
                Ok(SessionSnapshot::default())
            }
        }
    }

    /// Atomic write: temp file then rename
    pub async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut document = BTreeMap::new();
        document.insert(PERSIST_KEY, snapshot);
        let content = serde_json::to_string_pretty(&document)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
