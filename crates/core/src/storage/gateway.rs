use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::CoreError;
use crate::models::state::UserState;

#[cfg(not(target_arch = "wasm32"))]
use tracing::warn;

#[cfg(not(target_arch = "wasm32"))]
use super::encryption::KdfParams;
#[cfg(not(target_arch = "wasm32"))]
use super::manager::StorageManager;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

/// Where user states live between sessions.
///
/// `load` returns `Ok(None)` for a user that was never saved.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PersistenceGateway: Send + Sync {
    async fn load(&self, user_key: &str) -> Result<Option<UserState>, CoreError>;

    async fn save(&self, user_key: &str, state: &UserState) -> Result<(), CoreError>;
}

// ── In-memory ───────────────────────────────────────────────────────

/// Keeps cloned states in a map. For tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    states: Mutex<HashMap<String, UserState>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a saved state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.lock().map(|s| s.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PersistenceGateway for MemoryGateway {
    async fn load(&self, user_key: &str) -> Result<Option<UserState>, CoreError> {
        let states = self
            .states
            .lock()
            .map_err(|_| CoreError::SessionUnavailable(user_key.to_string()))?;
        Ok(states.get(user_key).cloned())
    }

    async fn save(&self, user_key: &str, state: &UserState) -> Result<(), CoreError> {
        let mut states = self
            .states
            .lock()
            .map_err(|_| CoreError::SessionUnavailable(user_key.to_string()))?;
        states.insert(user_key.to_string(), state.clone());
        Ok(())
    }
}

// ── Encrypted files ─────────────────────────────────────────────────

/// File extension of stored containers.
#[cfg(not(target_arch = "wasm32"))]
pub const FILE_EXTENSION: &str = "tlgr";

/// One encrypted container per user inside `dir`, all sealed with the same
/// password. File names are the hex-encoded user key.
#[cfg(not(target_arch = "wasm32"))]
pub struct EncryptedFileGateway {
    dir: PathBuf,
    password: String,
    kdf_params: KdfParams,
}

#[cfg(not(target_arch = "wasm32"))]
impl EncryptedFileGateway {
    pub fn new(dir: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self::with_kdf_params(dir, password, KdfParams::default())
    }

    pub fn with_kdf_params(
        dir: impl Into<PathBuf>,
        password: impl Into<String>,
        kdf_params: KdfParams,
    ) -> Self {
        Self {
            dir: dir.into(),
            password: password.into(),
            kdf_params,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Container path for `user_key`.
    #[must_use]
    pub fn path_for(&self, user_key: &str) -> PathBuf {
        let name: String = user_key.bytes().map(|b| format!("{b:02x}")).collect();
        self.dir.join(format!("{name}.{FILE_EXTENSION}"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl std::fmt::Debug for EncryptedFileGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileGateway")
            .field("dir", &self.dir)
            .field("kdf_params", &self.kdf_params)
            .finish_non_exhaustive()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EncryptedFileGateway {
    fn read_blocking(path: &Path, password: &str) -> Result<Option<UserState>, CoreError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        StorageManager::load_from_bytes(&bytes, password).map(Some)
    }

    fn write_blocking(
        dir: &Path,
        path: &Path,
        state: &UserState,
        password: &str,
        kdf: &KdfParams,
    ) -> Result<(), CoreError> {
        std::fs::create_dir_all(dir)?;
        let bytes = StorageManager::save_to_bytes_with(state, password, kdf)?;

        // Readers never see a partially written container.
        let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Run file I/O and key stretching off the async workers.
#[cfg(not(target_arch = "wasm32"))]
async fn off_runtime<T, F>(user_key: &str, job: F) -> Result<T, CoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(job).await.map_err(|e| {
        warn!(user = user_key, error = %e, "storage task did not finish");
        CoreError::FileIO(format!("Storage task for '{user_key}' did not finish: {e}"))
    })?
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl PersistenceGateway for EncryptedFileGateway {
    async fn load(&self, user_key: &str) -> Result<Option<UserState>, CoreError> {
        let path = self.path_for(user_key);
        let password = self.password.clone();
        off_runtime(user_key, move || Self::read_blocking(&path, &password)).await
    }

    async fn save(&self, user_key: &str, state: &UserState) -> Result<(), CoreError> {
        let dir = self.dir.clone();
        let path = self.path_for(user_key);
        let password = self.password.clone();
        let kdf = self.kdf_params;
        let state = state.clone();
        off_runtime(user_key, move || {
            Self::write_blocking(&dir, &path, &state, &password, &kdf)
        })
        .await
    }
}
