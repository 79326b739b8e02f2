use tracing::debug;

use crate::errors::CoreError;
use crate::models::state::UserState;
use crate::models::transfer::ExportDocument;

use super::encryption::{random_bytes, KdfParams, SealingKey};
use super::format::ContainerHeader;

/// Seals a user's ledger into a password-protected container and opens it.
///
/// The plaintext is the same JSON document the backup export writes, with
/// the user's settings added, so a decrypted container reads like a backup.
pub struct StorageManager;

impl StorageManager {
    /// Seal with the default Argon2id cost.
    pub fn save_to_bytes(state: &UserState, password: &str) -> Result<Vec<u8>, CoreError> {
        Self::save_to_bytes_with(state, password, &KdfParams::default())
    }

    pub fn save_to_bytes_with(
        state: &UserState,
        password: &str,
        kdf: &KdfParams,
    ) -> Result<Vec<u8>, CoreError> {
        let document = serde_json::to_vec(&ExportDocument::full_copy_of(state))
            .map_err(|e| CoreError::Serialization(format!("Ledger document: {e}")))?;

        let header = ContainerHeader::new(*kdf, random_bytes()?, random_bytes()?);
        let mut container = header.encode();
        let key = SealingKey::derive(password, &header.salt, kdf)?;
        let sealed = key.seal(&header.nonce, &container, &document)?;
        container.extend_from_slice(&sealed);

        debug!(
            transactions = state.ledger.len(),
            bytes = container.len(),
            "ledger sealed"
        );
        Ok(container)
    }

    /// A wrong password and a tampered container both give
    /// `CoreError::Decryption`.
    pub fn load_from_bytes(data: &[u8], password: &str) -> Result<UserState, CoreError> {
        let (header, raw_header, body) = ContainerHeader::decode(data)?;
        let key = SealingKey::derive(password, &header.salt, &header.kdf)?;
        let plaintext = key.open(&header.nonce, raw_header, body)?;

        let document: ExportDocument = serde_json::from_slice(&plaintext)?;
        if document.version != header.document_version {
            return Err(CoreError::InvalidFileFormat(format!(
                "Sealed document says version {}, header says {}",
                document.version, header.document_version
            )));
        }
        Ok(document.into_state())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(state: &UserState, path: &str, password: &str) -> Result<(), CoreError> {
        std::fs::write(path, Self::save_to_bytes(state, password)?)?;
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str, password: &str) -> Result<UserState, CoreError> {
        Self::load_from_bytes(&std::fs::read(path)?, password)
    }
}
