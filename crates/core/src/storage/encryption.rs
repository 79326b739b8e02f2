use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::CoreError;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// Argon2id cost, stored in every ledger container so old saves stay
/// readable after the defaults move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl KdfParams {
    /// Cheapest cost Argon2 accepts. Tests and throwaway ledgers only.
    pub const fn minimal() -> Self {
        Self {
            memory_cost: 8,
            time_cost: 1,
            parallelism: 1,
        }
    }

    /// Header values are untrusted; a hostile file must not make a load
    /// allocate gigabytes or spin for minutes.
    pub fn check_bounds(&self) -> Result<(), CoreError> {
        let out_of_range = |what: &str, value: u32, range: std::ops::RangeInclusive<u32>| {
            CoreError::InvalidFileFormat(format!(
                "Ledger container asks for {what} = {value}, allowed {}..={}",
                range.start(),
                range.end()
            ))
        };

        const MEMORY: std::ops::RangeInclusive<u32> = 8..=1_048_576;
        const TIME: std::ops::RangeInclusive<u32> = 1..=20;
        const LANES: std::ops::RangeInclusive<u32> = 1..=16;

        if !MEMORY.contains(&self.memory_cost) {
            return Err(out_of_range("memory_cost", self.memory_cost, MEMORY));
        }
        if !TIME.contains(&self.time_cost) {
            return Err(out_of_range("time_cost", self.time_cost, TIME));
        }
        if !LANES.contains(&self.parallelism) {
            return Err(out_of_range("parallelism", self.parallelism, LANES));
        }
        Ok(())
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: 65_536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// AES-256-GCM key stretched from a ledger password.
///
/// Every seal binds `aad` (the container header) into the tag, so a header
/// edited after saving fails to open just like a wrong password.
pub struct SealingKey {
    cipher: Aes256Gcm,
}

impl SealingKey {
    pub fn derive(password: &str, salt: &[u8; SALT_LEN], params: &KdfParams) -> Result<Self, CoreError> {
        let argon2 = Params::new(params.memory_cost, params.time_cost, params.parallelism, Some(32))
            .map(|p| Argon2::new(Algorithm::Argon2id, Version::V0x13, p))
            .map_err(|e| CoreError::Encryption(format!("Unusable Argon2 cost {params:?}: {e}")))?;

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| CoreError::Encryption(format!("Key stretching failed: {e}")))?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CoreError::Encryption(format!("Bad key length: {e}")))?;
        Ok(Self { cipher })
    }

    pub fn seal(&self, nonce: &[u8; NONCE_LEN], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CoreError> {
        self.cipher
            .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
            .map_err(|e| CoreError::Encryption(format!("Sealing ledger failed: {e}")))
    }

    /// Wrong password, edited header and corrupted body all end up here.
    pub fn open(&self, nonce: &[u8; NONCE_LEN], aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CoreError> {
        Ok(self
            .cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad })?)
    }
}

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealingKey(..)")
    }
}

/// `N` bytes from the OS generator, for salts and nonces.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], CoreError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf)
        .map_err(|e| CoreError::Encryption(format!("No randomness available: {e}")))?;
    Ok(buf)
}
