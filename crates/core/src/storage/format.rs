use crate::errors::CoreError;
use crate::models::transfer::EXPORT_VERSION;

use super::encryption::{KdfParams, NONCE_LEN, SALT_LEN};

/// Opens every sealed ledger.
pub const MAGIC: &[u8; 4] = b"TLGR";

/// Layout version of the container itself (not of the document inside).
pub const CONTAINER_VERSION: u16 = 1;

/// magic 4 | container version 2 | document version 2 | kdf 3×4 | salt 16 | nonce 12
pub const HEADER_LEN: usize = 4 + 2 + 2 + 12 + SALT_LEN + NONCE_LEN;

/// AES-GCM tag length; a sealed body is never shorter.
const TAG_LEN: usize = 16;

/// Plaintext front of a sealed ledger.
///
/// ```text
/// [TLGR] [container version u16] [document version u16]
/// [memory KiB u32] [time u32] [lanes u32] [salt 16B] [nonce 12B]
/// [sealed JSON document ..]
/// ```
///
/// All integers little-endian. The encoded header is the AEAD associated
/// data, so none of these fields can be edited without breaking the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    /// `EXPORT_VERSION` of the sealed JSON document
    pub document_version: u16,
    pub kdf: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
}

impl ContainerHeader {
    /// Header for a fresh save of the current document version.
    pub fn new(kdf: KdfParams, salt: [u8; SALT_LEN], nonce: [u8; NONCE_LEN]) -> Self {
        Self {
            document_version: EXPORT_VERSION,
            kdf,
            salt,
            nonce,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&CONTAINER_VERSION.to_le_bytes());
        out.extend_from_slice(&self.document_version.to_le_bytes());
        for cost in [self.kdf.memory_cost, self.kdf.time_cost, self.kdf.parallelism] {
            out.extend_from_slice(&cost.to_le_bytes());
        }
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out
    }

    /// Split a container into its header, the raw header bytes (the
    /// associated data) and the sealed body.
    ///
    /// Everything checkable without the password is checked here: magic,
    /// both versions, KDF bounds, and that a body is present.
    pub fn decode(data: &[u8]) -> Result<(Self, &[u8], &[u8]), CoreError> {
        if data.len() < HEADER_LEN {
            return Err(CoreError::InvalidFileFormat(format!(
                "{} bytes is too short for a TLGR ledger (header alone is {HEADER_LEN})",
                data.len()
            )));
        }
        let (raw_header, body) = data.split_at(HEADER_LEN);
        let mut fields = Fields(raw_header);

        if &fields.take::<4>()? != MAGIC {
            return Err(CoreError::InvalidFileFormat("Not a TLGR ledger".into()));
        }

        let container_version = u16::from_le_bytes(fields.take()?);
        if container_version == 0 || container_version > CONTAINER_VERSION {
            return Err(CoreError::UnsupportedVersion(container_version));
        }

        let document_version = u16::from_le_bytes(fields.take()?);
        if document_version == 0 || document_version > EXPORT_VERSION {
            return Err(CoreError::UnsupportedVersion(document_version));
        }

        let kdf = KdfParams {
            memory_cost: u32::from_le_bytes(fields.take()?),
            time_cost: u32::from_le_bytes(fields.take()?),
            parallelism: u32::from_le_bytes(fields.take()?),
        };
        kdf.check_bounds()?;

        let header = Self {
            document_version,
            kdf,
            salt: fields.take()?,
            nonce: fields.take()?,
        };

        if body.len() < TAG_LEN {
            return Err(CoreError::InvalidFileFormat(format!(
                "Sealed ledger body is {} bytes, shorter than its {TAG_LEN}-byte tag",
                body.len()
            )));
        }

        Ok((header, raw_header, body))
    }
}

/// Reads fixed-size fields off the front of a header.
struct Fields<'a>(&'a [u8]);

impl Fields<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let buf: &[u8] = self.0;
        let (field, rest) = buf
            .split_first_chunk::<N>()
            .ok_or_else(|| CoreError::InvalidFileFormat("TLGR header cut short".into()))?;
        self.0 = rest;
        Ok(*field)
    }
}
