//! `Crypt`: a pseudo-filter. The actual decryption happens before any
//! filter chain runs, against the reader's [`crate::encryption::EncryptionState`]
//! (§4.4); by the time [`super::decode`] reaches a `Crypt` entry the bytes
//! are already plaintext, so this is the identity transform.
use crate::error::Result;

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    Ok(data.to_vec())
}
