//! Standard Security Handler (ISO 32000-1 §7.6.4), revisions 2-4. Grounded
//! on the teacher's `reader/encrypted.rs` call sites (`EncryptionState::decode`,
//! `encryption::decrypt_object`) and its `pkcs5.rs`/dependency choice of
//! `aes`+`cbc` for the V=4 AES-128 stream/string cipher; RC4 itself has no
//! home in the teacher's dependency table, so it is hand-rolled in `rc4`
//! exactly as the teacher hand-rolls the PKCS#5 padding scheme.
mod pkcs5;
mod rc4;
pub mod permissions;

use aes::Aes128;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::{Decryptor, Encryptor};
use md5::{Digest, Md5};
use rand::RngCore;

use crate::document::Document;
use crate::error::{DecryptionError, Error, Result};
use crate::object::{Object, ObjectId, StringFormat};
use pkcs5::Pkcs5;
pub use permissions::Permissions;

/// §7.6.3.3 Algorithm 1 padding string, appended/truncated against any
/// user-supplied password to fill exactly 32 bytes.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let n = password.len().min(32);
    padded[..n].copy_from_slice(&password[..n]);
    padded[n..].copy_from_slice(&PASSWORD_PAD[..32 - n]);
    padded
}

/// Parsed `/Encrypt` dictionary values needed to derive and check keys,
/// independent of any password (§4.4).
struct EncryptParams {
    revision: u8,
    key_bytes: usize,
    o: Vec<u8>,
    u: Vec<u8>,
    p: i64,
    encrypt_metadata: bool,
    use_aes: bool,
}

fn read_params(document: &Document) -> Result<EncryptParams> {
    let encrypt = document.trailer.get(b"Encrypt").and_then(|o| document.dereference(o)).map(|(_, o)| o.clone())?;
    let dict = encrypt.as_dict()?;

    let filter = dict.get(b"Filter").and_then(Object::as_name)?;
    if filter != b"Standard" {
        return Err(Error::Unimplemented("only the Standard security handler is supported"));
    }

    let v = dict.get(b"V").and_then(Object::as_i64).unwrap_or(0);
    let revision = dict.get(b"R").and_then(Object::as_i64)? as u8;
    if !(2..=4).contains(&revision) {
        return Err(Error::Unimplemented("encryption revisions 5/6 (AES-256) are not supported"));
    }
    let length_bits = dict.get(b"Length").and_then(Object::as_i64).unwrap_or(40);
    let key_bytes = (length_bits / 8).clamp(5, 16) as usize;

    let o = dict.get(b"O").and_then(Object::as_str)?.to_vec();
    let u = dict.get(b"U").and_then(Object::as_str)?.to_vec();
    let p = dict.get(b"P").and_then(Object::as_i64)?;
    let encrypt_metadata = dict.get(b"EncryptMetadata").and_then(Object::as_bool).unwrap_or(true);

    let use_aes = v == 4;

    Ok(EncryptParams {
        revision,
        key_bytes,
        o,
        u,
        p,
        encrypt_metadata,
        use_aes,
    })
}

/// §7.6.3.3 Algorithm 2: derives the file key from a (padded) password.
fn compute_file_key(padded_password: &[u8; 32], params: &EncryptParams, id0: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(padded_password);
    hasher.update(&params.o[..32.min(params.o.len())]);
    hasher.update((params.p as i32).to_le_bytes());
    hasher.update(id0);
    if params.revision >= 4 && !params.encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut key = hasher.finalize().to_vec();
    key.truncate(params.key_bytes);

    if params.revision >= 3 {
        for _ in 0..50 {
            let mut hasher = Md5::new();
            hasher.update(&key[..params.key_bytes]);
            key = hasher.finalize().to_vec();
            key.truncate(params.key_bytes);
        }
    }
    key
}

/// §7.6.3.4 Algorithm 4/5: computes `U` from the (already-derived) file key.
fn compute_u(file_key: &[u8], params: &EncryptParams, id0: &[u8]) -> Vec<u8> {
    if params.revision == 2 {
        rc4::rc4(file_key, &PASSWORD_PAD)
    } else {
        let mut hasher = Md5::new();
        hasher.update(PASSWORD_PAD);
        hasher.update(id0);
        let digest = hasher.finalize();

        let mut result = rc4::rc4(file_key, &digest);
        for i in 1u8..=19 {
            let xored: Vec<u8> = file_key.iter().map(|b| b ^ i).collect();
            result = rc4::rc4(&xored, &result);
        }
        result.resize(32, 0);
        result
    }
}

/// §7.6.3.4 Algorithm 3: computes `O` from padded owner/user passwords,
/// used only when building a fresh `/Encrypt` dictionary on write.
fn compute_o(owner_padded: &[u8; 32], user_padded: &[u8; 32], revision: u8, key_bytes: usize) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(owner_padded);
    let mut rc4_key = hasher.finalize().to_vec();
    rc4_key.truncate(key_bytes);

    if revision >= 3 {
        for _ in 0..50 {
            let mut hasher = Md5::new();
            hasher.update(&rc4_key);
            rc4_key = hasher.finalize().to_vec();
            rc4_key.truncate(key_bytes);
        }
    }

    let mut result = rc4::rc4(&rc4_key, user_padded);
    if revision >= 3 {
        for i in 1u8..=19 {
            let xored: Vec<u8> = rc4_key.iter().map(|b| b ^ i).collect();
            result = rc4::rc4(&xored, &result);
        }
    }
    result
}

/// Per-object key, §7.6.2 Algorithm 1.
fn object_key(file_key: &[u8], id: ObjectId, use_aes: bool) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(file_key);
    hasher.update(&id.0.to_le_bytes()[..3]);
    hasher.update(&id.1.to_le_bytes()[..2]);
    if use_aes {
        hasher.update(b"sAlT");
    }
    let digest = hasher.finalize();
    let n = (file_key.len() + 5).min(16);
    digest[..n].to_vec()
}

/// The authenticated, ready-to-use per-document key state. Cloned into
/// `Document` once authentication succeeds so the xref/object-stream layer
/// never touches passwords again.
#[derive(Clone)]
pub struct EncryptionState {
    file_key: Vec<u8>,
    use_aes: bool,
    pub permissions: Permissions,
}

impl EncryptionState {
    /// Tries `password` as both owner and user password against the
    /// document's `/Encrypt` dictionary (§4.4 authentication rule: owner
    /// first, since an owner password also authenticates as user).
    pub fn decode(document: &Document, password: &str) -> Result<Self> {
        let params = read_params(document)?;
        let id0 = document.file_id_bytes();
        let password_bytes = encode_password_latin1(password);

        if let Some(candidate_user_password) = try_as_owner(&password_bytes, &params) {
            let padded = pad_password(&candidate_user_password);
            let file_key = compute_file_key(&padded, &params, &id0);
            if u_matches(&file_key, &params, &id0) {
                return Ok(EncryptionState {
                    file_key,
                    use_aes: params.use_aes,
                    permissions: Permissions::from_bits_relaxed(params.p),
                });
            }
        }

        let padded = pad_password(&password_bytes);
        let file_key = compute_file_key(&padded, &params, &id0);
        if u_matches(&file_key, &params, &id0) {
            return Ok(EncryptionState {
                file_key,
                use_aes: params.use_aes,
                permissions: Permissions::from_bits_relaxed(params.p),
            });
        }

        Err(Error::Decryption(DecryptionError::InvalidPassword))
    }
}

fn encode_password_latin1(password: &str) -> Vec<u8> {
    password.chars().map(|c| if (c as u32) < 256 { c as u8 } else { b'?' }).collect()
}

fn u_matches(file_key: &[u8], params: &EncryptParams, id0: &[u8]) -> bool {
    let computed = compute_u(file_key, params, id0);
    if params.revision == 2 {
        computed == params.u
    } else {
        computed.len() >= 16 && params.u.len() >= 16 && computed[..16] == params.u[..16]
    }
}

/// Decrypts `O` with the RC4 key derived from `password` alone, recovering
/// the candidate user password it was computed from (§7.6.3.4 Algorithm 7,
/// run in reverse).
fn try_as_owner(owner_password: &[u8], params: &EncryptParams) -> Option<Vec<u8>> {
    let padded = pad_password(owner_password);
    let mut hasher = Md5::new();
    hasher.update(padded);
    let mut rc4_key = hasher.finalize().to_vec();
    rc4_key.truncate(params.key_bytes);
    if params.revision >= 3 {
        for _ in 0..50 {
            let mut hasher = Md5::new();
            hasher.update(&rc4_key);
            rc4_key = hasher.finalize().to_vec();
            rc4_key.truncate(params.key_bytes);
        }
    }

    let mut result = params.o.clone();
    if params.revision == 2 {
        result = rc4::rc4(&rc4_key, &result);
    } else {
        for i in (0u8..=19).rev() {
            let xored: Vec<u8> = rc4_key.iter().map(|b| b ^ i).collect();
            result = rc4::rc4(&xored, &result);
        }
    }
    Some(result)
}

fn cipher_bytes(state: &EncryptionState, id: ObjectId, data: &[u8], encrypting: bool) -> Result<Vec<u8>> {
    let key = object_key(&state.file_key, id, state.use_aes);
    if !state.use_aes {
        return Ok(rc4::rc4(&key, data));
    }

    if encrypting {
        let mut iv = [0u8; 16];
        rand::rng().fill_bytes(&mut iv);
        let encryptor = Encryptor::<Aes128>::new_from_slices(&key, &iv).map_err(|_| DecryptionError::InvalidKey)?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs5>(data);
        let mut out = iv.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(out)
    } else {
        if data.len() < 16 {
            return Err(Error::Decryption(DecryptionError::ShortIv));
        }
        let (iv, ciphertext) = data.split_at(16);
        let decryptor = Decryptor::<Aes128>::new_from_slices(&key, iv).map_err(|_| DecryptionError::InvalidKey)?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs5>(ciphertext)
            .map_err(|_| Error::Decryption(DecryptionError::InvalidPadding))
    }
}

/// Decrypts every string and the stream body of `obj` in place. Object and
/// xref streams never reach this function: the reader excludes them by
/// construction (§4.4).
pub fn decrypt_object(state: &EncryptionState, id: ObjectId, obj: &mut Object) -> std::result::Result<(), DecryptionError> {
    transform_object(state, id, obj, false).map_err(|e| match e {
        Error::Decryption(d) => d,
        _ => DecryptionError::InvalidKey,
    })
}

/// Encrypts every string and the stream body of `obj` in place, for the
/// incremental writer emitting into an already-encrypted document.
pub fn encrypt_object(state: &EncryptionState, id: ObjectId, obj: &mut Object) -> std::result::Result<(), DecryptionError> {
    transform_object(state, id, obj, true).map_err(|e| match e {
        Error::Decryption(d) => d,
        _ => DecryptionError::InvalidKey,
    })
}

fn transform_object(state: &EncryptionState, id: ObjectId, obj: &mut Object, encrypting: bool) -> Result<()> {
    match obj {
        Object::String(bytes, _) => {
            *bytes = cipher_bytes(state, id, bytes, encrypting)?;
        }
        Object::Array(items) => {
            for item in items {
                transform_object(state, id, item, encrypting)?;
            }
        }
        Object::Dictionary(dict) => {
            transform_dict(state, id, dict, encrypting)?;
        }
        Object::Stream(stream) => {
            transform_dict(state, id, &mut stream.dict, encrypting)?;
            let is_identity = matches!(stream.dict.get(b"Filter").and_then(Object::as_name), Ok(n) if n == b"Crypt")
                || stream.dict.has_type(b"XRef")
                || stream.dict.has_type(b"ObjStm");
            if !is_identity {
                let content = std::mem::take(&mut stream.content);
                stream.content = cipher_bytes(state, id, &content, encrypting)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn transform_dict(state: &EncryptionState, id: ObjectId, dict: &mut crate::dictionary::Dictionary, encrypting: bool) -> Result<()> {
    let keys: Vec<Vec<u8>> = dict.iter().map(|(k, _)| k.to_vec()).collect();
    for key in keys {
        if let Ok(value) = dict.get_mut(&key) {
            transform_object(state, id, value, encrypting)?;
        }
    }
    Ok(())
}

/// Builds a fresh `/Encrypt` dictionary for a document being encrypted for
/// the first time on save (owner/user passwords supplied by the caller).
pub fn build_encrypt_dictionary(
    owner_password: &str, user_password: &str, permissions: Permissions, revision: u8, key_bytes: usize, id0: &[u8],
) -> (crate::dictionary::Dictionary, EncryptionState) {
    let owner_padded = pad_password(&encode_password_latin1(owner_password));
    let user_padded = pad_password(&encode_password_latin1(user_password));
    let o = compute_o(&owner_padded, &user_padded, revision, key_bytes);

    let params = EncryptParams {
        revision,
        key_bytes,
        o: o.clone(),
        u: Vec::new(),
        p: permissions.to_i64(),
        encrypt_metadata: true,
        use_aes: revision == 4,
    };
    let file_key = compute_file_key(&user_padded, &params, id0);
    let u = compute_u(&file_key, &params, id0);

    let mut dict = crate::dictionary::Dictionary::new();
    dict.set("Filter", Object::Name(b"Standard".to_vec()));
    dict.set("V", Object::Integer(if revision == 4 { 4 } else { 1 }));
    dict.set("R", Object::Integer(revision as i64));
    dict.set("Length", Object::Integer((key_bytes * 8) as i64));
    dict.set("O", Object::String(o, StringFormat::Hexadecimal));
    dict.set("U", Object::String(u, StringFormat::Hexadecimal));
    dict.set("P", Object::Integer(permissions.to_i64()));

    let state = EncryptionState {
        file_key,
        use_aes: revision == 4,
        permissions,
    };
    (dict, state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_password_fills_to_32_bytes() {
        let padded = pad_password(b"abc");
        assert_eq!(padded.len(), 32);
        assert_eq!(&padded[..3], b"abc");
        assert_eq!(&padded[3..], &PASSWORD_PAD[..29]);
    }

    #[test]
    fn object_key_is_truncated_to_file_key_plus_five() {
        let file_key = vec![1u8; 5];
        let key = object_key(&file_key, (3, 0), false);
        assert_eq!(key.len(), 10);
    }

    #[test]
    fn aes_cipher_bytes_round_trip() {
        let state = EncryptionState {
            file_key: vec![0x11; 16],
            use_aes: true,
            permissions: Permissions::all(),
        };
        let plaintext = b"the quick brown fox";
        let ciphertext = cipher_bytes(&state, (7, 0), plaintext, true).unwrap();
        let decrypted = cipher_bytes(&state, (7, 0), &ciphertext, false).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn rc4_cipher_bytes_round_trip() {
        let state = EncryptionState {
            file_key: vec![0x22; 5],
            use_aes: false,
            permissions: Permissions::all(),
        };
        let plaintext = b"round trip";
        let ciphertext = cipher_bytes(&state, (1, 0), plaintext, true).unwrap();
        let decrypted = cipher_bytes(&state, (1, 0), &ciphertext, false).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
