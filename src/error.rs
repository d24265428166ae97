use thiserror::Error;

use crate::object::ObjectId;

pub type Result<T> = std::result::Result<T, Error>;

/// Lexer/parser violations. Most carry enough context to locate the bad
/// byte without re-scanning the file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid %PDF-x.y header")]
    InvalidFileHeader,
    #[error("invalid name")]
    InvalidName,
    #[error("unbalanced parentheses in literal string")]
    UnbalancedParenthesis,
    #[error("literal string nesting exceeds the allowed depth")]
    StringTooDeep,
    #[error("unexpected end of input")]
    EndOfInput,
    #[error("invalid cross-reference table or stream")]
    InvalidXref,
    #[error("invalid trailer dictionary")]
    InvalidTrailer,
    #[error("stream Length does not match the bytes found before endstream")]
    InvalidStreamLength,
    #[error("integer literal overflows a signed 64-bit integer")]
    IntegerOverflow,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("could not locate startxref")]
    Start,
    #[error("invalid /Prev offset")]
    PrevStart,
    #[error("invalid /XRefStm offset")]
    StreamStart,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("ciphertext shorter than the AES initialization vector")]
    ShortIv,
    #[error("invalid PKCS#7 padding")]
    InvalidPadding,
    #[error("RC4/AES key setup failed")]
    InvalidKey,
    #[error("password did not authenticate as user or owner")]
    InvalidPassword,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("xref error: {0}")]
    Xref(#[from] XrefError),
    #[error("decryption error: {0}")]
    Decryption(#[from] DecryptionError),
    #[error("malformed indirect object header at offset {offset}")]
    IndirectObject { offset: usize },
    #[error("indirect object id does not match the requested reference")]
    ObjectIdMismatch,
    #[error("no xref entry for the requested object")]
    MissingXrefEntry,
    #[error("offset {0} lies outside the document buffer")]
    InvalidOffset(usize),
    #[error("reference cycle detected while resolving {0:?}")]
    ReferenceCycle(ObjectId),
    #[error("invalid stream: {0}")]
    InvalidStream(String),
    #[error("numeric conversion failed: {0}")]
    NumericCast(String),
    #[error("incorrect password")]
    InvalidPassword,
    #[error("document requires a password (id = {0:02x?})")]
    AuthenticationRequired(Vec<u8>),
    #[error("unsupported feature: {0}")]
    Unimplemented(&'static str),
    #[error("feature requires PDF version {required} or later")]
    VersionMismatch { required: &'static str },
    #[error("expected {expected}, found {found}")]
    ObjectType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("dictionary has no entry for /{}", String::from_utf8_lossy(.0))]
    DictKey(Vec<u8>),
    #[error("catalog has no /Pages entry")]
    MissingPages,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
