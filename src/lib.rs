//! Byte-exact reader/writer for the PDF core object layer: lexer/parser,
//! cross-reference index (classical table and stream, incremental-update
//! aware), the standard filter pipeline, the Standard Security Handler,
//! and an incremental-safe writer.
//!
//! The public surface is small and deliberately unopinionated about
//! higher-level document semantics (page trees, annotations, outlines):
//! [`Document`] exposes the object graph and the [`Getter`] contract for
//! resolving references and decoding streams; everything above that is
//! left to callers.

pub mod cache;
pub mod dictionary;
pub mod document;
pub mod encoding;
pub mod encryption;
pub mod error;
pub mod filters;
pub mod object;
pub mod object_stream;
mod parser;
pub mod reader;
mod scanner;
pub mod writer;
pub mod xref;

pub use dictionary::Dictionary;
pub use document::{
    Document, ErrorHandling, Getter, InfoMetadata, LoadOptions, MetaInfo, PdfMetadata, SaveOptions, Version,
};
pub use encryption::Permissions;
pub use error::{Error, Result};
pub use object::{Object, ObjectId, Stream, StringFormat};
pub use xref::{Xref, XrefEntry, XrefType};
