//! `Document`: the in-memory object graph plus the typed accessors over it
//! (§3 "Document (MetaInfo)", §6 `Getter`/`Putter`). Grounded on the
//! teacher's `Document::load*` constructor family and `reader/metadata.rs`'s
//! `PdfMetadata`/`InfoMetadata`, generalized to the full `LoadOptions`/
//! `SaveOptions` surface SPEC_FULL.md adds around them.
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use rand::RngCore;

use crate::dictionary::Dictionary;
use crate::encoding;
use crate::encryption::{self, EncryptionState, Permissions};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId, Stream};
use crate::reader::Reader;
use crate::writer::Writer;
use crate::xref::{Xref, XrefType};

const NULL_OBJECT: Object = Object::Null;

/// PDF version as declared in the `%PDF-X.Y` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const V1_0: Version = Version { major: 1, minor: 0 };
    pub const V1_4: Version = Version { major: 1, minor: 4 };
    pub const V1_5: Version = Version { major: 1, minor: 5 };
    pub const V1_7: Version = Version { major: 1, minor: 7 };
    pub const V2_0: Version = Version { major: 2, minor: 0 };

    pub fn parse(header: &str) -> Option<Version> {
        let (major, minor) = header.split_once('.')?;
        Some(Version {
            major: major.trim().parse().ok()?,
            minor: minor.trim().parse().ok()?,
        })
    }

    /// Whether this version's writer should prefer a `/XRef` stream
    /// (possible since 1.5) over a classical table.
    pub fn supports_xref_streams(&self) -> bool {
        *self >= Version::V1_5
    }

    /// Selects the Standard Security Handler revision/cipher this version
    /// implies (§6 Configuration passed to a Writer).
    fn default_encryption_revision(&self) -> (u8, usize, bool) {
        if *self >= Version::V1_7 {
            (4, 16, true)
        } else if *self >= Version::V1_4 {
            (3, 16, false)
        } else {
            (2, 5, false)
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::V1_7
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// §6 Reader configuration: how strictly to treat malformed input, and who
/// to ask for a password when the document is encrypted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorHandling {
    #[default]
    Strict,
    Report,
    Recover,
}

pub struct LoadOptions {
    pub password_callback: Option<Box<dyn Fn(&[u8], u32) -> Option<String>>>,
    pub error_handling: ErrorHandling,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            password_callback: None,
            error_handling: ErrorHandling::Strict,
        }
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("password_callback", &self.password_callback.is_some())
            .field("error_handling", &self.error_handling)
            .finish()
    }
}

/// §6 Writer configuration.
pub struct SaveOptions {
    pub version: Version,
    pub id: Option<[Vec<u8>; 2]>,
    pub user_password: Option<String>,
    pub owner_password: Option<String>,
    pub permissions: Permissions,
    /// `None` picks the form the version supports (a stream from 1.5 on).
    pub use_xref_streams: Option<bool>,
    pub human_readable: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            version: Version::default(),
            id: None,
            user_password: None,
            owner_password: None,
            permissions: Permissions::default(),
            use_xref_streams: None,
            human_readable: false,
        }
    }
}

/// The common `/Info` dictionary fields (§F), decoded/encoded as
/// `TextString`s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
}

/// Lightweight document facts extractable without materializing the whole
/// object graph (§F); `Document::load_metadata*` returns this.
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    pub version: Version,
    pub xref_type: XrefType,
    pub is_encrypted: bool,
    pub page_count: Option<i64>,
    pub info: InfoMetadata,
}

/// A read-only snapshot of §6's `MetaInfo`: version, ID, Catalog/Info
/// references, and the trailer with xref bookkeeping keys stripped.
#[derive(Debug, Clone)]
pub struct MetaInfo {
    pub version: Version,
    pub id: Option<(Vec<u8>, Vec<u8>)>,
    pub root: Option<ObjectId>,
    pub info: Option<ObjectId>,
    pub trailer: Dictionary,
}

/// `Getter` (§6): read access to the resolved object graph.
pub trait Getter {
    fn resolve<'a>(&'a self, value: &'a Object) -> Result<&'a Object>;
    fn decode_stream(&self, stream: &Stream) -> Result<Vec<u8>>;
    fn meta(&self) -> MetaInfo;
}

const XREF_KEYS: &[&[u8]] = &[b"Size", b"Prev", b"XRefStm", b"W", b"Index", b"Type", b"Filter", b"DecodeParms", b"Length"];

pub struct Document {
    pub version: Version,
    pub trailer: Dictionary,
    pub reference_table: Xref,
    pub objects: HashMap<ObjectId, Object>,
    pub encryption_state: Option<EncryptionState>,
    pub load_warnings: Vec<Error>,
    next_id: u32,
}

impl Document {
    pub fn new(version: Version) -> Self {
        Document {
            version,
            trailer: Dictionary::new(),
            reference_table: Xref::new(0, XrefType::CrossReferenceTable),
            objects: HashMap::new(),
            encryption_state: None,
            load_warnings: Vec::new(),
            next_id: 1,
        }
    }

    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(Error::MissingXrefEntry)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(&id).ok_or(Error::MissingXrefEntry)
    }

    /// Chases a possibly-absent `Reference` down to its value, per §4.5's
    /// resolve contract (a reference to a never-written object is `Null`,
    /// not an error).
    pub fn dereference<'a>(&'a self, value: &'a Object) -> Result<(ObjectId, &'a Object)> {
        let mut current = value;
        let mut current_id = (0, 0);
        let mut seen = HashSet::new();
        while let Object::Reference(id) = current {
            if !seen.insert(*id) {
                return Err(Error::ReferenceCycle(*id));
            }
            current_id = *id;
            current = self.objects.get(id).unwrap_or(&NULL_OBJECT);
        }
        Ok((current_id, current))
    }

    /// Tries `password` against the document's `/Encrypt` dictionary
    /// without installing it; used by the reader to probe the empty
    /// password before prompting the caller.
    pub fn authenticate_password(&self, password: &str) -> Result<()> {
        EncryptionState::decode(self, password).map(|_| ())
    }

    pub fn file_id_bytes(&self) -> Vec<u8> {
        self.trailer
            .get(b"ID")
            .and_then(Object::as_array)
            .ok()
            .and_then(|arr| arr.first())
            .and_then(|o| o.as_str().ok())
            .map(|b| b.to_vec())
            .unwrap_or_default()
    }

    pub fn get_catalog(&self) -> Result<&Dictionary> {
        let root = self.trailer.get(b"Root")?;
        let (_, obj) = self.dereference(root)?;
        obj.as_dict()
    }

    pub fn meta(&self) -> MetaInfo {
        let id = self.trailer.get(b"ID").and_then(Object::as_array).ok().and_then(|arr| match arr {
            [a, b, ..] => Some((a.as_str().ok()?.to_vec(), b.as_str().ok()?.to_vec())),
            _ => None,
        });
        let mut trailer = self.trailer.clone();
        for key in XREF_KEYS {
            trailer.remove(key);
        }
        MetaInfo {
            version: self.version,
            id,
            root: self.trailer.get(b"Root").and_then(Object::as_reference).ok(),
            info: self.trailer.get(b"Info").and_then(Object::as_reference).ok(),
            trailer,
        }
    }

    pub fn info_metadata(&self) -> InfoMetadata {
        let info_dict = self
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| self.dereference(o).ok())
            .and_then(|(_, o)| o.as_dict().ok());

        let field = |key: &[u8]| info_dict.and_then(|d| d.get(key).ok()).and_then(|o| o.as_text_string().ok());
        InfoMetadata {
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            keywords: field(b"Keywords"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
            creation_date: field(b"CreationDate"),
            mod_date: field(b"ModDate"),
        }
    }

    /// Writes `info` into the Info dictionary, creating one (and an Info
    /// reference in the trailer) if none exists yet.
    pub fn set_info_metadata(&mut self, info: &InfoMetadata) {
        let info_id = match self.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => id,
            Err(_) => {
                let id = self.alloc();
                self.trailer.set("Info", Object::Reference(id));
                id
            }
        };
        let dict = match self.objects.entry(info_id).or_insert_with(|| Object::Dictionary(Dictionary::new())).as_dict_mut() {
            Ok(d) => d,
            Err(_) => return,
        };

        let set_or_remove = |dict: &mut Dictionary, key: &str, value: &Option<String>| match value {
            Some(v) => dict.set(key, Object::String(encoding::encode_text_string(v), crate::object::StringFormat::Literal)),
            None => {
                dict.remove(key.as_bytes());
            }
        };
        set_or_remove(dict, "Title", &info.title);
        set_or_remove(dict, "Author", &info.author);
        set_or_remove(dict, "Subject", &info.subject);
        set_or_remove(dict, "Keywords", &info.keywords);
        set_or_remove(dict, "Creator", &info.creator);
        set_or_remove(dict, "Producer", &info.producer);
        set_or_remove(dict, "CreationDate", &info.creation_date);
        set_or_remove(dict, "ModDate", &info.mod_date);
    }

    /// Shallow peek at `Root -> Pages -> Count`, without walking the page
    /// tree (page-tree navigation is an external-collaborator concern).
    pub fn page_count(&self) -> Option<i64> {
        let catalog = self.get_catalog().ok()?;
        let pages = catalog.get(b"Pages").ok()?;
        let (_, pages) = self.dereference(pages).ok()?;
        pages.as_dict().ok()?.get(b"Count").and_then(Object::as_i64).ok()
    }

    /// Replaces every stream's content with its decoded form (§F).
    pub fn decompress(&mut self) {
        for object in self.objects.values_mut() {
            if let Object::Stream(stream) = object {
                stream.decompress();
            }
        }
    }

    /// Re-compresses every stream not already carrying a filter (§F).
    pub fn compress(&mut self) {
        for object in self.objects.values_mut() {
            if let Object::Stream(stream) = object {
                stream.compress();
            }
        }
    }

    fn alloc(&mut self) -> ObjectId {
        let id = (self.next_id.max(self.reference_table.max_id() + 1), 0);
        self.next_id = id.0 + 1;
        id
    }

    // ---- Loading -------------------------------------------------------

    pub fn load_mem(buffer: &[u8]) -> Result<Document> {
        Reader::load(buffer, LoadOptions::default())
    }

    pub fn load_mem_with_password(buffer: &[u8], password: &str) -> Result<Document> {
        let password = password.to_string();
        Reader::load(
            buffer,
            LoadOptions {
                password_callback: Some(Box::new(move |_, _| Some(password.clone()))),
                error_handling: ErrorHandling::Strict,
            },
        )
    }

    pub fn load_mem_with_options(buffer: &[u8], options: LoadOptions) -> Result<Document> {
        Reader::load(buffer, options)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Document> {
        let buffer = std::fs::read(path).map_err(Error::Io)?;
        Document::load_mem(&buffer)
    }

    pub fn load_with_options(path: impl AsRef<Path>, options: LoadOptions) -> Result<Document> {
        let buffer = std::fs::read(path).map_err(Error::Io)?;
        Document::load_mem_with_options(&buffer, options)
    }

    pub fn load_metadata(buffer: &[u8]) -> Result<PdfMetadata> {
        Reader::load_metadata(buffer, None)
    }

    pub fn load_metadata_with_password(buffer: &[u8], password: &str) -> Result<PdfMetadata> {
        Reader::load_metadata(buffer, Some(password))
    }

    // ---- Saving ----------------------------------------------------------

    pub fn save(&self) -> Result<Vec<u8>> {
        self.save_with_options(SaveOptions {
            version: self.version,
            ..SaveOptions::default()
        })
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.save()?;
        std::fs::write(path, bytes).map_err(Error::Io)
    }

    pub fn save_with_options(&self, options: SaveOptions) -> Result<Vec<u8>> {
        let catalog = self.get_catalog().map_err(|_| Error::MissingPages)?;
        if catalog.get(b"Pages").is_err() {
            return Err(Error::MissingPages);
        }

        let use_xref_streams = options.use_xref_streams.unwrap_or_else(|| options.version.supports_xref_streams());
        let header = format!("%PDF-{}\n%\u{e2}\u{e3}\u{cf}\u{d3}\n", options.version)
            .chars()
            .map(|c| c as u8)
            .collect::<Vec<u8>>();

        let starting_id = self.objects.keys().map(|id| id.0).max().unwrap_or(0) + 1;
        let mut writer = Writer::new(&header, starting_id, use_xref_streams);

        let encrypt_info = match (&options.user_password, &options.owner_password) {
            (None, None) => None,
            (user, owner) => {
                let (revision, key_bytes, _) = options.version.default_encryption_revision();
                let id0 = options.id.as_ref().map(|ids| ids[0].clone()).unwrap_or_else(random_id_component);
                let (dict, state) = encryption::build_encrypt_dictionary(
                    owner.as_deref().unwrap_or(""),
                    user.as_deref().unwrap_or(""),
                    options.permissions,
                    revision,
                    key_bytes,
                    &id0,
                );
                Some((dict, state, id0))
            }
        };

        if let Some((_, ref state, _)) = encrypt_info {
            writer.set_encryption(state.clone());
        }

        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort_unstable();

        // Streams and non-zero-generation objects can't live in an object
        // stream (§4.6); classical xref tables have no `Compressed` entry
        // type either, so packing only applies when writing an `/XRef`
        // stream.
        let mut direct = Vec::new();
        let mut compressible: Vec<(ObjectId, Object)> = Vec::new();
        for id in ids {
            let object = self.objects[&id].clone();
            if use_xref_streams && id.1 == 0 && !matches!(object, Object::Stream(_)) {
                compressible.push((id, object));
            } else {
                direct.push((id, object));
            }
        }
        for (id, object) in direct {
            writer.put(id, object)?;
        }
        if !compressible.is_empty() {
            writer.write_compressed(compressible)?;
        }

        let mut trailer = Dictionary::new();
        if let Ok(root) = self.trailer.get(b"Root").and_then(Object::as_reference) {
            trailer.set("Root", Object::Reference(root));
        }
        if let Ok(info) = self.trailer.get(b"Info").and_then(Object::as_reference) {
            trailer.set("Info", Object::Reference(info));
        }

        let (id0, id1) = match options.id {
            Some([a, b]) => (a, b),
            None => (random_id_component(), random_id_component()),
        };
        trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(id0.clone(), crate::object::StringFormat::Hexadecimal),
                Object::String(id1, crate::object::StringFormat::Hexadecimal),
            ]),
        );

        if let Some((encrypt_dict, _, _)) = encrypt_info {
            let encrypt_id = writer.alloc();
            writer.put(encrypt_id, Object::Dictionary(encrypt_dict))?;
            trailer.set("Encrypt", Object::Reference(encrypt_id));
        }

        writer.close(trailer)
    }
}

fn random_id_component() -> Vec<u8> {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes.to_vec()
}

impl Getter for Document {
    fn resolve<'a>(&'a self, value: &'a Object) -> Result<&'a Object> {
        Ok(self.dereference(value)?.1)
    }

    fn decode_stream(&self, stream: &Stream) -> Result<Vec<u8>> {
        stream.decompressed_content()
    }

    fn meta(&self) -> MetaInfo {
        Document::meta(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_major_minor() {
        assert_eq!(Version::parse("1.7"), Some(Version { major: 1, minor: 7 }));
        assert!(Version::V1_7.supports_xref_streams());
        assert!(!Version::V1_4.supports_xref_streams());
    }

    #[test]
    fn meta_strips_xref_bookkeeping_keys() {
        let mut doc = Document::new(Version::V1_7);
        doc.trailer.set("Size", Object::Integer(10));
        doc.trailer.set("Root", Object::Reference((1, 0)));
        let meta = doc.meta();
        assert!(meta.trailer.get(b"Size").is_err());
        assert_eq!(meta.root, Some((1, 0)));
    }

    #[test]
    fn save_without_pages_fails() {
        let mut doc = Document::new(Version::V1_7);
        let catalog_id = (1, 0);
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        doc.objects.insert(catalog_id, Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        assert!(doc.save().is_err());
    }
}
