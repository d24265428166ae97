mod encrypted;
mod metadata;
mod object_loader;

#[cfg(test)]
mod tests;

use log::warn;
use std::cmp;
use std::collections::HashSet;
use std::sync::Mutex;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::document::{Document, ErrorHandling, LoadOptions, Version};
use crate::encryption::EncryptionState;
use crate::error::{Error, ParseError, Result, XrefError};
use crate::object_stream::ObjectStream;
use crate::parser::{self, LengthResolver, ParserInput};
use crate::scanner;
use crate::xref::XrefEntry;

pub use crate::document::PdfMetadata;

pub struct Reader<'a> {
    pub buffer: &'a [u8],
    pub document: Document,
    pub encryption_state: Option<EncryptionState>,
    pub options: LoadOptions,
    /// Raw (undecrypted) `n g obj ... endobj` byte spans, populated while
    /// loading an encrypted document: every object must be located before
    /// the `/Encrypt` dictionary can be authenticated and decryption can
    /// begin, so the first pass only extracts bytes.
    raw_objects: std::collections::HashMap<crate::object::ObjectId, Vec<u8>>,
}

impl Reader<'_> {
    pub fn load(buffer: &[u8], options: LoadOptions) -> Result<Document> {
        Reader {
            buffer,
            document: Document::new(Version::default()),
            encryption_state: None,
            options,
            raw_objects: std::collections::HashMap::new(),
        }
        .read()
    }

    pub fn load_metadata(buffer: &[u8], password: Option<&str>) -> Result<PdfMetadata> {
        let password = password.map(str::to_string);
        Reader {
            buffer,
            document: Document::new(Version::default()),
            encryption_state: None,
            options: LoadOptions {
                password_callback: password.map(|pwd| {
                    let callback: Box<dyn Fn(&[u8], u32) -> Option<String>> = Box::new(move |_, _| Some(pwd.clone()));
                    callback
                }),
                error_handling: ErrorHandling::Recover,
            },
            raw_objects: std::collections::HashMap::new(),
        }
        .read_metadata()
    }

    /// Read the whole document. The document structure can be expressed in
    /// PEG as: `document <- header indirect_object* xref trailer xref_start`.
    fn read(mut self) -> Result<Document> {
        let offset = self.buffer.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
        self.buffer = &self.buffer[offset..];

        let version_str =
            parser::header(ParserInput::new_extra(self.buffer, "header")).ok_or(ParseError::InvalidFileHeader)?;
        let version = Version::parse(&version_str).unwrap_or_default();

        match self.locate_and_merge_xref() {
            Ok(()) => {}
            Err(e) if self.options.error_handling == ErrorHandling::Recover => {
                warn!("xref unusable ({e}), falling back to a sequential scan");
                self.document.load_warnings.push(e);
                self.recover_via_scan()?;
            }
            Err(e) => return Err(e),
        }

        self.document.version = version;

        let is_encrypted = self.document.trailer.get(b"Encrypt").is_ok();
        if is_encrypted {
            self.load_encrypted_document()?;
        } else {
            self.load_objects_raw()?;
        }

        Ok(self.document)
    }

    /// Parses the xref chain (possibly following `/Prev` and `/XRefStm`
    /// across incremental updates) and installs it plus the merged trailer
    /// on `self.document`.
    fn locate_and_merge_xref(&mut self) -> Result<()> {
        let xref_start = Self::get_xref_start(self.buffer)?;
        if xref_start > self.buffer.len() {
            return Err(Error::Xref(XrefError::Start));
        }

        let (mut xref, mut trailer) =
            parser::xref_and_trailer(ParserInput::new_extra(&self.buffer[xref_start..], "xref"), self)?;

        let mut already_seen = HashSet::new();
        let mut prev_xref_start = trailer.remove(b"Prev");
        while let Some(prev) = prev_xref_start.and_then(|offset| offset.as_i64().ok()) {
            if already_seen.contains(&prev) {
                break;
            }
            already_seen.insert(prev);
            if prev < 0 || prev as usize > self.buffer.len() {
                return Err(Error::Xref(XrefError::PrevStart));
            }

            let (prev_xref, prev_trailer) =
                parser::xref_and_trailer(ParserInput::new_extra(&self.buffer[prev as usize..], ""), self)?;
            xref.merge(prev_xref);

            let prev_xref_stream_start = trailer.remove(b"XRefStm");
            if let Some(prev) = prev_xref_stream_start.and_then(|offset| offset.as_i64().ok()) {
                if prev < 0 || prev as usize > self.buffer.len() {
                    return Err(Error::Xref(XrefError::StreamStart));
                }
                let (prev_xref, _) =
                    parser::xref_and_trailer(ParserInput::new_extra(&self.buffer[prev as usize..], ""), self)?;
                xref.merge(prev_xref);
            }

            prev_xref_start = prev_trailer.get(b"Prev").cloned().ok();
        }

        let xref_entry_count = xref.max_id().checked_add(1).ok_or(ParseError::InvalidXref)?;
        if xref.size != xref_entry_count {
            warn!(
                "Size entry of trailer dictionary is {}, correct value is {}.",
                xref.size, xref_entry_count
            );
            xref.size = xref_entry_count;
        }

        self.document.trailer = trailer;
        self.document.reference_table = xref;
        Ok(())
    }

    /// Last resort (`ErrorHandling::Recover`): rebuilds a synthetic xref
    /// table from a full byte scan, and a minimal trailer (empty unless
    /// a `trailer` keyword could also be located and parsed).
    fn recover_via_scan(&mut self) -> Result<()> {
        let scan = scanner::scan(self.buffer);
        let mut xref = crate::xref::Xref::new(0, crate::xref::XrefType::CrossReferenceTable);
        for (id, offset) in scan.recovered_offsets() {
            xref.insert(id.0, XrefEntry::Normal { offset: offset as u32, generation: id.1 });
        }
        xref.size = xref.max_id() + 1;

        let mut trailer = crate::dictionary::Dictionary::new();
        for &pos in scan.trailer_positions.iter().rev() {
            if pos >= self.buffer.len() {
                continue;
            }
            if let Some(dict) = parser::trailer_dict(ParserInput::new_extra(&self.buffer[pos..], "trailer")) {
                trailer = dict;
                break;
            }
        }

        self.document.reference_table = xref;
        self.document.trailer = trailer;
        Ok(())
    }

    fn load_objects_raw(&mut self) -> Result<()> {
        let is_encrypted = self.document.trailer.get(b"Encrypt").is_ok();
        let zero_length_streams = Mutex::new(vec![]);
        let object_streams = Mutex::new(vec![]);
        let first_error: Mutex<Option<Error>> = Mutex::new(None);
        let warnings: Mutex<Vec<Error>> = Mutex::new(Vec::new());

        let entries_filter_map = |(_, entry): (&_, &_)| {
            if let XrefEntry::Normal { offset, .. } = *entry {
                let result = self.read_object(offset as usize, None, &mut HashSet::new());
                let (object_id, object) = match result {
                    Ok(obj) => obj,
                    Err(e) => {
                        warn!("object load error at offset {offset}: {e:?}");
                        match self.options.error_handling {
                            ErrorHandling::Strict => {
                                first_error.lock().expect("first_error mutex poisoned").get_or_insert(e);
                            }
                            ErrorHandling::Report => {
                                warnings.lock().expect("warnings mutex poisoned").push(e);
                            }
                            ErrorHandling::Recover => {}
                        }
                        return None;
                    }
                };

                if let Ok(stream) = object.as_stream() {
                    if stream.dict.has_type(b"ObjStm") && !is_encrypted {
                        if let Ok(obj_stream) = ObjectStream::new(&mut stream.clone()) {
                            let mut object_streams = object_streams.lock().expect("object_streams mutex poisoned");
                            object_streams.extend(obj_stream.objects);
                        }
                    } else if stream.content.is_empty() {
                        let mut zero_length_streams =
                            zero_length_streams.lock().expect("zero_length_streams mutex poisoned");
                        zero_length_streams.push(object_id);
                    }
                }

                Some((object_id, object))
            } else {
                None
            }
        };

        #[cfg(feature = "rayon")]
        {
            self.document.objects = self
                .document
                .reference_table
                .entries
                .par_iter()
                .filter_map(entries_filter_map)
                .collect();
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.document.objects = self
                .document
                .reference_table
                .entries
                .iter()
                .filter_map(entries_filter_map)
                .collect();
        }

        // First definition wins for duplicate object ids.
        for (id, entry) in object_streams.into_inner().expect("object_streams mutex poisoned") {
            self.document.objects.entry(id).or_insert(entry);
        }

        for object_id in zero_length_streams.into_inner().expect("zero_length_streams mutex poisoned") {
            let _ = self.read_stream_content(object_id);
        }

        self.document.load_warnings.extend(warnings.into_inner().expect("warnings mutex poisoned"));

        if let Some(e) = first_error.into_inner().expect("first_error mutex poisoned") {
            return Err(e);
        }

        Ok(())
    }

    fn get_xref_start(buffer: &[u8]) -> Result<usize> {
        let seek_pos = buffer.len() - cmp::min(buffer.len(), 512);
        Self::search_substring(buffer, b"%%EOF", seek_pos)
            .and_then(|eof_pos| if eof_pos > 25 { Some(eof_pos) } else { None })
            .and_then(|eof_pos| Self::search_substring(buffer, b"startxref", eof_pos - 25))
            .ok_or(Error::Xref(XrefError::Start))
            .and_then(|xref_pos| {
                if xref_pos <= buffer.len() {
                    match parser::xref_start(ParserInput::new_extra(&buffer[xref_pos..], "xref")) {
                        Some(startxref) => Ok(startxref as usize),
                        None => Err(Error::Xref(XrefError::Start)),
                    }
                } else {
                    Err(Error::Xref(XrefError::Start))
                }
            })
    }

    pub(crate) fn search_substring(buffer: &[u8], pattern: &[u8], start_pos: usize) -> Option<usize> {
        buffer
            .get(start_pos..)?
            .windows(pattern.len())
            .rposition(|window| window == pattern)
            .map(|pos| start_pos + pos)
    }

    /// Tries the password the caller actually wants, preferring the empty
    /// password (the overwhelming common case for owner-only protection)
    /// before consulting `options.password_callback`.
    pub(super) fn resolve_password(&self, id0: &[u8]) -> Option<String> {
        if self.document.authenticate_password("").is_ok() {
            return Some(String::new());
        }
        let callback = self.options.password_callback.as_ref()?;
        for attempt in 1..=3 {
            let candidate = callback(id0, attempt)?;
            if self.document.authenticate_password(&candidate).is_ok() {
                return Some(candidate);
            }
        }
        None
    }
}

impl LengthResolver for Reader<'_> {
    fn resolve_length(&self, id: crate::object::ObjectId, already_seen: &mut HashSet<crate::object::ObjectId>) -> Option<i64> {
        self.get_object(id, already_seen).ok()?.as_i64().ok()
    }
}
