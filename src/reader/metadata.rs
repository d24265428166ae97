use std::collections::HashSet;

use super::Reader;
use crate::dictionary::Dictionary;
use crate::document::{InfoMetadata, PdfMetadata, Version};
use crate::error::{ParseError, XrefError};
use crate::object::{Object, ObjectId};
use crate::parser::{self, ParserInput};
use crate::{Error, Result};

impl Reader<'_> {
    /// Reads title/author/page-count-style facts without materializing the
    /// whole object graph. For encrypted documents this still needs to
    /// authenticate (the `/Info` dictionary is itself encrypted), but
    /// never decrypts more than the handful of objects it actually visits.
    pub(super) fn read_metadata(mut self) -> Result<PdfMetadata> {
        let offset = self.buffer.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
        self.buffer = &self.buffer[offset..];

        let version_str =
            parser::header(ParserInput::new_extra(self.buffer, "header")).ok_or(ParseError::InvalidFileHeader)?;
        let version = Version::parse(&version_str).unwrap_or_default();

        let xref_start = Self::get_xref_start(self.buffer)?;
        if xref_start > self.buffer.len() {
            return Err(Error::Xref(XrefError::Start));
        }
        let (mut xref, mut trailer) =
            parser::xref_and_trailer(ParserInput::new_extra(&self.buffer[xref_start..], "xref"), &self)?;

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
                parser::xref_and_trailer(ParserInput::new_extra(&self.buffer[prev as usize..], ""), &self)?;
            xref.merge(prev_xref);
            prev_xref_start = prev_trailer.get(b"Prev").cloned().ok();
        }

        let xref_type = xref.xref_type;
        self.document.reference_table = xref;
        self.document.trailer = trailer;

        let is_encrypted = self.document.trailer.get(b"Encrypt").is_ok();
        if is_encrypted {
            self.setup_encryption_for_metadata()?;
        }

        let info = self.extract_info_metadata()?;
        let page_count = self.extract_page_count().ok();

        Ok(PdfMetadata {
            version,
            xref_type,
            is_encrypted,
            page_count,
            info,
        })
    }

    pub(super) fn extract_info_metadata(&self) -> Result<InfoMetadata> {
        let Some(info_id) = self.document.trailer.get(b"Info").ok().and_then(|o| o.as_reference().ok()) else {
            return Ok(InfoMetadata::default());
        };

        let mut already_seen = HashSet::new();
        let Ok(info_obj) = self.get_object(info_id, &mut already_seen) else {
            return Ok(InfoMetadata::default());
        };
        let Ok(info_dict) = info_obj.as_dict() else {
            return Ok(InfoMetadata::default());
        };

        Ok(InfoMetadata {
            title: Self::extract_string_field(info_dict, b"Title"),
            author: Self::extract_string_field(info_dict, b"Author"),
            subject: Self::extract_string_field(info_dict, b"Subject"),
            keywords: Self::extract_string_field(info_dict, b"Keywords"),
            creator: Self::extract_string_field(info_dict, b"Creator"),
            producer: Self::extract_string_field(info_dict, b"Producer"),
            creation_date: Self::extract_string_field(info_dict, b"CreationDate"),
            mod_date: Self::extract_string_field(info_dict, b"ModDate"),
        })
    }

    fn extract_string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
        dict.get(key).ok().and_then(|o| o.as_text_string().ok())
    }

    pub(super) fn extract_page_count(&self) -> Result<i64> {
        let root_ref = self.document.trailer.get(b"Root").and_then(Object::as_reference)?;
        let mut already_seen = HashSet::new();
        let catalog = self.get_object(root_ref, &mut already_seen)?;
        let pages_ref = catalog.as_dict()?.get(b"Pages").and_then(Object::as_reference)?;
        self.get_pages_tree_count(pages_ref, &mut HashSet::new())
    }

    fn get_pages_tree_count(&self, pages_id: ObjectId, seen: &mut HashSet<ObjectId>) -> Result<i64> {
        if !seen.insert(pages_id) {
            return Err(Error::ReferenceCycle(pages_id));
        }

        let mut already_seen = HashSet::new();
        let pages_obj = self.get_object(pages_id, &mut already_seen)?;
        let pages_dict = pages_obj.as_dict()?;

        match pages_dict.get_type() {
            Ok(b"Page") => Ok(1),
            Ok(b"Pages") => {
                if let Ok(count) = pages_dict.get(b"Count").and_then(Object::as_i64) {
                    if count >= 0 {
                        return Ok(count);
                    }
                }
                let kids = pages_dict.get(b"Kids").and_then(Object::as_array)?;
                let mut total = 0;
                for kid in kids {
                    if let Ok(kid_ref) = kid.as_reference() {
                        total += self.get_pages_tree_count(kid_ref, seen).unwrap_or(0);
                    }
                }
                Ok(total)
            }
            _ => Ok(1),
        }
    }
}
