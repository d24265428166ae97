use log::warn;
use std::collections::{HashMap, HashSet};

use super::Reader;
use crate::encryption::{self, EncryptionState};
use crate::error::ParseError;
use crate::object_stream::ObjectStream;
use crate::parser::{self, ParserInput};
use crate::xref::XrefEntry;
use crate::{Error, Object, ObjectId, Result};

impl Reader<'_> {
    /// Encrypted documents can't be loaded object-by-object the normal way:
    /// the key needed to decrypt every other object depends on the
    /// password, which can only be checked once the `/Encrypt` dictionary
    /// (itself unencrypted) has been located. So this pass first slurps
    /// every object's raw bytes, authenticates, then decrypts and parses.
    pub(super) fn load_encrypted_document(&mut self) -> Result<()> {
        let entries: Vec<_> = self.document.reference_table.entries.iter().map(|(k, v)| (*k, *v)).collect();

        let mut object_streams = Vec::new();
        for (obj_num, entry) in entries {
            match entry {
                XrefEntry::Normal { offset, .. } => {
                    if let Ok((obj_id, raw_bytes)) = self.extract_raw_object(offset as usize) {
                        self.raw_objects.insert(obj_id, raw_bytes);
                    }
                }
                XrefEntry::Compressed { container, index } => object_streams.push((obj_num, container, index)),
                XrefEntry::Free { .. } | XrefEntry::UnusableFree => {}
            }
        }

        self.parse_encryption_dictionary()?;
        let require_password = self.options.error_handling == crate::document::ErrorHandling::Strict;
        if self.authenticate_and_setup_encryption(require_password)?.is_none() {
            return Ok(());
        }
        let state = self.encryption_state.clone().expect("just authenticated");

        let encrypt_ref = self.document.trailer.get(b"Encrypt").ok().and_then(|o| o.as_reference().ok());

        let raw_objects = std::mem::take(&mut self.raw_objects);
        for (obj_id, raw_bytes) in &raw_objects {
            if encrypt_ref == Some(*obj_id) {
                continue;
            }
            if let Ok((id, mut obj)) = self.parse_raw_object(raw_bytes) {
                let _ = encryption::decrypt_object(&state, *obj_id, &mut obj);
                self.document.objects.insert(id, obj);
            }
        }

        let mut streams_to_process: HashMap<u32, Vec<(u32, u16)>> = HashMap::new();
        for (obj_num, container_id, index) in object_streams {
            streams_to_process.entry(container_id).or_default().push((obj_num, index));
        }
        for (container_id, objects_in_stream) in streams_to_process {
            let Some(container_obj) = self.document.objects.get_mut(&(container_id, 0)) else { continue };
            let Ok(stream) = container_obj.as_stream_mut() else { continue };
            let Ok(object_stream) = ObjectStream::new(stream) else { continue };
            for (obj_num, _index) in objects_in_stream {
                let obj_id = (obj_num, 0);
                if let Some(obj) = object_stream.objects.get(&obj_id) {
                    self.document.objects.insert(obj_id, obj.clone());
                }
            }
        }

        self.document.encryption_state = Some(state);
        if let Some(enc_ref) = encrypt_ref {
            self.document.objects.remove(&enc_ref);
        }
        self.document.trailer.remove(b"Encrypt");

        Ok(())
    }

    pub(super) fn parse_raw_object(&self, raw_bytes: &[u8]) -> Result<(ObjectId, Object)> {
        parser::indirect_object(ParserInput::new_extra(raw_bytes, "indirect object"), 0, None, self, &mut HashSet::new())
    }

    pub(super) fn parse_encryption_dictionary(&mut self) -> Result<()> {
        let Ok(encrypt_ref) = self.document.trailer.get(b"Encrypt").and_then(|o| o.as_reference()) else {
            return Ok(());
        };
        if let Some(raw_bytes) = self.raw_objects.get(&encrypt_ref) {
            if let Ok((_, obj)) = self.parse_raw_object(raw_bytes) {
                self.document.objects.insert(encrypt_ref, obj);
            }
        } else {
            let offset = self.get_offset(encrypt_ref)?;
            let (_, encrypt_obj) = self.read_object(offset as usize, Some(encrypt_ref), &mut HashSet::new())?;
            self.document.objects.insert(encrypt_ref, encrypt_obj);
        }
        Ok(())
    }

    pub(super) fn authenticate_and_setup_encryption(&mut self, require_password: bool) -> Result<Option<String>> {
        let id0 = self.document.file_id_bytes();
        let password = self.resolve_password(&id0);
        match (password, require_password) {
            (Some(pwd), _) => {
                let state = EncryptionState::decode(&self.document, &pwd)?;
                self.encryption_state = Some(state);
                Ok(Some(pwd))
            }
            (None, true) => Err(Error::AuthenticationRequired(id0)),
            (None, false) => {
                warn!("PDF is encrypted and requires a password");
                Ok(None)
            }
        }
    }

    pub(super) fn setup_encryption_for_metadata(&mut self) -> Result<()> {
        self.parse_encryption_dictionary()?;
        self.authenticate_and_setup_encryption(true)?;
        Ok(())
    }

    /// Finds the `n g obj ... endobj` span at `offset` by hand: the
    /// ordinary parser can't run yet because decryption (which needs the
    /// bytes first) hasn't happened.
    pub(super) fn extract_raw_object(&mut self, offset: usize) -> Result<(ObjectId, Vec<u8>)> {
        if offset > self.buffer.len() {
            return Err(Error::InvalidOffset(offset));
        }
        let slice = &self.buffer[offset..];
        let mut pos = 0;
        while pos < slice.len() && slice[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let num_start = pos;
        while pos < slice.len() && slice[pos].is_ascii_digit() {
            pos += 1;
        }
        let obj_num: u32 = std::str::from_utf8(&slice[num_start..pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(Error::Parse(ParseError::InvalidXref))?;

        while pos < slice.len() && slice[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let gen_start = pos;
        while pos < slice.len() && slice[pos].is_ascii_digit() {
            pos += 1;
        }
        let obj_gen: u16 = std::str::from_utf8(&slice[gen_start..pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(Error::Parse(ParseError::InvalidXref))?;

        while pos < slice.len() && slice[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos + 3 > slice.len() || &slice[pos..pos + 3] != b"obj" {
            return Err(Error::Parse(ParseError::InvalidXref));
        }
        pos += 3;

        let mut end_pos = pos;
        while end_pos + 6 <= slice.len() {
            if &slice[end_pos..end_pos + 6] == b"endobj" {
                end_pos += 6;
                break;
            }
            end_pos += 1;
        }
        if end_pos > slice.len() {
            return Err(Error::Parse(ParseError::InvalidXref));
        }

        Ok(((obj_num, obj_gen), slice[0..end_pos].to_vec()))
    }
}
