//! Incremental/full writer (C7): canonical object formatting plus the
//! `Alloc`/`Put`/`OpenStream`/`WriteCompressed`/`Close` state machine.
//! Grounded on the teacher's emphasis on byte-exact round-tripping in
//! `reader/mod.rs` (offsets recorded exactly where bytes are written) and
//! on [`crate::xref::Xref`]'s two on-disk encodings, which this module is
//! the write-side mirror of.
use crate::dictionary::Dictionary;
use crate::encryption::{self, EncryptionState};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId, Stream};
use crate::object_stream::ObjectStream;
use crate::xref::{Xref, XrefEntry, XrefType};

/// Recursively renders `obj` in the shortest safe literal form (§4.1/§4.6).
/// This is the sole formatter: [`Object`]'s `Display` impl delegates here,
/// and the writer uses it directly for indirect-object bodies.
pub fn format_object(out: &mut Vec<u8>, obj: &Object) {
    match obj {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => {
            let mut buf = itoa::Buffer::new();
            out.extend_from_slice(buf.format(*i).as_bytes());
        }
        Object::Real(f) => crate::object::write_real(out, *f),
        Object::Name(n) => crate::object::write_name(out, n),
        Object::String(s, fmt) => crate::object::write_string(out, s, *fmt),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                format_object(out, item);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => format_dictionary(out, dict),
        Object::Stream(stream) => {
            format_dictionary(out, &stream.dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(id) => {
            out.extend_from_slice(format!("{} {} R", id.0, id.1).as_bytes());
        }
    }
}

fn format_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        crate::object::write_name(out, key);
        out.push(b' ');
        format_object(out, value);
    }
    out.extend_from_slice(b" >>");
}

/// Groups a sorted id list into `(first, count)` subsections, as both the
/// classical table and the `/Index` array of an xref stream require.
fn compress_index(ids: &[u32]) -> Vec<(u32, u32)> {
    let mut out: Vec<(u32, u32)> = Vec::new();
    for &id in ids {
        match out.last_mut() {
            Some((start, count)) if *start + *count == id => *count += 1,
            _ => out.push((id, 1)),
        }
    }
    out
}

struct OpenStream {
    id: ObjectId,
    dict: Dictionary,
    content: Vec<u8>,
}

/// Builds a new PDF file body from scratch, or the appended tail of an
/// incremental update (the caller decides which by seeding `buffer` and
/// `xref` before the first [`Writer::put`]).
pub struct Writer {
    buffer: Vec<u8>,
    xref: Xref,
    next_id: u32,
    pending: Vec<(ObjectId, Object)>,
    open_stream: Option<OpenStream>,
    encryption: Option<EncryptionState>,
    use_xref_stream: bool,
}

impl Writer {
    pub fn new(header: &[u8], starting_id: u32, use_xref_stream: bool) -> Self {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(header);
        Writer {
            buffer,
            xref: Xref::new(0, if use_xref_stream { XrefType::CrossReferenceStream } else { XrefType::CrossReferenceTable }),
            next_id: starting_id,
            pending: Vec::new(),
            open_stream: None,
            encryption: None,
            use_xref_stream,
        }
    }

    /// Continues appending bytes for an incremental update; `xref` should
    /// already carry every entry visible to earlier sections via `/Prev`.
    pub fn resume(buffer: Vec<u8>, xref: Xref, next_id: u32, use_xref_stream: bool) -> Self {
        Writer {
            buffer,
            xref,
            next_id,
            pending: Vec::new(),
            open_stream: None,
            encryption: None,
            use_xref_stream,
        }
    }

    pub fn set_encryption(&mut self, state: EncryptionState) {
        self.encryption = Some(state);
    }

    pub fn alloc(&mut self) -> ObjectId {
        let id = (self.next_id, 0);
        self.next_id += 1;
        id
    }

    /// Records `value` under `id`. Queued instead of written immediately
    /// while a stream is open, per §4.6.
    pub fn put(&mut self, id: ObjectId, value: Object) -> Result<()> {
        if self.open_stream.is_some() {
            self.pending.push((id, value));
            return Ok(());
        }
        self.write_object(id, value)
    }

    fn write_object(&mut self, id: ObjectId, mut value: Object) -> Result<()> {
        if let Some(ref state) = self.encryption {
            encryption::encrypt_object(state, id, &mut value).map_err(Error::Decryption)?;
        }
        let offset = self.buffer.len() as u32;
        self.xref.insert(id.0, XrefEntry::Normal { offset, generation: id.1 });
        self.buffer.extend_from_slice(format!("{} {} obj\n", id.0, id.1).as_bytes());
        format_object(&mut self.buffer, &value);
        self.buffer.extend_from_slice(b"\nendobj\n");
        Ok(())
    }

    /// Opens a stream body for incremental writing. Only one stream may be
    /// open at a time; `dict` need not carry `/Length`, it is computed on
    /// close.
    pub fn open_stream(&mut self, id: ObjectId, dict: Dictionary) -> Result<()> {
        if self.open_stream.is_some() {
            return Err(Error::Invalid("a stream is already open".to_string()));
        }
        self.open_stream = Some(OpenStream { id, dict, content: Vec::new() });
        Ok(())
    }

    pub fn write_stream_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let open = self.open_stream.as_mut().ok_or_else(|| Error::Invalid("no stream is open".to_string()))?;
        open.content.extend_from_slice(bytes);
        Ok(())
    }

    /// Flushes the open stream (encrypting it if the document is
    /// encrypted) and then every `Put` queued while it was open.
    pub fn close_stream(&mut self) -> Result<()> {
        let open = self.open_stream.take().ok_or_else(|| Error::Invalid("no stream is open".to_string()))?;
        let mut obj = Object::Stream(Stream::new(open.dict, open.content));
        if let Some(ref state) = self.encryption {
            encryption::encrypt_object(state, open.id, &mut obj).map_err(Error::Decryption)?;
        }

        let offset = self.buffer.len() as u32;
        self.xref.insert(open.id.0, XrefEntry::Normal { offset, generation: open.id.1 });
        self.buffer.extend_from_slice(format!("{} {} obj\n", open.id.0, open.id.1).as_bytes());
        format_object(&mut self.buffer, &obj);
        self.buffer.extend_from_slice(b"\nendobj\n");

        let pending = std::mem::take(&mut self.pending);
        for (id, value) in pending {
            self.write_object(id, value)?;
        }
        Ok(())
    }

    /// Packs `objects` into a fresh `/ObjStm`, rejecting streams and
    /// non-zero-generation ids at call time (§4.6).
    pub fn write_compressed(&mut self, objects: Vec<(ObjectId, Object)>) -> Result<ObjectId> {
        if self.open_stream.is_some() {
            return Err(Error::Invalid("cannot pack objects while a stream is open".to_string()));
        }
        let refs: Vec<(ObjectId, &Object)> = objects.iter().map(|(id, o)| (*id, o)).collect();
        let mut stream = ObjectStream::encode(&refs)?;
        stream.compress();

        let container_id = self.alloc();
        for (index, (id, _)) in objects.iter().enumerate() {
            self.xref.insert(id.0, XrefEntry::Compressed { container: container_id.0, index: index as u32 });
        }

        let offset = self.buffer.len() as u32;
        self.xref.insert(container_id.0, XrefEntry::Normal { offset, generation: 0 });
        self.buffer.extend_from_slice(format!("{} {} obj\n", container_id.0, container_id.1).as_bytes());
        format_object(&mut self.buffer, &Object::Stream(stream));
        self.buffer.extend_from_slice(b"\nendobj\n");
        Ok(container_id)
    }

    /// Flushes any pending puts, emits the xref (classical table or
    /// `/XRef` stream per how this writer was constructed), and the
    /// trailing `startxref`/`%%EOF`. The xref stream itself, like the
    /// encryption dictionary, is always written unencrypted.
    pub fn close(mut self, mut trailer: Dictionary) -> Result<Vec<u8>> {
        if self.open_stream.is_some() {
            return Err(Error::Invalid("a stream was left open at close".to_string()));
        }
        let pending = std::mem::take(&mut self.pending);
        for (id, value) in pending {
            self.write_object(id, value)?;
        }

        if self.use_xref_stream {
            let xref_id = self.alloc();
            self.xref.insert(xref_id.0, XrefEntry::Normal { offset: self.buffer.len() as u32, generation: 0 });
            self.xref.size = self.xref.max_id() + 1;

            let (rows, widths) = self.xref.encode_stream_rows();
            let mut ids: Vec<u32> = self.xref.entries.keys().copied().collect();
            ids.sort_unstable();
            let index = compress_index(&ids);

            trailer.remove(b"Size");
            trailer.set("Type", Object::Name(b"XRef".to_vec()));
            trailer.set("Size", Object::Integer(self.xref.size as i64));
            trailer.set("W", Object::Array(widths.iter().map(|w| Object::Integer(*w as i64)).collect()));
            trailer.set(
                "Index",
                Object::Array(index.iter().flat_map(|&(a, b)| [Object::Integer(a as i64), Object::Integer(b as i64)]).collect()),
            );

            let xref_offset = self.buffer.len();
            let row_width: i64 = widths.iter().map(|&w| w as i64).sum();
            let mut stream = Stream::new(trailer, rows);
            stream.compress_with_predictor(row_width);
            self.buffer.extend_from_slice(format!("{} {} obj\n", xref_id.0, xref_id.1).as_bytes());
            format_object(&mut self.buffer, &Object::Stream(stream));
            self.buffer.extend_from_slice(b"\nendobj\n");
            self.buffer.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
        } else {
            trailer.set("Size", Object::Integer((self.xref.max_id() + 1) as i64));
            let xref_offset = self.buffer.len();
            self.buffer.extend_from_slice(&self.xref.write_table());
            self.buffer.extend_from_slice(b"trailer\n");
            format_object(&mut self.buffer, &Object::Dictionary(trailer));
            self.buffer.extend_from_slice(format!("\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes());
        }

        Ok(self.buffer)
    }

    pub fn xref(&self) -> &Xref {
        &self.xref
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
