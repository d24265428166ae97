use std::fmt;
use std::str;

use crate::dictionary::Dictionary;
use crate::encoding;
use crate::error::{Error, ParseError, Result};

/// Object number + generation number. `(0, 65535)` is the head of the free
/// list and never resolves to a real object.
pub type ObjectId = (u32, u16);

/// How a [`Object::String`] was written in its source file. Both encode the
/// same bytes; the variant only controls which literal form the writer
/// prefers to reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// A stream's byte payload, before its filter chain is decoded.
///
/// `content` always holds the *raw* bytes that sat between the `stream` EOL
/// and `endstream`, after decryption (the Crypt pseudo-filter is applied by
/// [`crate::encryption`] directly to this buffer, never appearing in
/// `Filter`). Decoding the declared `Filter`/`DecodeParms` chain is a
/// separate, explicit step via [`Stream::decompressed_content`].
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    pub allows_compression: bool,
    /// Byte offset of `content` relative to the start of the indirect
    /// object, recorded when the parser could not yet resolve an indirect
    /// `/Length` and must come back for the bytes in a second pass.
    pub start_position: Option<usize>,
}

impl Stream {
    pub fn new(mut dict: Dictionary, content: Vec<u8>) -> Self {
        dict.set("Length", Object::Integer(content.len() as i64));
        Stream {
            dict,
            content,
            allows_compression: true,
            start_position: None,
        }
    }

    pub fn with_position(dict: Dictionary, position: usize) -> Self {
        Stream {
            dict,
            content: Vec::new(),
            allows_compression: true,
            start_position: Some(position),
        }
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.dict.set("Length", Object::Integer(content.len() as i64));
        self.content = content;
    }

    pub fn set_plain_content(&mut self, content: Vec<u8>) {
        self.dict.remove(b"Filter");
        self.dict.remove(b"DecodeParms");
        self.set_content(content);
    }

    /// Applies the stream's declared filter chain (outer to inner, i.e. in
    /// the order the `Filter` array lists them) and returns the decoded
    /// bytes. Does not touch encryption; the caller must already have
    /// decrypted `content` if the document is encrypted.
    pub fn decompressed_content(&self) -> Result<Vec<u8>> {
        crate::filters::decode(&self.dict, &self.content)
    }

    /// Replaces `content` with its decoded form and strips `Filter`/
    /// `DecodeParms`. Idempotent: a stream with no filters is left alone.
    pub fn decompress(&mut self) {
        if self.dict.get(b"Filter").is_err() {
            return;
        }
        if let Ok(data) = self.decompressed_content() {
            self.set_plain_content(data);
        }
    }

    /// Re-encodes `content` through Flate (with no predictor) if it is not
    /// already filtered and compression is allowed for this stream.
    pub fn compress(&mut self) {
        if !self.allows_compression || self.dict.get(b"Filter").is_ok() {
            return;
        }
        if let Ok(encoded) = crate::filters::flate::encode(&self.content) {
            if encoded.len() < self.content.len() {
                self.dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                self.set_content(encoded);
            }
        }
    }

    /// Like [`Stream::compress`], but runs the PNG-Up row predictor over
    /// `content` first (§4.2's xref-stream encoding: tabular, fixed-width
    /// rows compress far better once consecutive rows are diffed). `columns`
    /// is the row width in bytes (`1+W2+W3` for an xref stream).
    pub fn compress_with_predictor(&mut self, columns: i64) {
        if !self.allows_compression || self.dict.get(b"Filter").is_ok() {
            return;
        }
        let params = crate::filters::predictor::PredictorParams {
            predictor: 12,
            colors: 1,
            bits_per_component: 8,
            columns,
        };
        let filtered = crate::filters::predictor::encode(&self.content, &params);
        if let Ok(encoded) = crate::filters::flate::encode(&filtered) {
            self.dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            let mut parms = Dictionary::new();
            parms.set("Predictor", Object::Integer(12));
            parms.set("Colors", Object::Integer(1));
            parms.set("BitsPerComponent", Object::Integer(8));
            parms.set("Columns", Object::Integer(columns));
            self.dict.set("DecodeParms", Object::Dictionary(parms));
            self.set_content(encoded);
        }
    }
}

/// The core PDF value: a closed sum type covering every object that can
/// appear directly or indirectly in a PDF file body.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    /// IEEE-754 double; the writer emits the shortest decimal literal that
    /// round-trips, never exponent notation.
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn enum_variant(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            _ => Err(Error::ObjectType {
                expected: "Boolean",
                found: self.enum_variant(),
            }),
        }
    }

    /// Accepts both `Integer` and a `Real` with no fractional part, as
    /// callers frequently need an integer out of a value a lenient writer
    /// emitted as `0.0` instead of `0`.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(f) if f.fract() == 0.0 => Ok(*f as i64),
            _ => Err(Error::ObjectType {
                expected: "Integer",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(f) => Ok(*f),
            _ => Err(Error::ObjectType {
                expected: "Real",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(Error::ObjectType {
                expected: "Name",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_name_str(&self) -> Result<&str> {
        self.as_name()
            .and_then(|n| str::from_utf8(n).map_err(|_| Error::Parse(ParseError::InvalidName)))
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::ObjectType {
                expected: "String",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_str_mut(&mut self) -> Result<&mut Vec<u8>> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::ObjectType {
                expected: "String",
                found: self.enum_variant(),
            }),
        }
    }

    /// Decodes a string per the `TextString` convention: PDFDocEncoding by
    /// default, UTF-16BE when prefixed `FE FF`, UTF-8 when prefixed
    /// `EF BB BF`.
    pub fn as_text_string(&self) -> Result<String> {
        self.as_str().map(encoding::decode_text_string)
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::ObjectType {
                expected: "Array",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::ObjectType {
                expected: "Array",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            _ => Err(Error::ObjectType {
                expected: "Dictionary",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            _ => Err(Error::ObjectType {
                expected: "Dictionary",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::ObjectType {
                expected: "Stream",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::ObjectType {
                expected: "Stream",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(Error::ObjectType {
                expected: "Reference",
                found: self.enum_variant(),
            }),
        }
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}

impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Object::Real(f)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Object::Stream(s)
    }
}

impl From<Vec<Object>> for Object {
    fn from(a: Vec<Object>) -> Self {
        Object::Array(a)
    }
}

/// Name atoms outside this range (or equal to a delimiter/whitespace/`#`)
/// must be `#xx` hex-escaped on write, per §3.
fn name_needs_escape(byte: u8) -> bool {
    byte < 33 || byte > 126 || byte == b'#' || b"()<>[]{}/%".contains(&byte) || byte.is_ascii_whitespace()
}

pub(crate) fn write_name(out: &mut Vec<u8>, name: &[u8]) {
    out.push(b'/');
    for &b in name {
        if name_needs_escape(b) {
            out.push(b'#');
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        } else {
            out.push(b);
        }
    }
}

/// Chooses the literal or hex form, whichever is shorter; ties favor the
/// literal form since it is the more common and more readable one.
pub(crate) fn write_string(out: &mut Vec<u8>, bytes: &[u8], preferred: StringFormat) {
    let literal_len = literal_string_len(bytes);
    let hex_len = bytes.len() * 2 + 2;
    let use_hex = match preferred {
        StringFormat::Hexadecimal => hex_len <= literal_len,
        StringFormat::Literal => hex_len < literal_len,
    };
    if use_hex {
        write_hex_string(out, bytes);
    } else {
        write_literal_string(out, bytes);
    }
}

fn literal_string_len(bytes: &[u8]) -> usize {
    2 + bytes
        .iter()
        .map(|&b| match b {
            b'(' | b')' | b'\\' | b'\r' => 2,
            _ => 1,
        })
        .sum::<usize>()
}

fn write_literal_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

fn write_hex_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'<');
    for &b in bytes {
        out.extend_from_slice(format!("{b:02X}").as_bytes());
    }
    out.push(b'>');
}

/// Formats `f` with the fewest digits that round-trip, never using
/// exponent notation (per §3 and §4.6).
pub(crate) fn write_real(out: &mut Vec<u8>, f: f64) {
    if !f.is_finite() {
        out.extend_from_slice(b"0");
        return;
    }
    let mut s = format!("{f:.6}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s.is_empty() || s == "-" {
        s = "0".to_string();
    }
    out.extend_from_slice(s.as_bytes());
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        crate::writer::format_object(&mut buf, self);
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_round_trip_digits() {
        let mut buf = Vec::new();
        write_real(&mut buf, 1.11);
        assert_eq!(buf, b"1.11");
        let mut buf = Vec::new();
        write_real(&mut buf, 10.0);
        assert_eq!(buf, b"10");
        let mut buf = Vec::new();
        write_real(&mut buf, -0.5);
        assert_eq!(buf, b"-0.5");
    }

    #[test]
    fn name_hex_escape_round_trip() {
        let mut buf = Vec::new();
        write_name(&mut buf, b"F# minor");
        assert_eq!(buf, b"/F#23#20minor");
    }

    #[test]
    fn string_prefers_shorter_form() {
        let mut buf = Vec::new();
        write_string(&mut buf, b"hello", StringFormat::Literal);
        assert_eq!(buf, b"(hello)");
    }
}
