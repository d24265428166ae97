use std::collections::BTreeMap;

use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result};
use crate::object::{Object, ObjectId, Stream};
use crate::parser::{self, ParserInput};

/// A decoded `/ObjStm`: `N` objects packed back-to-back starting at byte
/// `First` within the decompressed stream body, indexed by an
/// `(object_number, relative_offset)` table at the front.
pub struct ObjectStream {
    pub objects: BTreeMap<ObjectId, Object>,
}

impl ObjectStream {
    /// Decodes `stream` (decompressing it in place if needed) and parses
    /// every encapsulated object.
    pub fn new(stream: &mut Stream) -> Result<Self> {
        if stream.dict.get(b"Filter").is_ok() {
            let decoded = stream.decompressed_content()?;
            stream.set_plain_content(decoded);
        }

        let n = stream.dict.get(b"N").and_then(Object::as_i64)? as usize;
        let first = stream.dict.get(b"First").and_then(Object::as_i64)? as usize;

        let header_input = ParserInput::new_extra(&stream.content, "objstm header");
        let pairs = parser::object_stream_header(header_input, n)
            .ok_or(Error::Parse(ParseError::InvalidXref))?;

        let mut objects = BTreeMap::new();
        for (num, rel_offset) in pairs {
            let start = first + rel_offset;
            if start > stream.content.len() {
                continue;
            }
            let body = &stream.content[start..];
            if let Some(obj) = parser::direct_object(ParserInput::new_extra(body, "objstm object")) {
                objects.insert((num, 0), obj);
            }
        }

        Ok(ObjectStream { objects })
    }

    /// Packs `objects` (in the given order) into a new `/ObjStm` body.
    /// Rejects streams, references, and non-zero generations per §4.6.
    pub fn encode(objects: &[(ObjectId, &Object)]) -> Result<Stream> {
        let mut index = Vec::new();
        let mut body = Vec::new();

        for (id, obj) in objects {
            if id.1 != 0 {
                return Err(Error::Invalid(format!(
                    "object {id:?} has non-zero generation and cannot be packed into an object stream"
                )));
            }
            match obj {
                Object::Stream(_) => {
                    return Err(Error::Invalid(
                        "streams cannot be packed into an object stream".to_string(),
                    ))
                }
                _ => {}
            }
            index.push((id.0, body.len()));
            let mut buf = Vec::new();
            crate::writer::format_object(&mut buf, obj);
            body.extend_from_slice(&buf);
            body.push(b'\n');
        }

        let mut header = Vec::new();
        for (num, offset) in &index {
            header.extend_from_slice(format!("{num} {offset} ").as_bytes());
        }
        let first = header.len();

        let mut content = header;
        content.extend_from_slice(&body);

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"ObjStm".to_vec()));
        dict.set("N", Object::Integer(objects.len() as i64));
        dict.set("First", Object::Integer(first as i64));

        Ok(Stream::new(dict, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_objects() {
        let objs = vec![
            ((1, 0), Object::Integer(42)),
            ((2, 0), Object::Name(b"Foo".to_vec())),
        ];
        let refs: Vec<(ObjectId, &Object)> = objs.iter().map(|(id, o)| (*id, o)).collect();
        let mut stream = ObjectStream::encode(&refs).unwrap();

        let decoded = ObjectStream::new(&mut stream).unwrap();
        assert_eq!(decoded.objects.get(&(1, 0)), Some(&Object::Integer(42)));
        assert_eq!(decoded.objects.get(&(2, 0)), Some(&Object::Name(b"Foo".to_vec())));
    }

    #[test]
    fn rejects_stream_members() {
        let s = Object::Stream(Stream::new(Dictionary::new(), vec![]));
        let objs = vec![((1, 0), &s)];
        assert!(ObjectStream::encode(&objs).is_err());
    }
}
