//! Byte stream -> object tree (C2). Generalized from the teacher's `nom`
//! grammar: numbers are `f64` (§3 requires IEEE-754 double, the teacher
//! used `f32`), content-stream operator parsing is dropped (that grammar
//! belongs to the external content-stream layer, out of core scope), and
//! stream `Length` resolution goes through the [`LengthResolver`] trait so
//! this module does not need to know about `Reader` at all.
use std::collections::HashSet;
use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::{digit0, digit1, one_of};
use nom::combinator::{map, map_opt, map_res, opt, verify};
use nom::error::{ErrorKind, ParseError as NomParseError};
use nom::multi::{fold_many0, fold_many1, many0, many0_count};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::{AsBytes, AsChar, IResult, Input, Parser};
use nom_locate::LocatedSpan;

use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result};
use crate::object::{Object, ObjectId, Stream, StringFormat};
use crate::xref::{self, Xref, XrefEntry, XrefType};

pub(crate) type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;
pub(crate) type NomError<'a> = nom::error::Error<ParserInput<'a>>;
pub(crate) type NomResult<'a, O, E = NomError<'a>> = IResult<ParserInput<'a>, O, E>;

/// Maximum nesting depth for literal strings (`(a(b(c)d)e)`), matching the
/// teacher's own `MAX_BRACKET` safeguard against stack-exhausting input.
pub const MAX_BRACKET: usize = 100;

/// Resolves an indirect `/Length` during stream parsing. `Reader` is the
/// only implementer; kept abstract here so `parser` has no dependency on
/// `reader`.
pub trait LengthResolver {
    fn resolve_length(&self, id: ObjectId, already_seen: &mut HashSet<ObjectId>) -> Option<i64>;
}

impl LengthResolver for () {
    fn resolve_length(&self, _id: ObjectId, _already_seen: &mut HashSet<ObjectId>) -> Option<i64> {
        None
    }
}

#[inline]
fn strip_nom<O>(r: NomResult<O>) -> Option<O> {
    r.ok().map(|(_, o)| o)
}

#[inline]
fn offset_stream(object: &mut Object, offset: usize) {
    if let Object::Stream(stream) = object {
        stream.start_position = stream.start_position.and_then(|sp| sp.checked_add(offset));
    }
}

pub(crate) fn eol(input: ParserInput) -> NomResult<ParserInput> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

pub(crate) fn comment(input: ParserInput) -> NomResult<()> {
    map((tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), eol), |_| ()).parse(input)
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    b" \t\n\r\0\x0C".contains(&c)
}

#[inline]
fn is_delimiter(c: u8) -> bool {
    b"()<>[]{}/%".contains(&c)
}

#[inline]
fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

fn white_space(input: ParserInput) -> NomResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

pub(crate) fn space(input: ParserInput) -> NomResult<()> {
    fold_many0(alt((map(take_while1(is_whitespace), |_| ()), comment)), || {}, |_, _| ()).parse(input)
}

fn integer(input: ParserInput) -> NomResult<i64> {
    let (i, _) = pair(opt(one_of("+-")), digit1).parse(input)?;
    let int_input = &input[..input.len() - i.len()];
    match i64::from_str(str::from_utf8(int_input).unwrap()) {
        Ok(v) => Ok((i, v)),
        Err(_) => Err(nom::Err::Failure(NomError::from_error_kind(i, ErrorKind::Digit))),
    }
}

fn real(input: ParserInput) -> NomResult<f64> {
    let (i, _) = pair(
        opt(one_of("+-")),
        alt((
            map((digit1, tag(&b"."[..]), digit0), |_| ()),
            map(pair(tag(&b"."[..]), digit1), |_| ()),
        )),
    )
    .parse(input)?;

    let float_input = &input[..input.len() - i.len()];
    let s = str::from_utf8(float_input).unwrap();
    match f64::from_str(s) {
        Ok(v) => Ok((i, v)),
        Err(_) => Err(nom::Err::Failure(NomError::from_error_kind(i, ErrorKind::Digit))),
    }
}

fn hex_char(input: ParserInput) -> NomResult<u8> {
    map_res(
        verify(take(2usize), |h: &ParserInput| h.as_bytes().iter().copied().all(AsChar::is_hex_digit)),
        |x: ParserInput| u8::from_str_radix(str::from_utf8(&x).unwrap(), 16),
    )
    .parse(input)
}

fn oct_char(input: ParserInput) -> NomResult<u8> {
    map_res(take_while_m_n(1, 3, AsChar::is_oct_digit), |x: ParserInput| {
        u16::from_str_radix(str::from_utf8(&x).unwrap(), 8).map(|o| o as u8)
    })
    .parse(input)
}

pub(crate) fn name(input: ParserInput) -> NomResult<Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: ParserInput| {
                if c[0] != b'#' && is_regular(c[0]) {
                    Some(c[0])
                } else {
                    None
                }
            }),
        ))),
    )
    .parse(input)
}

fn escape_sequence(input: ParserInput) -> NomResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(0x08)),
            map(tag(&b"f"[..]), |_| Some(0x0C)),
            map(take(1usize), |c: ParserInput| Some(c[0])),
        )),
    )
    .parse(input)
}

enum InnerLiteralString<'a> {
    Direct(ParserInput<'a>),
    Escape(Option<u8>),
    Eol(ParserInput<'a>),
    Nested(Vec<u8>),
}

impl InnerLiteralString<'_> {
    fn push(&self, output: &mut Vec<u8>) {
        match self {
            InnerLiteralString::Direct(s) => output.extend_from_slice(s),
            // Any raw line ending inside a literal string normalizes to `\n`.
            InnerLiteralString::Eol(_) => output.push(b'\n'),
            InnerLiteralString::Escape(e) => output.extend(e),
            InnerLiteralString::Nested(n) => output.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_string), InnerLiteralString::Direct),
                map(escape_sequence, InnerLiteralString::Escape),
                map(eol, InnerLiteralString::Eol),
                map(nested_literal_string(depth), InnerLiteralString::Nested),
            )),
            Vec::new,
            |mut out: Vec<u8>, value| {
                value.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        if depth == 0 {
            Err(nom::Err::Failure(NomError::from_error_kind(input, ErrorKind::TooLarge)))
        } else {
            map(delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])), |mut content| {
                content.insert(0, b'(');
                content.push(b')');
                content
            })
            .parse(input)
        }
    }
}

fn literal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    delimited(tag(&b"("[..]), inner_literal_string(MAX_BRACKET), tag(&b")"[..])).parse(input)
}

#[inline]
fn hex_digit(input: ParserInput) -> NomResult<u8> {
    map_opt(take(1usize), |c: ParserInput| str::from_utf8(&c).ok().and_then(|c| u8::from_str_radix(c, 16).ok()))
        .parse(input)
}

fn hexadecimal_string(input: ParserInput) -> NomResult<Object> {
    map(
        delimited(
            tag(&b"<"[..]),
            terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, bool) { (Vec::new(), false) },
                    |state, c| match state {
                        (mut out, false) => {
                            out.push(c << 4);
                            (out, true)
                        }
                        (mut out, true) => {
                            *out.last_mut().unwrap() |= c;
                            (out, false)
                        }
                    },
                ),
                white_space,
            ),
            tag(&b">"[..]),
        ),
        |(bytes, _)| Object::String(bytes, StringFormat::Hexadecimal),
    )
    .parse(input)
}

fn boolean(input: ParserInput) -> NomResult<Object> {
    alt((
        map(tag(&b"true"[..]), |_| Object::Boolean(true)),
        map(tag(&b"false"[..]), |_| Object::Boolean(false)),
    ))
    .parse(input)
}

fn null(input: ParserInput) -> NomResult<Object> {
    map(tag(&b"null"[..]), |_| Object::Null).parse(input)
}

fn array(input: ParserInput) -> NomResult<Vec<Object>> {
    delimited(pair(tag(&b"["[..]), space), many0(direct_object_with_space), tag(&b"]"[..])).parse(input)
}

pub(crate) fn dictionary(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"<<"[..]), space), inner_dictionary, tag(&b">>"[..])).parse(input)
}

fn inner_dictionary(input: ParserInput) -> NomResult<Dictionary> {
    fold_many0(
        pair(terminated(name, space), direct_object_with_space),
        Dictionary::new,
        |mut dict, (key, value)| {
            dict.set(key, value);
            dict
        },
    )
    .parse(input)
}

fn unsigned_int<I: FromStr>(input: ParserInput) -> NomResult<I> {
    map_res(digit1, |digits: ParserInput| I::from_str(str::from_utf8(&digits).unwrap())).parse(input)
}

fn object_id(input: ParserInput) -> NomResult<ObjectId> {
    pair(terminated(unsigned_int, space), terminated(unsigned_int, space)).parse(input)
}

fn reference(input: ParserInput) -> NomResult<Object> {
    map(terminated(object_id, tag(&b"R"[..])), Object::Reference).parse(input)
}

/// All the value kinds that can appear without a preceding `n g obj`
/// header; `reference` is tried before `real`/`integer` so that `5 0 R`
/// collapses to a `Reference` instead of two adjacent numbers (§4.1).
fn direct_objects(input: ParserInput) -> NomResult<Object> {
    alt((
        null,
        boolean,
        reference,
        map(real, Object::Real),
        map(integer, Object::Integer),
        map(name, Object::Name),
        map(literal_string, Object::string_literal),
        hexadecimal_string,
        map(array, Object::Array),
        map(dictionary, Object::Dictionary),
    ))
    .parse(input)
}

fn direct_object_with_space(input: ParserInput) -> NomResult<Object> {
    terminated(direct_objects, space).parse(input)
}

pub fn direct_object(input: ParserInput) -> Option<Object> {
    strip_nom(direct_object_with_space.parse(input))
}

fn object<'a, R: LengthResolver>(
    input: ParserInput<'a>, resolver: &R, already_seen: &mut HashSet<ObjectId>,
) -> NomResult<'a, Object> {
    terminated(alt((|i| stream(i, resolver, already_seen), direct_objects)), space).parse(input)
}

/// Only succeeds for an actual `dict stream ... endstream` production;
/// a bare dictionary is left for `direct_objects` to pick up via `alt`.
fn stream<'a, R: LengthResolver>(
    input: ParserInput<'a>, resolver: &R, already_seen: &mut HashSet<ObjectId>,
) -> NomResult<'a, Object> {
    let (i, dict) = pair(
        terminated(dictionary, (space, tag(&b"stream"[..]))),
        preceded(nom::character::complete::space0, eol),
    )
    .map(|(dict, _)| dict)
    .parse(input)?;

    let length = match dict.get(b"Length") {
        Ok(value) => {
            if let Ok(id) = value.as_reference() {
                resolver.resolve_length(id, already_seen)
            } else {
                value.as_i64().ok()
            }
        }
        Err(_) => None,
    };

    if let Some(length) = length {
        if length < 0 {
            return Err(nom::Err::Failure(NomError::from_error_kind(i, ErrorKind::LengthValue)));
        }
        match terminated(take(length as usize), pair(opt(eol), tag(&b"endstream"[..]))).parse(i) {
            Ok((i, data)) => Ok((i, Object::Stream(Stream::new(dict, data.to_vec())))),
            Err(_) => {
                // Length was present but wrong; fall back to scanning for
                // the literal `endstream` terminator (§9 Open Question 1 —
                // non-`Strict` callers trust the terminator).
                scan_to_endstream(i, dict)
            }
        }
    } else {
        scan_to_endstream(i, dict)
    }
}

fn scan_to_endstream<'a>(input: ParserInput<'a>, dict: Dictionary) -> NomResult<'a, Object> {
    let bytes = input.as_bytes();
    let marker = b"endstream";
    let pos = bytes
        .windows(marker.len())
        .position(|w| w == marker)
        .ok_or_else(|| nom::Err::Failure(NomError::from_error_kind(input, ErrorKind::Eof)))?;
    let mut data_end = pos;
    if data_end >= 2 && &bytes[data_end - 2..data_end] == b"\r\n" {
        data_end -= 2;
    } else if data_end >= 1 && (bytes[data_end - 1] == b'\n' || bytes[data_end - 1] == b'\r') {
        data_end -= 1;
    }
    let data = bytes[..data_end].to_vec();
    let rest = input.take_from(pos + marker.len());
    Ok((rest, Object::Stream(Stream::new(dict, data))))
}

pub fn indirect_object<R: LengthResolver>(
    input: ParserInput, offset: usize, expected_id: Option<ObjectId>, resolver: &R,
    already_seen: &mut HashSet<ObjectId>,
) -> Result<(ObjectId, Object)> {
    let (id, mut object) = indirect_object_inner(input.take_from(offset), offset, expected_id, resolver, already_seen)?;
    offset_stream(&mut object, offset);
    Ok((id, object))
}

fn indirect_object_inner<'a, R: LengthResolver>(
    input: ParserInput<'a>, offset: usize, expected_id: Option<ObjectId>, resolver: &R,
    already_seen: &mut HashSet<ObjectId>,
) -> Result<(ObjectId, Object)> {
    let (i, (_, object_id)) = terminated((space, object_id), pair(tag(&b"obj"[..]), space))
        .parse(input)
        .map_err(|_| Error::IndirectObject { offset })?;
    if let Some(expected_id) = expected_id {
        if object_id != expected_id {
            return Err(Error::ObjectIdMismatch);
        }
    }

    let object_offset = input.len() - i.len();
    let (_, mut object) = terminated(|i: ParserInput<'a>| object(i, resolver, already_seen), (space, opt(tag(&b"endobj"[..])), space))
        .parse(i)
        .map_err(|_| Error::IndirectObject { offset })?;

    offset_stream(&mut object, object_offset);
    Ok((object_id, object))
}

pub fn header(input: ParserInput) -> Option<String> {
    strip_nom(
        map_res(
            delimited(tag(&b"%PDF-"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), pair(eol, many0_count(comment))),
            |v: ParserInput| str::from_utf8(&v).map(Into::into),
        )
        .parse(input),
    )
}

pub fn binary_mark(input: ParserInput) -> Option<Vec<u8>> {
    strip_nom(
        map_res(
            delimited(tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), pair(eol, many0_count(comment))),
            |v: ParserInput| Ok::<Vec<u8>, ()>(v.to_vec()),
        )
        .parse(input),
    )
}

fn xref_table(input: ParserInput) -> NomResult<Xref> {
    let xref_eol = map(alt((tag(&b" \r"[..]), tag(&b" \n"[..]), tag(&b"\r\n"[..]))), |_| ());
    let xref_entry = pair(
        separated_pair(unsigned_int, tag(&b" "[..]), unsigned_int::<u32>),
        delimited(tag(&b" "[..]), map(one_of("nf"), |k| k == 'n'), xref_eol),
    );

    let xref_section = pair(
        separated_pair(unsigned_int::<usize>, tag(&b" "[..]), unsigned_int::<u32>),
        preceded(pair(opt(tag(&b" "[..])), eol), many0(xref_entry)),
    );

    delimited(
        pair(tag(&b"xref"[..]), eol),
        fold_many1(
            xref_section,
            || -> Xref { Xref::new(0, XrefType::CrossReferenceTable) },
            |mut xref, ((start, _count), entries)| {
                for (index, ((offset, generation), is_normal)) in entries.into_iter().enumerate() {
                    let id = (start + index) as u32;
                    if is_normal {
                        if let Ok(generation) = generation.try_into() {
                            xref.insert(id, XrefEntry::Normal { offset, generation });
                        }
                    } else if id == 0 {
                        xref.insert(id, XrefEntry::UnusableFree);
                    } else {
                        xref.insert(id, XrefEntry::Free { next_free: offset, generation: generation as u16 });
                    }
                }
                xref
            },
        ),
        space,
    )
    .parse(input)
}

fn trailer(input: ParserInput) -> NomResult<Dictionary> {
    delimited(pair(tag(&b"trailer"[..]), space), dictionary, space).parse(input)
}

/// Decodes a `/XRef` stream object into `(Xref, trailer dict)`; the stream
/// dictionary itself plays the trailer's role (§4.2).
pub fn decode_xref_stream(mut stream: Stream) -> Result<(Xref, Dictionary)> {
    if stream.dict.get(b"Filter").is_ok() {
        let decoded = stream.decompressed_content()?;
        stream.set_plain_content(decoded);
    }
    let widths = xref::parse_widths(&stream.dict)?;
    let size = stream.dict.get(b"Size").and_then(Object::as_i64)? as u32;
    let index = xref::parse_index(&stream.dict, size);
    let mut xrefs = Xref::decode_stream_rows(&stream.content, widths, &index)?;
    xrefs.size = size;
    Ok((xrefs, stream.dict))
}

pub fn xref_and_trailer<R: LengthResolver>(input: ParserInput, resolver: &R) -> Result<(Xref, Dictionary)> {
    if let Ok((_, (mut xref, trailer))) = pair(xref_table, trailer).parse(input) {
        let size = trailer.get(b"Size").and_then(Object::as_i64).map_err(|_| Error::Parse(ParseError::InvalidTrailer))? as u32;
        xref.size = size;
        return Ok((xref, trailer));
    }

    let (_, obj) = indirect_object_inner(input, 0, None, resolver, &mut HashSet::new()).map_err(|_| Error::Parse(ParseError::InvalidTrailer))?;
    match obj {
        Object::Stream(stream) => decode_xref_stream(stream),
        _ => Err(Error::Parse(ParseError::InvalidXref)),
    }
}

/// Parses a standalone `trailer << ... >>` section; used by the sequential
/// scanner's recovery path, which has no xref to anchor a normal
/// [`xref_and_trailer`] call.
pub fn trailer_dict(input: ParserInput) -> Option<Dictionary> {
    strip_nom(trailer(input))
}

pub fn xref_start(input: ParserInput) -> Option<i64> {
    strip_nom(
        delimited(pair(tag(&b"startxref"[..]), eol), trim_spaces(integer), (eol, tag(&b"%%EOF"[..]), space)).parse(input),
    )
}

fn trim_spaces<'a, O>(
    p: impl Parser<ParserInput<'a>, Output = O, Error = nom::error::Error<LocatedSpan<&'a [u8], &'a str>>>,
) -> impl Parser<ParserInput<'a>, Output = O, Error = nom::error::Error<LocatedSpan<&'a [u8], &'a str>>> {
    delimited(many0(tag(" ")), p, many0(tag(" ")))
}

/// Parses the `N` `(num, relative-offset)` pairs at the head of a
/// decompressed `/ObjStm` body.
pub fn object_stream_header(input: ParserInput, n: usize) -> Option<Vec<(u32, usize)>> {
    let pair_parser = pair(terminated(unsigned_int::<u32>, space), terminated(unsigned_int::<usize>, space));
    strip_nom(nom::multi::count(pair_parser, n).parse(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_span(s: &'_ [u8]) -> ParserInput<'_> {
        LocatedSpan::new_extra(s, "test")
    }

    fn tstrip<O>(r: NomResult<O>) -> Option<O> {
        r.ok().and_then(|(i, o)| if !i.is_empty() { None } else { Some(o) })
    }

    #[test]
    fn literal_string_escapes() {
        let cases: Vec<(&[u8], &[u8])> = vec![
            (b"(hell\\\no)", b"hello"),
            (b"(h\\145llo)", b"hello"),
            (b"(a\r\nb)", b"a\nb"),
        ];
        for (input, expected) in cases {
            assert_eq!(tstrip(literal_string(test_span(input))), Some(expected.to_vec()));
        }
    }

    #[test]
    fn hex_string_odd_nibble() {
        match tstrip(hexadecimal_string(test_span(b"<68656C7>"))) {
            Some(Object::String(s, _)) => assert_eq!(s, b"help".to_vec()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn name_hex_escape() {
        let result = tstrip(name(test_span(b"/F#23#20minor")));
        assert_eq!(result, Some(b"F# minor".to_vec()));
    }

    #[test]
    fn real_numbers() {
        let real = |i| tstrip(real(i));
        assert_eq!(real(test_span(b"0.12")), Some(0.12));
        assert_eq!(real(test_span(b"-.12")), Some(-0.12));
        assert_eq!(real(test_span(b"10.")), Some(10.0));
    }

    #[test]
    fn reference_disambiguation_in_array() {
        let result = tstrip(array(test_span(b"[1 2 5 0 R]")));
        assert_eq!(
            result,
            Some(vec![Object::Integer(1), Object::Integer(2), Object::Reference((5, 0))])
        );
    }

    #[test]
    fn classical_xref_table() {
        let input = b"xref\n0 3\n0000000000 65535 f \n0000000017 00000 n \n0000000081 00000 n \ntrailer\n<</Size 3/Root 1 0 R>>\n";
        let (xref, trailer) = xref_and_trailer(test_span(input), &()).unwrap();
        assert_eq!(xref.get(1), Some(&XrefEntry::Normal { offset: 17, generation: 0 }));
        assert!(trailer.get(b"Root").is_ok());
    }
}
