//! PDFDocEncoding, the `TextString` BOM convention, and PDF date strings.
//!
//! Grounded on the teacher's `reader/metadata.rs::extract_string_field`,
//! which already special-cases the `FE FF` UTF-16BE prefix; this module
//! generalizes that to the full §3 `TextString` contract and adds the
//! PDFDocEncoding fallback table (ISO 32000-1 Annex D) the teacher's
//! retrieved subset did not carry.
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

/// PDFDocEncoding maps 1:1 onto Unicode for 0x20..=0x7E (printable ASCII)
/// and for the common Latin-1 block 0xA0..=0xFF excluding the handful of
/// punctuation marks Annex D relocates into 0x18..=0x1F and 0x80..=0x9F.
/// Bytes with no PDFDocEncoding assignment fall back to the Unicode
/// replacement character.
fn pdf_doc_encoding_char(byte: u8) -> char {
    match byte {
        0x18 => '\u{02D8}', // breve
        0x19 => '\u{02C7}', // caron
        0x1A => '\u{02C6}', // modifier circumflex accent
        0x1B => '\u{02D9}', // dot above
        0x1C => '\u{02DD}', // double acute accent
        0x1D => '\u{02DB}', // ogonek
        0x1E => '\u{02DA}', // ring above
        0x1F => '\u{02DC}', // small tilde
        0x20..=0x7E => byte as char,
        0x7F => '\u{FFFD}',
        0x80 => '\u{2022}', // bullet
        0x81 => '\u{2020}', // dagger
        0x82 => '\u{2021}', // double dagger
        0x83 => '\u{2026}', // ellipsis
        0x84 => '\u{2014}', // em dash
        0x85 => '\u{2013}', // en dash
        0x86 => '\u{0192}', // florin
        0x87 => '\u{2044}', // fraction slash
        0x88 => '\u{2039}',
        0x89 => '\u{203A}',
        0x8A => '\u{2212}', // minus
        0x8B => '\u{2030}', // per mille
        0x8C => '\u{201E}', // double low quote
        0x8D => '\u{201C}',
        0x8E => '\u{201D}',
        0x8F => '\u{2018}',
        0x90 => '\u{2019}',
        0x91 => '\u{201A}',
        0x92 => '\u{2122}', // trademark
        0x93 => '\u{FB01}', // fi ligature
        0x94 => '\u{FB02}', // fl ligature
        0x95 => '\u{0141}',
        0x96 => '\u{0152}',
        0x97 => '\u{0160}',
        0x98 => '\u{0178}',
        0x99 => '\u{017D}',
        0x9A => '\u{0131}',
        0x9B => '\u{0142}',
        0x9C => '\u{0153}',
        0x9D => '\u{0161}',
        0x9E => '\u{017E}',
        0x9F => '\u{FFFD}',
        0xA0 => '\u{20AC}', // Euro
        0xA1..=0xFF => byte as char,
        _ => '\u{FFFD}',
    }
}

pub fn decode_pdf_doc_encoding(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| pdf_doc_encoding_char(b)).collect()
}

pub fn encode_pdf_doc_encoding(s: &str) -> Vec<u8> {
    // Best-effort: only the ASCII-range round-trips losslessly; everything
    // else is encoded as UTF-16BE by the caller instead (see `encode_text_string`).
    s.chars().map(|c| if (c as u32) < 256 { c as u8 } else { b'?' }).collect()
}

/// Decodes a `TextString` per §3: UTF-16BE if prefixed `FE FF`, UTF-8 if
/// prefixed `EF BB BF`, PDFDocEncoding otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let (text, _had_errors) = encoding_rs::UTF_16BE.decode_without_bom_handling(&bytes[2..]);
        text.into_owned()
    } else if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        String::from_utf8_lossy(&bytes[3..]).into_owned()
    } else {
        decode_pdf_doc_encoding(bytes)
    }
}

/// Encodes a Rust string as a `TextString`: PDFDocEncoding when every
/// character round-trips through it, UTF-16BE with a BOM otherwise.
pub fn encode_text_string(s: &str) -> Vec<u8> {
    if s.chars().all(|c| (c as u32) < 256) {
        encode_pdf_doc_encoding(s)
    } else {
        let mut out = vec![0xFE, 0xFF];
        for unit in s.encode_utf16() {
            out.extend_from_slice(&unit.to_be_bytes());
        }
        out
    }
}

/// Parses `D:YYYYMMDDHHmmSSOHH'mm` (every field after the year is
/// optional; the timezone designator `O` is `+`, `-`, or `Z`; trailing
/// apostrophes are tolerated).
pub fn parse_pdf_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    let field = |range: std::ops::Range<usize>, default: u32| -> u32 {
        digits.get(range).and_then(|s| s.parse().ok()).unwrap_or(default)
    };
    let year: i32 = digits[0..4].parse().ok()?;
    let month = field(4..6, 1).max(1);
    let day = field(6..8, 1).max(1);
    let hour = field(8..10, 0);
    let minute = field(10..12, 0);
    let second = field(12..14, 0);

    let rest = &s[digits.len()..];
    let offset = parse_tz_offset(rest).unwrap_or(0);

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(hour, minute, second)?;
    FixedOffset::east_opt(offset)?.from_local_datetime(&naive).single()
}

fn parse_tz_offset(rest: &str) -> Option<i32> {
    let mut chars = rest.chars();
    match chars.next() {
        Some('Z') => Some(0),
        Some(sign @ ('+' | '-')) => {
            let tail: String = chars.collect();
            let tail = tail.trim_end_matches('\'');
            let mut parts = tail.splitn(2, '\'');
            let hh: i32 = parts.next()?.parse().ok()?;
            let mm: i32 = parts.next().unwrap_or("0").parse().unwrap_or(0);
            let total = hh * 3600 + mm * 60;
            Some(if sign == '-' { -total } else { total })
        }
        _ => None,
    }
}

pub fn format_pdf_date(dt: &DateTime<FixedOffset>) -> String {
    let offset = dt.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let hh = offset.abs() / 3600;
    let mm = (offset.abs() % 3600) / 60;
    format!(
        "D:{}{sign}{hh:02}'{mm:02}'",
        dt.format("%Y%m%d%H%M%S"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_ascii_as_pdfdoc() {
        assert_eq!(decode_text_string(b"Hello"), "Hello");
    }

    #[test]
    fn decodes_utf16_bom() {
        let bytes = [0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42];
        assert_eq!(decode_text_string(&bytes), "AB");
    }

    #[test]
    fn parses_date_with_partial_fields() {
        let dt = parse_pdf_date("D:20230615120000+02'00").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-06-15 12:00:00");
    }

    #[test]
    fn parses_date_with_no_timezone() {
        let dt = parse_pdf_date("D:20200101").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2020-01-01");
    }
}
