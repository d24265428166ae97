//! Filter pipeline (C3). Dispatches on a stream's `/Filter`/`DecodeParms`
//! to the per-codec modules; chains are applied outer-to-inner in the order
//! `/Filter` lists them, matching how §4.3 describes encode/decode wrapping.
pub mod ascii85;
pub mod asciihex;
mod crypt;
pub mod flate;
pub mod lzw;
mod passthrough;
pub(crate) mod predictor;
mod runlength;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::object::Object;
use predictor::PredictorParams;

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => vec![n.clone()],
        Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_name().ok().map(|n| n.to_vec())).collect(),
        _ => Vec::new(),
    }
}

fn decode_parms(dict: &Dictionary, n: usize) -> Vec<Option<Dictionary>> {
    let explicit: Vec<Option<Dictionary>> = match dict.get(b"DecodeParms") {
        Ok(Object::Dictionary(d)) => vec![Some(d.clone())],
        Ok(Object::Array(arr)) => arr.iter().map(|o| o.as_dict().ok().cloned()).collect(),
        _ => Vec::new(),
    };
    explicit.into_iter().chain(std::iter::repeat(None)).take(n).collect()
}

/// Runs every filter named by `/Filter` over `content`, in order. A stream
/// with no `/Filter` entry is returned unchanged.
pub fn decode(dict: &Dictionary, content: &[u8]) -> Result<Vec<u8>> {
    let names = filter_names(dict);
    let parms = decode_parms(dict, names.len());
    let mut data = content.to_vec();
    for (name, parm) in names.iter().zip(parms.iter()) {
        data = decode_one(name, parm.as_ref(), data)?;
    }
    Ok(data)
}

fn decode_one(name: &[u8], parm: Option<&Dictionary>, data: Vec<u8>) -> Result<Vec<u8>> {
    match name {
        b"FlateDecode" | b"Fl" => {
            let raw = flate::decode(&data)?;
            predictor::decode(&raw, &PredictorParams::from_dict(parm))
        }
        b"LZWDecode" | b"LZW" => {
            let early_change = early_change(parm);
            let raw = lzw::decode(&data, early_change)?;
            predictor::decode(&raw, &PredictorParams::from_dict(parm))
        }
        b"ASCII85Decode" | b"A85" => ascii85::decode(&data),
        b"ASCIIHexDecode" | b"AHx" => asciihex::decode(&data),
        b"RunLengthDecode" | b"RL" => runlength::decode(&data),
        b"CCITTFaxDecode" | b"CCF" | b"DCTDecode" | b"DCT" | b"JBIG2Decode" | b"JPXDecode" => passthrough::decode(&data),
        b"Crypt" => crypt::decode(&data),
        other => Err(Error::Invalid(format!("unknown filter /{}", String::from_utf8_lossy(other)))),
    }
}

fn early_change(parm: Option<&Dictionary>) -> bool {
    parm.and_then(|p| p.get(b"EarlyChange").ok()).and_then(Object::as_i64).unwrap_or(1) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_no_filter() {
        let dict = Dictionary::new();
        assert_eq!(decode(&dict, b"raw bytes").unwrap(), b"raw bytes");
    }

    #[test]
    fn dispatches_flate() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        let encoded = flate::encode(b"hello, world").unwrap();
        assert_eq!(decode(&dict, &encoded).unwrap(), b"hello, world");
    }

    #[test]
    fn chains_ascii85_then_flate() {
        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            Object::Array(vec![Object::Name(b"ASCII85Decode".to_vec()), Object::Name(b"FlateDecode".to_vec())]),
        );
        let inner = flate::encode(b"chained payload").unwrap();
        let outer = ascii85::encode(&inner);
        assert_eq!(decode(&dict, &outer).unwrap(), b"chained payload");
    }
}
