//! `LZWDecode`: variable 9-12 bit LZW, via the `weezl` crate (the same
//! bit-packing engine the GIF/TIFF codecs in the image ecosystem use —
//! PDF's `/EarlyChange` flag is exactly TIFF's early-change toggle).
use weezl::BitOrder;
use weezl::decode::Decoder;
use weezl::encode::Encoder;

use crate::error::{Error, Result};

/// PDF packs raw byte symbols (0..=255) plus Clear(256)/EOD(257); the
/// "literal width" weezl expects is therefore 8 regardless of the stream's
/// eventual 9..12 bit code width.
const LITERAL_WIDTH: u8 = 8;

pub fn decode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut decoder = if early_change {
        Decoder::new(BitOrder::Msb, LITERAL_WIDTH)
    } else {
        Decoder::with_tiff_size_switch(BitOrder::Msb, LITERAL_WIDTH)
    };
    let mut output = Vec::new();
    let result = decoder.into_vec(&mut output).decode_all(data);
    result.status.map_err(|e| Error::InvalidStream(format!("LZW decode error: {e:?}")))?;
    Ok(output)
}

pub fn encode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut encoder = if early_change {
        Encoder::new(BitOrder::Msb, LITERAL_WIDTH)
    } else {
        Encoder::with_tiff_size_switch(BitOrder::Msb, LITERAL_WIDTH)
    };
    let mut output = Vec::new();
    let result = encoder.into_vec(&mut output).encode_all(data);
    result.status.map_err(|e| Error::InvalidStream(format!("LZW encode error: {e:?}")))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_early_change() {
        let data = b"aaaaaaaaaabbbbbbbbbbccccccccccaaaaaaaaaa".to_vec();
        let encoded = encode(&data, true).unwrap();
        let decoded = decode(&encoded, true).unwrap();
        assert_eq!(decoded, data);
    }
}
