//! `RunLengthDecode`: a length byte `0..=127` means "copy the next `n+1`
//! literal bytes", `129..=255` means "repeat the following byte `257-n`
//! times", and `128` is the end-of-data marker (§4.3).
use crate::error::{Error, Result};

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let n = length as usize + 1;
                let end = i + n;
                if end > data.len() {
                    return Err(Error::InvalidStream("RunLengthDecode literal run exceeds input".to_string()));
                }
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            129..=255 => {
                let byte = *data.get(i).ok_or_else(|| Error::InvalidStream("RunLengthDecode repeat run missing byte".to_string()))?;
                i += 1;
                let n = 257 - length as usize;
                out.extend(std::iter::repeat_n(byte, n));
            }
        }
    }
    Ok(out)
}

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let run_end = (i..data.len()).take_while(|&j| data[j] == data[i]).count();
        if run_end >= 2 {
            let n = run_end.min(128);
            out.push((257 - n) as u8);
            out.push(data[i]);
            i += n;
        } else {
            let start = i;
            while i < data.len() && i - start < 128 {
                let next_run = (i..data.len()).take_while(|&j| data[j] == data[i]).count();
                if next_run >= 2 {
                    break;
                }
                i += 1;
            }
            out.push((i - start - 1) as u8);
            out.extend_from_slice(&data[start..i]);
        }
    }
    out.push(128);
    out
}
