//! `ASCII85Decode`. No crate in the dependency stack speaks Adobe's `~>`-
//! terminated, `z`-shorthand variant of base85, so this is hand-rolled the
//! way the teacher hand-rolls PKCS#5 for an equally small, fully-specified
//! encoding.
use crate::error::{Error, Result};

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut group_len = 0usize;

    for byte in data.iter().copied() {
        match byte {
            b'~' => break,
            b'z' if group_len == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[group_len] = byte - b'!';
                group_len += 1;
                if group_len == 5 {
                    push_group(&mut out, &group, 5);
                    group_len = 0;
                }
            }
            _ if byte.is_ascii_whitespace() => {}
            _ => return Err(Error::InvalidStream(format!("invalid ASCII85 byte 0x{byte:02x}"))),
        }
    }

    if group_len > 0 {
        if group_len == 1 {
            return Err(Error::InvalidStream("ASCII85 group cannot end with a single byte".to_string()));
        }
        for slot in group.iter_mut().skip(group_len) {
            *slot = 84; // 'u' - '!'
        }
        push_group(&mut out, &group, group_len - 1);
    }

    Ok(out)
}

fn push_group(out: &mut Vec<u8>, group: &[u8; 5], n: usize) {
    let value = group.iter().fold(0u32, |acc, &d| acc.wrapping_mul(85).wrapping_add(d as u32));
    let bytes = value.to_be_bytes();
    out.extend_from_slice(&bytes[..n]);
}

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(4) {
        if chunk.len() == 4 && chunk == [0, 0, 0, 0] {
            out.push(b'z');
            continue;
        }
        let mut buf = [0u8; 4];
        buf[..chunk.len()].copy_from_slice(chunk);
        let value = u32::from_be_bytes(buf);
        let mut digits = [0u8; 5];
        let mut v = value;
        for d in digits.iter_mut().rev() {
            *d = (v % 85) as u8 + b'!';
            v /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out.extend_from_slice(b"~>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_text() {
        let data = b"Man is distinguished".to_vec();
        let encoded = encode(&data);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn z_shorthand_decodes_to_four_zero_bytes() {
        let decoded = decode(b"z~>").unwrap();
        assert_eq!(decoded, vec![0, 0, 0, 0]);
    }
}
