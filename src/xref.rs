use std::collections::BTreeMap;

use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result};
use crate::object::{Object, ObjectId};

/// How a section's storage was shaped on disk; decides which form the
/// writer must reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefType {
    CrossReferenceTable,
    CrossReferenceStream,
}

/// One object-number slot in the index (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Head-of-free-list or an interior free slot; `generation` is the one
    /// a future object reusing this slot must carry.
    Free { next_free: u32, generation: u16 },
    /// `(0, 65535)` permanently unusable.
    UnusableFree,
    Normal { offset: u32, generation: u16 },
    Compressed { container: u32, index: u32 },
}

#[derive(Debug, Clone)]
pub struct Xref {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub size: u32,
    pub xref_type: XrefType,
}

impl Xref {
    pub fn new(size: u32, xref_type: XrefType) -> Self {
        Xref {
            entries: BTreeMap::new(),
            size,
            xref_type,
        }
    }

    pub fn insert(&mut self, id: u32, entry: XrefEntry) {
        self.entries.entry(id).or_insert(entry);
    }

    pub fn get(&self, id: u32) -> Option<&XrefEntry> {
        self.entries.get(&id)
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().copied().max().unwrap_or(0)
    }

    /// First-definition-wins: entries already present (from an earlier,
    /// more-recent section) are not overwritten by `other` (an older,
    /// `/Prev`-chained section), per §4.2.
    pub fn merge(&mut self, other: Xref) {
        for (id, entry) in other.entries {
            self.entries.entry(id).or_insert(entry);
        }
        if other.size > self.size {
            self.size = other.size;
        }
    }

    /// Renders the classical `xref` table form (version < 1.5).
    pub fn write_table(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"xref\n");
        let mut ids: Vec<u32> = self.entries.keys().copied().collect();
        if !ids.contains(&0) {
            ids.push(0);
        }
        ids.sort_unstable();

        // Group into contiguous subsections so that the free-list head
        // (0, often absent from `entries`) is still emitted.
        let mut subsections: Vec<(u32, Vec<u32>)> = Vec::new();
        for id in ids {
            match subsections.last_mut() {
                Some((start, members)) if *start + members.len() as u32 == id => members.push(id),
                _ => subsections.push((id, vec![id])),
            }
        }

        for (start, members) in subsections {
            out.extend_from_slice(format!("{} {}\n", start, members.len()).as_bytes());
            for id in members {
                let line = match self.entries.get(&id) {
                    Some(XrefEntry::Normal { offset, generation }) => {
                        format!("{:010} {:05} n \n", offset, generation)
                    }
                    Some(XrefEntry::Free { next_free, generation }) => {
                        format!("{:010} {:05} f \n", next_free, generation)
                    }
                    Some(XrefEntry::Compressed { .. }) => {
                        // Unreachable: caller rejects classical tables with
                        // compressed entries before calling this.
                        "0000000000 00000 f \n".to_string()
                    }
                    None if id == 0 => "0000000000 65535 f \n".to_string(),
                    None => "0000000000 00000 f \n".to_string(),
                };
                out.extend_from_slice(line.as_bytes());
            }
        }
        out
    }

    /// Computes the minimum byte width needed for xref-stream fields 2 and
    /// 3 across all entries (field widths are always `(1, w2, w3)` since we
    /// always write an explicit type byte).
    fn stream_widths(&self) -> (usize, usize) {
        let mut w2 = 1usize;
        let mut w3 = 1usize;
        for entry in self.entries.values() {
            let (f2, f3) = match *entry {
                XrefEntry::Normal { offset, generation } => (offset as u64, generation as u64),
                XrefEntry::Free { next_free, generation } => (next_free as u64, generation as u64),
                XrefEntry::Compressed { container, index } => (container as u64, index as u64),
                XrefEntry::UnusableFree => (0, 65535),
            };
            w2 = w2.max(bytes_needed(f2));
            w3 = w3.max(bytes_needed(f3));
        }
        (w2, w3)
    }

    /// Encodes the `/XRef` stream body (pre-Flate/predictor). `W` is
    /// `[1, w2, w3]`.
    pub fn encode_stream_rows(&self) -> (Vec<u8>, [usize; 3]) {
        let (w2, w3) = self.stream_widths();
        let widths = [1, w2, w3];
        let mut ids: Vec<u32> = self.entries.keys().copied().collect();
        ids.sort_unstable();

        let mut out = Vec::with_capacity(ids.len() * (1 + w2 + w3));
        for id in &ids {
            let entry = &self.entries[id];
            let (ty, f2, f3) = match *entry {
                XrefEntry::Normal { offset, generation } => (1u8, offset as u64, generation as u64),
                XrefEntry::Compressed { container, index } => (2u8, container as u64, index as u64),
                XrefEntry::Free { next_free, generation } => (0u8, next_free as u64, generation as u64),
                XrefEntry::UnusableFree => (0u8, 0, 65535),
            };
            out.push(ty);
            push_be(&mut out, f2, w2);
            push_be(&mut out, f3, w3);
        }
        (out, widths)
    }

    /// Inverse of [`Xref::encode_stream_rows`], given `W` and the
    /// `(first, count)` subsection pairs from `/Index`.
    pub fn decode_stream_rows(data: &[u8], widths: [usize; 3], index: &[(u32, u32)]) -> Result<Self> {
        let row_width: usize = widths.iter().sum();
        if row_width == 0 {
            return Err(Error::Parse(ParseError::InvalidXref));
        }
        let mut xref = Xref::new(0, XrefType::CrossReferenceStream);
        let mut offset = 0usize;
        for &(first, count) in index {
            for i in 0..count {
                if offset + row_width > data.len() {
                    return Err(Error::Parse(ParseError::InvalidXref));
                }
                let row = &data[offset..offset + row_width];
                offset += row_width;
                let mut pos = 0;
                let ty = if widths[0] == 0 {
                    1u64
                } else {
                    let v = read_be(&row[pos..pos + widths[0]]);
                    pos += widths[0];
                    v
                };
                let f2 = read_be(&row[pos..pos + widths[1]]);
                pos += widths[1];
                let f3 = read_be(&row[pos..pos + widths[2]]);

                let id = first + i;
                let entry = match ty {
                    0 => XrefEntry::Free {
                        next_free: f2 as u32,
                        generation: f3 as u16,
                    },
                    1 => XrefEntry::Normal {
                        offset: f2 as u32,
                        generation: f3 as u16,
                    },
                    2 => XrefEntry::Compressed {
                        container: f2 as u32,
                        index: f3 as u32,
                    },
                    _ => return Err(Error::Parse(ParseError::InvalidXref)),
                };
                xref.insert(id, entry);
            }
        }
        Ok(xref)
    }
}

fn bytes_needed(value: u64) -> usize {
    let mut n = 1;
    while (1u64 << (8 * n)) <= value && n < 8 {
        n += 1;
    }
    n
}

fn push_be(out: &mut Vec<u8>, value: u64, width: usize) {
    for i in (0..width).rev() {
        out.push(((value >> (8 * i)) & 0xFF) as u8);
    }
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Parses `/Index`, defaulting to `[(0, Size)]` when absent.
pub fn parse_index(dict: &Dictionary, size: u32) -> Vec<(u32, u32)> {
    match dict.get(b"Index").and_then(Object::as_array) {
        Ok(arr) => arr
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_i64().ok()? as u32, pair[1].as_i64().ok()? as u32)))
            .collect(),
        Err(_) => vec![(0, size)],
    }
}

/// Parses `/W`.
pub fn parse_widths(dict: &Dictionary) -> Result<[usize; 3]> {
    let arr = dict.get(b"W").and_then(Object::as_array)?;
    if arr.len() != 3 {
        return Err(Error::Parse(ParseError::InvalidXref));
    }
    Ok([
        arr[0].as_i64()? as usize,
        arr[1].as_i64()? as usize,
        arr[2].as_i64()? as usize,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_round_trip() {
        let mut xref = Xref::new(3, XrefType::CrossReferenceStream);
        xref.insert(0, XrefEntry::Free { next_free: 0, generation: 65535 });
        xref.insert(1, XrefEntry::Normal { offset: 17, generation: 0 });
        xref.insert(2, XrefEntry::Compressed { container: 5, index: 1 });

        let (data, widths) = xref.encode_stream_rows();
        let decoded = Xref::decode_stream_rows(&data, widths, &[(0, 3)]).unwrap();
        assert_eq!(decoded.get(1), Some(&XrefEntry::Normal { offset: 17, generation: 0 }));
        assert_eq!(
            decoded.get(2),
            Some(&XrefEntry::Compressed { container: 5, index: 1 })
        );
    }

    #[test]
    fn merge_keeps_first_definition() {
        let mut newer = Xref::new(2, XrefType::CrossReferenceTable);
        newer.insert(1, XrefEntry::Normal { offset: 100, generation: 0 });
        let mut older = Xref::new(2, XrefType::CrossReferenceTable);
        older.insert(1, XrefEntry::Normal { offset: 9, generation: 0 });
        older.insert(2, XrefEntry::Normal { offset: 50, generation: 0 });

        newer.merge(older);
        assert_eq!(newer.get(1), Some(&XrefEntry::Normal { offset: 100, generation: 0 }));
        assert_eq!(newer.get(2), Some(&XrefEntry::Normal { offset: 50, generation: 0 }));
    }
}
