use indexmap::IndexMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::object::Object;

/// Insertion-ordered `Name -> Value` mapping. Keys are unique and looked up
/// case-sensitively; a `null` value is semantically absent (`get` returns
/// `Err` for it exactly as it would for a missing key), per §3.
#[derive(Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        match self.0.get(key) {
            Some(Object::Null) | None => Err(Error::DictKey(key.to_vec())),
            Some(obj) => Ok(obj),
        }
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        match self.0.get_mut(key) {
            Some(obj) if !obj.is_null() => Ok(obj),
            _ => Err(Error::DictKey(key.to_vec())),
        }
    }

    pub fn has(&self, key: &[u8]) -> bool {
        matches!(self.0.get(key), Some(obj) if !obj.is_null())
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.iter().filter(|(_, v)| !v.is_null()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Object)> {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.as_slice(), v))
    }

    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    pub fn has_type(&self, type_name: &[u8]) -> bool {
        matches!(self.get_type(), Ok(t) if t == type_name)
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (String::from_utf8_lossy(k), v)))
            .finish()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a [u8], &'a Object);
    type IntoIter = Box<dyn Iterator<Item = (&'a [u8], &'a Object)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<(Vec<u8>, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Vec<u8>, Object)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.set(k, v);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_value_is_absent() {
        let mut dict = Dictionary::new();
        dict.set("X", Object::Null);
        assert!(dict.get(b"X").is_err());
        assert!(!dict.has(b"X"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Page".to_vec()));
        assert!(dict.get(b"type").is_err());
        assert!(dict.get(b"Type").is_ok());
    }

    #[test]
    fn preserves_insertion_order() {
        let mut dict = Dictionary::new();
        dict.set("B", Object::Integer(2));
        dict.set("A", Object::Integer(1));
        let keys: Vec<_> = dict.iter().map(|(k, _)| k.to_vec()).collect();
        assert_eq!(keys, vec![b"B".to_vec(), b"A".to_vec()]);
    }
}
