//! A small, fixed-capacity LRU keyed by object reference (C8). Not carried
//! by any crate in the teacher's dependency table (`lru` would pull in a
//! whole intrusive-list abstraction for ~30 lines); built on `IndexMap`
//! the same way [`crate::dictionary::Dictionary`] is, so recency order is
//! just "most recent insertion wins the back of the map".
use indexmap::IndexMap;

use crate::object::{Object, ObjectId};

pub struct LruCache {
    capacity: usize,
    entries: IndexMap<ObjectId, Object>,
}

impl LruCache {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            capacity: capacity.max(1),
            entries: IndexMap::new(),
        }
    }

    /// Returns the cached value, promoting it to most-recently-used.
    pub fn get(&mut self, id: ObjectId) -> Option<&Object> {
        if !self.entries.contains_key(&id) {
            return None;
        }
        let (k, v) = self.entries.shift_remove_entry(&id).expect("just checked contains_key");
        self.entries.insert(k, v);
        self.entries.get(&id)
    }

    /// Inserts or promotes `id`, evicting the least-recently-used entry if
    /// the cache is over-full.
    pub fn put(&mut self, id: ObjectId, value: Object) {
        self.entries.shift_remove(&id);
        self.entries.insert(id, value);
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn remove(&mut self, id: ObjectId) {
        self.entries.shift_remove(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.put((1, 0), Object::Integer(1));
        cache.put((2, 0), Object::Integer(2));
        cache.put((3, 0), Object::Integer(3));
        assert!(cache.get((1, 0)).is_none());
        assert!(cache.get((2, 0)).is_some());
        assert!(cache.get((3, 0)).is_some());
    }

    #[test]
    fn get_promotes_to_most_recently_used() {
        let mut cache = LruCache::new(2);
        cache.put((1, 0), Object::Integer(1));
        cache.put((2, 0), Object::Integer(2));
        cache.get((1, 0));
        cache.put((3, 0), Object::Integer(3));
        assert!(cache.get((2, 0)).is_none());
        assert!(cache.get((1, 0)).is_some());
    }
}
