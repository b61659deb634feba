//! Open-addressed hash table with linear probing, keyed by interned string
//! handles. Used for globals, class method tables, and instance fields.
//!
//! Because every key is produced by [`crate::heap::Heap::intern`], two equal
//! strings always carry the same [`ObjRef`], so probing never needs to
//! inspect string contents: key comparison is `ObjRef` equality, and the
//! bucket index comes from the string's cached hash.

use crate::heap::ObjRef;
use crate::value::Value;

const MAX_LOAD: f64 = 0.75;

#[derive(Clone, Copy)]
struct Entry {
    key: Option<ObjRef>,
    hash: u32,
    value: Value,
    /// A tombstone is a deleted entry: `key == None` but the slot still
    /// counts toward the probe sequence so later lookups don't stop short.
    tombstone: bool,
}

impl Entry {
    fn empty() -> Self {
        Entry { key: None, hash: 0, value: Value::nil(), tombstone: false }
    }
}

/// A table needs the hash of the key it is probing for, which lives on the
/// interned string object rather than on the bare handle, hence callers
/// pass it in alongside the [`ObjRef`].
pub struct Table {
    entries: Vec<Entry>,
    count: usize,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("len", &self.count).finish()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    pub fn new() -> Self {
        Table { entries: Vec::new(), count: 0 }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn find_slot(entries: &[Entry], capacity: usize, key: ObjRef, hash: u32) -> usize {
        let mut index = (hash as usize) & (capacity - 1);
        let mut first_tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            match entry.key {
                Some(k) if k == key => return index,
                None if !entry.tombstone => {
                    return first_tombstone.unwrap_or(index);
                }
                None => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Some(_) => {}
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn grow(&mut self) {
        let new_capacity = if self.entries.is_empty() { 8 } else { self.entries.len() * 2 };
        let mut new_entries = vec![Entry::empty(); new_capacity];
        let mut live = 0;
        for entry in &self.entries {
            if let Some(key) = entry.key {
                let slot = Self::find_slot(&new_entries, new_capacity, key, entry.hash);
                new_entries[slot] = Entry { key: Some(key), hash: entry.hash, value: entry.value, tombstone: false };
                live += 1;
            }
        }
        self.entries = new_entries;
        self.count = live;
    }

    /// Inserts or overwrites `key`. Returns `true` if this created a brand
    /// new entry rather than replacing an existing one.
    ///
    /// `hash` is the caller-computed hash of `key` (interned strings cache
    /// their hash, so callers already have it to hand); growth never needs
    /// to re-derive hashes for existing entries since each one keeps its own.
    pub fn set(&mut self, key: ObjRef, hash: u32, value: Value) -> bool {
        if self.entries.is_empty() || (self.count + 1) as f64 > self.entries.len() as f64 * MAX_LOAD {
            self.grow();
        }
        let capacity = self.entries.len();
        let slot = Self::find_slot(&self.entries, capacity, key, hash);
        let is_new = self.entries[slot].key.is_none();
        if is_new && !self.entries[slot].tombstone {
            self.count += 1;
        }
        self.entries[slot] = Entry { key: Some(key), hash, value, tombstone: false };
        is_new
    }

    pub fn get(&self, key: ObjRef, hash: u32) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        let capacity = self.entries.len();
        let slot = Self::find_slot(&self.entries, capacity, key, hash);
        self.entries[slot].key.map(|_| self.entries[slot].value)
    }

    pub fn delete(&mut self, key: ObjRef, hash: u32) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let capacity = self.entries.len();
        let slot = Self::find_slot(&self.entries, capacity, key, hash);
        if self.entries[slot].key.is_none() {
            return false;
        }
        self.entries[slot] = Entry { key: None, hash: 0, value: Value::bool(true), tombstone: true };
        true
    }

    pub fn copy_from(&mut self, other: &Table) {
        for (key, hash, value) in other.iter_with_hash() {
            self.set(key, hash, value);
        }
    }

    /// Snapshot of every live entry, used by the collector: copying out
    /// `(ObjRef, Value)` pairs (both `Copy`) sidesteps holding a borrow of
    /// this table while the caller mutates the heap to mark them.
    pub fn snapshot(&self) -> Vec<(ObjRef, Value)> {
        self.entries.iter().filter_map(|e| e.key.map(|k| (k, e.value))).collect()
    }

    fn iter_with_hash(&self) -> impl Iterator<Item = (ObjRef, u32, Value)> + '_ {
        self.entries.iter().filter_map(|e| e.key.map(|k| (k, e.hash, e.value)))
    }

    /// Drops every entry whose key is not in `keep`. Used after the mark
    /// phase to collect globals/fields whose owning string died — in
    /// practice this never fires for a table of *live* objects, but method
    /// and field tables can still reference a key string that nothing else
    /// roots once its class is unreachable.
    pub fn retain_marked(&mut self, is_marked: impl Fn(ObjRef) -> bool) {
        for entry in &mut self.entries {
            if let Some(key) = entry.key {
                if !is_marked(key) {
                    *entry = Entry { key: None, hash: 0, value: Value::bool(true), tombstone: true };
                    self.count -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn href(i: u32) -> ObjRef {
        ObjRef::for_test(i)
    }

    #[test]
    fn set_get_roundtrip() {
        let mut t = Table::new();
        t.set(href(1), 1, Value::number(1.0));
        t.set(href(2), 2, Value::number(2.0));
        assert_eq!(t.get(href(1), 1), Some(Value::number(1.0)));
        assert_eq!(t.get(href(2), 2), Some(Value::number(2.0)));
        assert_eq!(t.get(href(3), 3), None);
    }

    #[test]
    fn delete_then_reinsert_keeps_probe_chain_intact() {
        let mut t = Table::new();
        // force collisions into one bucket chain
        t.set(href(1), 0, Value::number(1.0));
        t.set(href(2), 0, Value::number(2.0));
        assert!(t.delete(href(1), 0));
        assert_eq!(t.get(href(2), 0), Some(Value::number(2.0)));
        assert_eq!(t.get(href(1), 0), None);
    }

    #[test]
    fn grows_under_load() {
        let mut t = Table::new();
        for i in 0..100 {
            t.set(href(i), i, Value::number(i as f64));
        }
        for i in 0..100 {
            assert_eq!(t.get(href(i), i), Some(Value::number(i as f64)));
        }
    }

    #[test]
    fn colliding_entries_survive_a_grow() {
        // All share hash 0, so they land in one probe chain; growing must
        // rebuild that chain from each entry's own cached hash, not by
        // recomputing anything from the key.
        let mut t = Table::new();
        for i in 0..20 {
            t.set(href(i), 0, Value::number(i as f64));
        }
        for i in 0..20 {
            assert_eq!(t.get(href(i), 0), Some(Value::number(i as f64)));
        }
    }
}
