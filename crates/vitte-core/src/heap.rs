//! The allocation arena and the tracing mark-sweep collector.
//!
//! Rust has no intrusive pointer list to hang a GC off of without `unsafe`,
//! so every heap object lives in a `Vec<Slot>` and is addressed by its
//! index, [`ObjRef`]. A free list recycles slots vacated by `sweep`, so
//! `ObjRef` values are only stable between collections, exactly like a raw
//! pointer in the reference implementation would only be stable until the
//! next GC moved or freed it.

use tracing::trace;

use crate::object::{fnv1a_hash, BoundMethodObj, ClassObj, ClosureObj, FunctionObj, InstanceObj, NativeFn, NativeObj, Object, StringObj, UpvalueObj, UpvalueState};
use crate::table::Table;
use crate::value::Value;

/// A handle into the heap arena. Stable only between collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(u32);

impl ObjRef {
    pub fn index(self) -> u32 {
        self.0
    }

    pub fn from_index(i: u32) -> Self {
        ObjRef(i)
    }

    #[cfg(test)]
    pub fn for_test(i: u32) -> Self {
        ObjRef(i)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GcConfig {
    /// `nextGC` starts here; 1 MiB, matching the reference VM.
    pub initial_threshold: usize,
    /// `nextGC = bytesAllocated * growth_factor` after each collection.
    pub growth_factor: usize,
    /// Collect before every allocation, regardless of threshold. Exposed
    /// to the CLI as `--gc-stress` to shake out missing roots.
    pub stress: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig { initial_threshold: 1024 * 1024, growth_factor: 2, stress: false }
    }
}

struct Slot {
    object: Option<Object>,
    marked: bool,
}

#[derive(Clone, Copy)]
struct Bucket {
    slot: Option<ObjRef>,
    /// A tombstone is a deleted entry: `slot == None` but the bucket still
    /// counts toward the probe sequence, so a later `find` for a string
    /// that probed past this bucket doesn't stop short and orphan it.
    /// Mirrors `Table`'s own tombstone handling (see table.rs).
    tombstone: bool,
}

impl Bucket {
    fn empty() -> Self {
        Bucket { slot: None, tombstone: false }
    }
}

/// A lean, heap-free bucket array mapping raw string bytes to the
/// `ObjRef` of their interned `StringObj`, mirroring `tableFindString`:
/// the reference table doubles as the weak set of interned strings.
struct Interner {
    buckets: Vec<Bucket>,
    count: usize,
}

impl Interner {
    fn new() -> Self {
        Interner { buckets: Vec::new(), count: 0 }
    }

    fn find<'a>(&self, objects: &'a [Slot], bytes: &str, hash: u32) -> Option<ObjRef> {
        if self.buckets.is_empty() {
            return None;
        }
        let capacity = self.buckets.len();
        let mut index = (hash as usize) & (capacity - 1);
        loop {
            let bucket = &self.buckets[index];
            match bucket.slot {
                None if !bucket.tombstone => return None,
                None => {}
                Some(r) => {
                    if let Some(Object::Str(s)) = &objects[r.index() as usize].object {
                        if s.hash == hash && &*s.chars == bytes {
                            return Some(r);
                        }
                    }
                }
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn insert(&mut self, objects: &[Slot], hash: u32, r: ObjRef) {
        if self.buckets.is_empty() || (self.count + 1) as f64 > self.buckets.len() as f64 * 0.75 {
            self.grow(objects);
        }
        let capacity = self.buckets.len();
        let mut index = (hash as usize) & (capacity - 1);
        loop {
            if self.buckets[index].slot.is_none() {
                self.buckets[index] = Bucket { slot: Some(r), tombstone: false };
                self.count += 1;
                return;
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn grow(&mut self, objects: &[Slot]) {
        let new_capacity = if self.buckets.is_empty() { 8 } else { self.buckets.len() * 2 };
        let old = std::mem::replace(&mut self.buckets, vec![Bucket::empty(); new_capacity]);
        self.count = 0;
        for bucket in &old {
            let Some(r) = bucket.slot else { continue };
            if let Some(Object::Str(s)) = &objects[r.index() as usize].object {
                let hash = s.hash;
                let capacity = self.buckets.len();
                let mut index = (hash as usize) & (capacity - 1);
                loop {
                    if self.buckets[index].slot.is_none() {
                        self.buckets[index] = Bucket { slot: Some(r), tombstone: false };
                        self.count += 1;
                        break;
                    }
                    index = (index + 1) & (capacity - 1);
                }
            }
        }
    }

    /// Drops interned strings whose `ObjRef` did not survive the mark
    /// phase, i.e. nothing but the intern table itself was holding them.
    /// Leaves a tombstone rather than an empty bucket, so removing one
    /// entry from a collision chain never strands the entries after it
    /// (see `find`'s probe, which only stops at a genuinely empty bucket).
    fn remove_unmarked(&mut self, objects: &[Slot]) {
        for bucket in &mut self.buckets {
            if let Some(r) = bucket.slot {
                if !objects[r.index() as usize].marked {
                    *bucket = Bucket { slot: None, tombstone: true };
                    self.count -= 1;
                }
            }
        }
    }
}

pub struct Heap {
    objects: Vec<Slot>,
    free_list: Vec<u32>,
    interner: Interner,
    gray_stack: Vec<ObjRef>,
    /// Roots pinned by callers outside the normal stack/frame root set —
    /// the compiler uses this to protect function objects still under
    /// construction, since they are not yet reachable from any chunk.
    pub extra_roots: Vec<ObjRef>,
    bytes_allocated: usize,
    next_gc: usize,
    config: GcConfig,
    pub collections_run: usize,
}

impl Heap {
    pub fn new(config: GcConfig) -> Self {
        Heap {
            objects: Vec::new(),
            free_list: Vec::new(),
            interner: Interner::new(),
            gray_stack: Vec::new(),
            extra_roots: Vec::new(),
            bytes_allocated: 0,
            next_gc: config.initial_threshold,
            config,
            collections_run: 0,
        }
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn should_collect(&self) -> bool {
        self.config.stress || self.bytes_allocated > self.next_gc
    }

    fn raw_alloc(&mut self, object: Object) -> ObjRef {
        self.bytes_allocated += object.heap_size();
        if let Some(index) = self.free_list.pop() {
            self.objects[index as usize] = Slot { object: Some(object), marked: false };
            ObjRef(index)
        } else {
            let index = self.objects.len() as u32;
            self.objects.push(Slot { object: Some(object), marked: false });
            ObjRef(index)
        }
    }

    pub fn alloc(&mut self, object: Object) -> ObjRef {
        self.raw_alloc(object)
    }

    /// Interns `s`, reusing an existing `StringObj` if an equal one is
    /// already on the heap. This is the only path that should be used to
    /// produce string objects: every comparison and table lookup in the
    /// language depends on interning being total.
    pub fn intern(&mut self, s: &str) -> ObjRef {
        let hash = fnv1a_hash(s.as_bytes());
        if let Some(existing) = self.interner.find(&self.objects, s, hash) {
            return existing;
        }
        let r = self.raw_alloc(Object::Str(StringObj::new(s)));
        self.interner.insert(&self.objects, hash, r);
        r
    }

    pub fn alloc_function(&mut self, f: FunctionObj) -> ObjRef {
        self.raw_alloc(Object::Function(f))
    }

    pub fn alloc_native(&mut self, arity: u8, function: NativeFn) -> ObjRef {
        self.raw_alloc(Object::Native(NativeObj { arity, function }))
    }

    pub fn alloc_open_upvalue(&mut self, stack_slot: usize) -> ObjRef {
        self.raw_alloc(Object::Upvalue(UpvalueObj { state: UpvalueState::Open(stack_slot) }))
    }

    pub fn alloc_closure(&mut self, function: ObjRef, upvalues: Vec<ObjRef>) -> ObjRef {
        self.raw_alloc(Object::Closure(ClosureObj { function, upvalues }))
    }

    pub fn alloc_class(&mut self, name: ObjRef) -> ObjRef {
        self.raw_alloc(Object::Class(ClassObj::new(name)))
    }

    pub fn alloc_instance(&mut self, class: ObjRef) -> ObjRef {
        self.raw_alloc(Object::Instance(InstanceObj::new(class)))
    }

    pub fn alloc_bound_method(&mut self, receiver: Value, method: ObjRef) -> ObjRef {
        self.raw_alloc(Object::BoundMethod(BoundMethodObj { receiver, method }))
    }

    pub fn get(&self, r: ObjRef) -> &Object {
        self.objects[r.index() as usize].object.as_ref().expect("dangling ObjRef")
    }

    pub fn get_mut(&mut self, r: ObjRef) -> &mut Object {
        self.objects[r.index() as usize].object.as_mut().expect("dangling ObjRef")
    }

    pub fn as_str(&self, r: ObjRef) -> &str {
        match self.get(r) {
            Object::Str(s) => &s.chars,
            other => unreachable!("as_str called on a {}", other.kind_name()),
        }
    }

    pub fn string_hash(&self, r: ObjRef) -> u32 {
        match self.get(r) {
            Object::Str(s) => s.hash,
            other => unreachable!("string_hash called on a {}", other.kind_name()),
        }
    }

    // --- Mark/sweep ---------------------------------------------------

    pub fn mark_value(&mut self, v: Value) {
        if let Some(r) = v.as_obj() {
            self.mark_object(r);
        }
    }

    pub fn mark_object(&mut self, r: ObjRef) {
        let slot = &mut self.objects[r.index() as usize];
        if slot.marked {
            return;
        }
        slot.marked = true;
        self.gray_stack.push(r);
    }

    pub fn mark_table(&mut self, table: &Table) {
        for (key, value) in table.snapshot() {
            self.mark_object(key);
            self.mark_value(value);
        }
    }

    fn blacken(&mut self, r: ObjRef) {
        trace!(target: "gc", object = r.index(), "blacken");
        match self.get(r) {
            Object::Str(_) | Object::Native(_) => {}
            Object::Function(f) => {
                let name = f.name;
                let consts: Vec<Value> = f.chunk.consts.clone();
                if let Some(n) = name {
                    self.mark_object(n);
                }
                for v in consts {
                    self.mark_value(v);
                }
            }
            Object::Upvalue(u) => {
                if let UpvalueState::Closed(v) = u.state {
                    self.mark_value(v);
                }
            }
            Object::Closure(c) => {
                let function = c.function;
                let upvalues = c.upvalues.clone();
                self.mark_object(function);
                for u in upvalues {
                    self.mark_object(u);
                }
            }
            Object::Class(c) => {
                let name = c.name;
                let methods = c.methods.snapshot();
                self.mark_object(name);
                for (key, value) in methods {
                    self.mark_object(key);
                    self.mark_value(value);
                }
            }
            Object::Instance(i) => {
                let class = i.class;
                let fields = i.fields.snapshot();
                self.mark_object(class);
                for (key, value) in fields {
                    self.mark_object(key);
                    self.mark_value(value);
                }
            }
            Object::BoundMethod(b) => {
                let receiver = b.receiver;
                let method = b.method;
                self.mark_value(receiver);
                self.mark_object(method);
            }
        }
    }

    /// Drains the gray worklist, turning every reachable object black.
    /// Callers mark their own roots first (VM stack/frames/globals, or the
    /// compiler's pinned `extra_roots`), then call this to trace the rest
    /// of the object graph.
    pub fn trace_references(&mut self) {
        while let Some(r) = self.gray_stack.pop() {
            self.blacken(r);
        }
    }

    /// Sweeps unmarked objects, clears every surviving mark bit, and
    /// recomputes the next collection threshold. Call after
    /// [`Heap::trace_references`].
    pub fn sweep(&mut self) {
        self.interner.remove_unmarked(&self.objects);
        let mut freed = 0usize;
        for index in 0..self.objects.len() {
            let slot = &mut self.objects[index];
            match &slot.object {
                Some(obj) if !slot.marked => {
                    freed += obj.heap_size();
                    slot.object = None;
                    self.free_list.push(index as u32);
                }
                Some(_) => slot.marked = false,
                None => {}
            }
        }
        self.bytes_allocated = self.bytes_allocated.saturating_sub(freed);
        self.next_gc = (self.bytes_allocated * self.config.growth_factor).max(self.config.initial_threshold);
        self.collections_run += 1;
    }

    pub fn live_object_count(&self) -> usize {
        self.objects.iter().filter(|s| s.object.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_identical_handle_for_equal_strings() {
        let mut heap = Heap::new(GcConfig::default());
        let a = heap.intern("hello");
        let b = heap.intern("hello");
        assert_eq!(a, b);
        let c = heap.intern("world");
        assert_ne!(a, c);
    }

    #[test]
    fn rooted_object_survives_collection() {
        let mut heap = Heap::new(GcConfig::default());
        let r = heap.intern("kept");
        heap.mark_object(r);
        heap.trace_references();
        heap.sweep();
        assert_eq!(heap.as_str(r), "kept");
    }

    /// Two strings sharing a bucket; the first is collected while the
    /// second survives. Losing the second would mean a later `intern` of
    /// its bytes misses it and allocates a duplicate `StringObj`, breaking
    /// pointer-equality interning.
    #[test]
    fn removing_a_collision_does_not_orphan_the_next_entry_in_the_chain() {
        let mut heap = Heap::new(GcConfig::default());
        let first = heap.intern("alpha");
        let hash = match &heap.objects[first.index() as usize].object {
            Some(Object::Str(s)) => s.hash,
            _ => unreachable!(),
        };

        // Find a distinct string landing in the same bucket (same hash
        // modulo the interner's current capacity, a 1-in-capacity chance
        // per candidate — cheap to find by brute force).
        let capacity = heap.interner.buckets.len();
        let bucket = (hash as usize) & (capacity - 1);
        let second_bytes = (0u32..100_000)
            .map(|i| format!("collide{i}"))
            .find(|s| s != "alpha" && (fnv1a_hash(s.as_bytes()) as usize) & (capacity - 1) == bucket)
            .expect("some 100-char-range string shares alpha's bucket");
        let second = heap.intern(&second_bytes);

        // Only `second` survives the next collection; `first` does not.
        heap.mark_object(second);
        heap.trace_references();
        heap.sweep();

        // `first`'s slot is gone, but re-interning `second`'s bytes must
        // still find its original object rather than allocating a new one.
        let refound = heap.intern(&second_bytes);
        assert_eq!(refound, second);
    }

    #[test]
    fn unrooted_object_is_collected() {
        let mut heap = Heap::new(GcConfig::default());
        heap.alloc(Object::Str(StringObj::new("temp")));
        let before = heap.live_object_count();
        heap.trace_references();
        heap.sweep();
        assert!(heap.live_object_count() < before);
    }
}
