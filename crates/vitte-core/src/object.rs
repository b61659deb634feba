//! Heap object variants.
//!
//! Every heap allocation in `vitte` is one of the variants of [`Object`].
//! In the book this design is modeled as C structs sharing a common
//! `Obj` header with a `type` tag; here the tag *is* the enum discriminant,
//! and [`crate::heap::Heap`] is the arena that owns every live `Object`,
//! addressed by the opaque [`crate::heap::ObjRef`] handle.

use crate::heap::ObjRef;
use crate::table::Table;
use crate::value::Value;
use crate::Chunk;

/// FNV-1a, 32-bit, matching the reference hash used to key interned strings.
pub fn fnv1a_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[derive(Debug)]
pub struct StringObj {
    pub chars: Box<str>,
    pub hash: u32,
}

impl StringObj {
    pub fn new(s: impl Into<Box<str>>) -> Self {
        let chars = s.into();
        let hash = fnv1a_hash(chars.as_bytes());
        Self { chars, hash }
    }
}

#[derive(Debug)]
pub struct FunctionObj {
    pub arity: u8,
    pub upvalue_count: u8,
    pub chunk: Chunk,
    /// `None` for the implicit top-level script.
    pub name: Option<ObjRef>,
}

impl FunctionObj {
    pub fn new_script() -> Self {
        Self { arity: 0, upvalue_count: 0, chunk: Chunk::new(), name: None }
    }

    pub fn new(name: ObjRef) -> Self {
        Self { arity: 0, upvalue_count: 0, chunk: Chunk::new(), name: Some(name) }
    }
}

pub type NativeFn = fn(args: &[Value]) -> Result<Value, String>;

#[derive(Clone, Copy)]
pub struct NativeObj {
    pub arity: u8,
    pub function: NativeFn,
}

impl std::fmt::Debug for NativeObj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeObj").field("arity", &self.arity).finish()
    }
}

/// An upvalue is `Open` while it still aliases a live stack slot, and
/// `Closed` once that slot has been retired (scope exit or return).
#[derive(Debug, Clone, Copy)]
pub enum UpvalueState {
    Open(usize),
    Closed(Value),
}

#[derive(Debug)]
pub struct UpvalueObj {
    pub state: UpvalueState,
}

#[derive(Debug)]
pub struct ClosureObj {
    pub function: ObjRef,
    pub upvalues: Vec<ObjRef>,
}

#[derive(Debug)]
pub struct ClassObj {
    pub name: ObjRef,
    pub methods: Table,
}

impl ClassObj {
    pub fn new(name: ObjRef) -> Self {
        Self { name, methods: Table::new() }
    }
}

#[derive(Debug)]
pub struct InstanceObj {
    pub class: ObjRef,
    pub fields: Table,
}

impl InstanceObj {
    pub fn new(class: ObjRef) -> Self {
        Self { class, fields: Table::new() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoundMethodObj {
    pub receiver: Value,
    pub method: ObjRef,
}

/// A heap-allocated value. The enum discriminant doubles as the object's
/// type tag; there is no separate header.
#[derive(Debug)]
pub enum Object {
    Str(StringObj),
    Function(FunctionObj),
    Native(NativeObj),
    Upvalue(UpvalueObj),
    Closure(ClosureObj),
    Class(ClassObj),
    Instance(InstanceObj),
    BoundMethod(BoundMethodObj),
}

impl Object {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::Str(_) => "string",
            Object::Function(_) => "function",
            Object::Native(_) => "native",
            Object::Upvalue(_) => "upvalue",
            Object::Closure(_) => "closure",
            Object::Class(_) => "class",
            Object::Instance(_) => "instance",
            Object::BoundMethod(_) => "bound method",
        }
    }

    /// A rough accounting of the bytes this object owns, used to drive the
    /// GC's `bytesAllocated` threshold. Not byte-exact, just monotonic.
    pub fn heap_size(&self) -> usize {
        let base = std::mem::size_of::<Object>();
        base + match self {
            Object::Str(s) => s.chars.len(),
            Object::Function(f) => f.chunk.code.len() + f.chunk.consts.len() * std::mem::size_of::<Value>(),
            Object::Closure(c) => c.upvalues.len() * std::mem::size_of::<ObjRef>(),
            Object::Class(c) => c.methods.capacity() * std::mem::size_of::<(ObjRef, Value)>(),
            Object::Instance(i) => i.fields.capacity() * std::mem::size_of::<(ObjRef, Value)>(),
            _ => 0,
        }
    }
}
