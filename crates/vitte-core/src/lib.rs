//! vitte-core — value representation, object model, heap/GC substrate, and
//! bytecode chunk format shared by the compiler and the VM.
//!
//! ## Modules
//! - `value`    : the dynamically-typed `Value` cell (tagged union or
//!   NaN-boxed, selected by the `nan_boxing` feature).
//! - `object`   : heap object variants (strings, functions, closures,
//!   upvalues, classes, instances, bound methods, natives).
//! - `heap`     : the allocation arena and the tracing mark-sweep collector.
//! - `table`    : the open-addressed hash table used for globals, methods,
//!   fields, and string interning.
//! - `bytecode` : `Chunk`, the constant pool, and the `OpCode` instruction
//!   set.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod bytecode;
pub mod error;
pub mod heap;
pub mod object;
pub mod table;
pub mod value;

pub use bytecode::{Chunk, OpCode};
pub use error::Error;
pub use heap::{GcConfig, Heap, ObjRef};
pub use object::Object;
pub use value::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;
