//! Single-pass Pratt compiler: scans source text and emits bytecode
//! directly, with no intermediate AST, mirroring the reference
//! implementation's approach of folding parsing and codegen into one walk.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod compiler;
pub mod error;
pub mod scanner;

use vitte_core::heap::{Heap, ObjRef};

pub use compiler::CompiledFunction;
pub use error::CompileError;

/// Compiles `source` into a top-level function (the implicit script body),
/// allocating interned strings and the function object itself through
/// `heap` so the result can be handed straight to the VM.
pub fn compile(source: &str, heap: &mut Heap) -> Result<CompiledFunction, Vec<CompileError>> {
    compiler::Parser::new(source, heap).compile()
}

/// Allocates the compiled script as a heap `Function` object and returns its
/// handle, ready to be wrapped in a closure and run.
pub fn compile_to_function(source: &str, heap: &mut Heap) -> Result<ObjRef, Vec<CompileError>> {
    let compiled = compile(source, heap)?;
    let mut function = vitte_core::object::FunctionObj::new_script();
    function.arity = compiled.arity;
    function.upvalue_count = compiled.upvalue_count;
    function.chunk = compiled.chunk;
    Ok(heap.alloc_function(function))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitte_core::heap::GcConfig;

    fn compile_ok(source: &str) -> CompiledFunction {
        let mut heap = Heap::new(GcConfig::default());
        compile(source, &mut heap).unwrap_or_else(|errs| panic!("unexpected compile errors: {errs:?}"))
    }

    #[test]
    fn compiles_arithmetic_and_print() {
        let compiled = compile_ok("print 1 + 2 * 3;");
        assert!(!compiled.chunk.code.is_empty());
    }

    #[test]
    fn reports_a_missing_semicolon() {
        let mut heap = Heap::new(GcConfig::default());
        let errs = compile("print 1", &mut heap).unwrap_err();
        assert!(!errs.is_empty());
    }

    #[test]
    fn compiles_a_class_with_inheritance() {
        let compiled = compile_ok(
            r#"
            class Animal {
              speak() { return "..."; }
            }
            class Dog < Animal {
              speak() { return "Woof"; }
            }
            "#,
        );
        assert!(!compiled.chunk.code.is_empty());
    }

    #[test]
    fn compiles_a_closure_over_an_outer_local() {
        let compiled = compile_ok(
            r#"
            fun makeCounter() {
              var i = 0;
              fun count() {
                i = i + 1;
                return i;
              }
              return count;
            }
            "#,
        );
        assert!(!compiled.chunk.code.is_empty());
    }

    #[test]
    fn rejects_top_level_return_with_a_value() {
        let mut heap = Heap::new(GcConfig::default());
        // top-level bare `return;` is fine; a value is the error case tested
        // by the parser's own FunctionType::Script check via `return 1;`.
        let errs = compile("return 1;", &mut heap).unwrap_err();
        assert!(errs.iter().any(|e| e.message.contains("top-level")));
    }

    /// Capturing the same outer local twice in one closure body must resolve
    /// to a single upvalue slot, not one per reference.
    #[test]
    fn repeated_capture_of_the_same_local_coalesces_into_one_upvalue() {
        let mut heap = Heap::new(GcConfig::default());
        let compiled = compile(
            r#"
            fun outer() {
              var x = 1;
              fun inner() {
                return x + x;
              }
              return inner;
            }
            "#,
            &mut heap,
        )
        .unwrap_or_else(|errs| panic!("unexpected compile errors: {errs:?}"));

        let outer = find_function_constant(&compiled.chunk, &heap).expect("outer fn constant");
        let inner = find_function_constant(&outer.chunk, &heap).expect("inner fn constant");
        assert_eq!(inner.upvalue_count, 1);
    }

    fn find_function_constant<'h>(
        chunk: &vitte_core::Chunk,
        heap: &'h Heap,
    ) -> Option<&'h vitte_core::object::FunctionObj> {
        for index in 0u8..=255u8 {
            let Ok(value) = chunk.get_constant(index) else { break };
            if let Some(r) = value.as_obj() {
                if let vitte_core::Object::Function(f) = heap.get(r) {
                    return Some(f);
                }
            }
        }
        None
    }
}
