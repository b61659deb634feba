//! Stack-based bytecode virtual machine with call frames, closures,
//! classes, and a tracing garbage collector.
//!
//! The VM owns the [`vitte_core::heap::Heap`] arena, compiles source text
//! through `vitte_compiler` on demand, and executes the resulting bytecode
//! with a straightforward fetch-decode-dispatch loop over [`vitte_core::OpCode`].

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod error;
pub mod natives;
pub mod vm;

pub use error::RuntimeError;
pub use vm::{InterpretResult, Vm, VmConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use vitte_core::heap::GcConfig;

    fn run(source: &str) -> InterpretResult {
        let mut vm = Vm::new(GcConfig::default(), VmConfig::default());
        vm.interpret(source)
    }

    #[test]
    fn reports_compile_errors_without_running() {
        assert_eq!(run("print 1"), InterpretResult::CompileError);
    }

    #[test]
    fn reports_a_type_error_as_a_runtime_error() {
        assert_eq!(run("print 1 + \"a\";"), InterpretResult::RuntimeError);
    }

    #[test]
    fn closures_capture_and_share_outer_locals() {
        let source = r#"
            fun makeCounter() {
              var i = 0;
              fun count() {
                i = i + 1;
                return i;
              }
              return count;
            }
            var counter = makeCounter();
            var a = counter();
            var b = counter();
            if (a != 1) print "fail a";
            if (b != 2) print "fail b";
            print "ok";
        "#;
        assert_eq!(run(source), InterpretResult::Ok);
    }

    #[test]
    fn classes_support_inheritance_and_super_calls() {
        let source = r#"
            class Animal {
              speak() { return "..."; }
            }
            class Dog < Animal {
              speak() {
                return super.speak() + " woof";
              }
            }
            var d = Dog();
            print d.speak();
        "#;
        assert_eq!(run(source), InterpretResult::Ok);
    }

    #[test]
    fn calling_an_undefined_global_is_a_runtime_error() {
        assert_eq!(run("nope();"), InterpretResult::RuntimeError);
    }

    #[test]
    fn native_clock_is_callable() {
        assert_eq!(run("print clock();"), InterpretResult::Ok);
    }

    #[test]
    fn garbage_collection_does_not_disturb_a_running_script() {
        let mut gc_config = GcConfig::default();
        gc_config.initial_threshold = 64;
        gc_config.stress = true;
        let mut vm = Vm::new(gc_config, VmConfig::default());
        let source = r#"
            var total = 0;
            for (var i = 0; i < 200; i = i + 1) {
              var s = "item" + "-";
              total = total + 1;
            }
            print total;
        "#;
        assert_eq!(vm.interpret(source), InterpretResult::Ok);
    }
}
