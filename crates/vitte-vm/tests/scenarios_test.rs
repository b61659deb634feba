//! Source-to-stdout scenarios: each one compiles and runs a snippet and
//! checks the exact text `print` produced, not just the interpret result.

use vitte_core::heap::GcConfig;
use vitte_vm::{InterpretResult, Vm, VmConfig};

fn run(source: &str) -> (InterpretResult, String) {
    let mut vm = Vm::new(GcConfig::default(), VmConfig::default());
    let result = vm.interpret(source);
    (result, vm.stdout)
}

#[test]
fn arithmetic_precedence() {
    let (result, out) = run("print 1 + 2 * 3;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "7\n");
}

#[test]
fn string_concatenation() {
    let (result, out) = run(r#"var a = "foo"; var b = "bar"; print a + b;"#);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "foobar\n");
}

#[test]
fn closure_over_a_parameter() {
    let source = r#"
        fun make(x) { fun inner() { return x; } return inner; }
        var f = make(42); print f();
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "42\n");
}

#[test]
fn closure_keeps_a_block_local_alive_after_scope_exit() {
    let source = r#"var g; { var x = 1; fun h() { return x; } g = h; } print g();"#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "1\n");
}

#[test]
fn method_call_on_an_instance() {
    let source = r#"
        class A { greet() { print "hi"; } }
        var a = A(); a.greet();
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "hi\n");
}

#[test]
fn super_call_runs_the_parent_method_then_the_child_continues() {
    let source = r#"
        class A { m() { print "A"; } }
        class B < A { m() { super.m(); print "B"; } }
        B().m();
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "A\nB\n");
}

#[test]
fn interned_strings_compare_equal_by_identity() {
    let (result, out) = run(r#"print "a" == "a";"#);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "true\n");
}

#[test]
fn for_loop_prints_each_iteration() {
    let source = "for (var i = 0; i < 3; i = i + 1) print i;";
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "0\n1\n2\n");
}

#[test]
fn referencing_an_undefined_global_is_a_runtime_error() {
    let (result, _out) = run("print undefined_name;");
    assert_eq!(result, InterpretResult::RuntimeError);
}
