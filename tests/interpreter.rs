// ABOUTME: End-to-end scenarios run against the public scan/parse/resolve/interpret pipeline

use jmpl::interpreter::{Interpreter, SharedOutput};

fn run(source: &str) -> Result<String, Vec<jmpl::error::JmplError>> {
    let out = SharedOutput::new();
    let mut interpreter = Interpreter::with_output(Box::new(out.clone()));
    jmpl::run(source, &mut interpreter)?;
    Ok(out.contents())
}

#[test]
fn addition() {
    assert_eq!(run("out 1 + 2;").unwrap(), "3\n");
}

#[test]
fn let_bindings() {
    assert_eq!(run("let a = 1; let b = 2; out a + b;").unwrap(), "3\n");
}

#[test]
fn recursive_fibonacci() {
    let source = "function fib(n) = if n < 2 then return n; else return fib(n-1) + fib(n-2); out fib(10);";
    assert_eq!(run(source).unwrap(), "55\n");
}

#[test]
fn closures_preserve_independent_state() {
    let source = "function mkc() = ( let i = 0; function c() = ( i := i + 1; i; ); c; ); \
                   let f = mkc(); out f(); out f(); out f();";
    assert_eq!(run(source).unwrap(), "1\n2\n3\n");
}

#[test]
fn summation_of_numbers() {
    assert_eq!(run("out ∑(5, let i = 1) i;").unwrap(), "15\n");
}

#[test]
fn summation_of_strings() {
    assert_eq!(run("out ∑(3, let i = 1) \"a\";").unwrap(), "aaa\n");
}

#[test]
fn self_reference_in_initializer_is_a_static_error() {
    let errors = run("( let a = a; )").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_static());
    assert_eq!(errors[0].kind(), jmpl::error::ErrorKind::Variable);
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let errors = run("out 1/0;").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].is_static());
    assert_eq!(errors[0].kind(), jmpl::error::ErrorKind::ZeroDivision);
}

#[test]
fn repl_session_shares_globals_across_runs() {
    let out = SharedOutput::new();
    let mut interpreter = Interpreter::with_output(Box::new(out.clone()));
    jmpl::run("let a = 1;", &mut interpreter).unwrap();
    jmpl::run("out a + 1;", &mut interpreter).unwrap();
    assert_eq!(out.contents(), "2\n");
}
