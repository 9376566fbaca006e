// ABOUTME: Process-level checks of the `jmpl` binary's exit codes and stderr

use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn jmpl_script(source: &str) -> std::process::Output {
    let mut file = NamedTempFile::new().expect("create temp script file");
    file.write_all(source.as_bytes()).expect("write temp script file");
    file.flush().unwrap();

    Command::new(env!("CARGO_BIN_EXE_jmpl"))
        .arg(file.path())
        .output()
        .expect("failed to run the jmpl binary")
}

#[test]
fn division_by_zero_exits_70_with_zero_division_error() {
    let output = jmpl_script("out 1/0;");
    assert_eq!(output.status.code(), Some(70));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ZeroDivisionError"), "stderr was: {stderr}");
}

#[test]
fn self_reference_in_initializer_exits_65_with_variable_error() {
    let output = jmpl_script("( let a = a; )");
    assert_eq!(output.status.code(), Some(65));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("VariableError"), "stderr was: {stderr}");
}

#[test]
fn successful_script_exits_0_and_prints_to_stdout() {
    let output = jmpl_script("out 1 + 2;");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "3\n");
}

#[test]
fn more_than_one_argument_exits_64() {
    let output = Command::new(env!("CARGO_BIN_EXE_jmpl"))
        .arg("one.jmpl")
        .arg("two.jmpl")
        .output()
        .expect("failed to run the jmpl binary");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn missing_script_file_exits_65() {
    let output = Command::new(env!("CARGO_BIN_EXE_jmpl"))
        .arg("/nonexistent/path/to/a/script.jmpl")
        .output()
        .expect("failed to run the jmpl binary");
    assert_eq!(output.status.code(), Some(65));
}
