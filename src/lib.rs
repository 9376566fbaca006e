// ABOUTME: Library module exposing the scan/parse/resolve/interpret pipeline

pub mod ast;
pub mod config;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use error::JmplError;
use interpreter::Interpreter;
use std::io::Write;

/// Runs one unit of source (a whole file, or one REPL line) against a
/// caller-supplied interpreter and output sink. Mirrors the driver shape
/// described for the CLI: scan, parse, resolve — stopping before
/// interpretation if any pass reported an error — then interpret.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<(), Vec<JmplError>> {
    let (tokens, scan_errors) = scanner::Scanner::new(source).scan_tokens();
    let (statements, parse_errors) = parser::Parser::parse(tokens);

    let mut static_errors = scan_errors;
    static_errors.extend(parse_errors);
    if !static_errors.is_empty() {
        return Err(static_errors);
    }

    let (locals, resolve_errors) = resolver::Resolver::resolve(&statements);
    if !resolve_errors.is_empty() {
        return Err(resolve_errors);
    }

    interpreter.load_locals(locals);
    interpreter.interpret(&statements).map_err(|err| vec![err])
}

pub fn report_errors(errors: &[JmplError], out: &mut impl Write) {
    for error in errors {
        let _ = writeln!(out, "{error}");
    }
}
