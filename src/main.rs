use clap::Parser as ClapParser;
use jmpl::config;
use jmpl::error::JmplError;
use jmpl::interpreter::Interpreter;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::process::ExitCode;

/// JMPL interpreter
#[derive(ClapParser, Debug)]
#[command(name = "jmpl")]
#[command(version = config::VERSION)]
#[command(about = "Tree-walking interpreter for the JMPL language")]
struct Cli {
    /// Script file to execute. Omit to start the REPL. Passing more than one
    /// is a usage error (clap would otherwise just reject the extra
    /// argument with its own exit code, not the `64` this language specifies).
    #[arg(value_name = "FILE")]
    scripts: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.scripts.as_slice() {
        [] => {
            run_repl();
            ExitCode::from(config::EXIT_SUCCESS as u8)
        }
        [script] => run_file(script),
        _ => {
            eprintln!("Usage: jmpl [FILE]");
            ExitCode::from(config::EXIT_USAGE as u8)
        }
    }
}

fn run_file(path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Cannot read script file {}: {err}", path.display());
            return ExitCode::from(config::EXIT_STATIC_ERROR as u8);
        }
    };

    let mut interpreter = Interpreter::new();
    match jmpl::run(&source, &mut interpreter) {
        Ok(()) => ExitCode::from(config::EXIT_SUCCESS as u8),
        Err(errors) => {
            let code = exit_code_for(&errors);
            jmpl::report_errors(&errors, &mut std::io::stderr());
            ExitCode::from(code as u8)
        }
    }
}

fn run_repl() {
    let mut interpreter = Interpreter::new();
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Failed to initialize REPL: {err}");
            return;
        }
    };

    loop {
        match rl.readline(config::REPL_PROMPT) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if let Err(errors) = jmpl::run(&line, &mut interpreter) {
                    jmpl::report_errors(&errors, &mut std::io::stderr());
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }
}

/// A static (scan/parse/resolve) error exits `65`; a runtime error exits
/// `70`. `jmpl::run` only ever returns one runtime error at a time (it
/// aborts on the first), so a batch with more than one entry is always
/// static.
fn exit_code_for(errors: &[JmplError]) -> i32 {
    if errors.len() == 1 && !errors[0].is_static() {
        config::EXIT_RUNTIME_ERROR
    } else {
        config::EXIT_STATIC_ERROR
    }
}

