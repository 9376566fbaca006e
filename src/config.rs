// ABOUTME: Binary identity constants shared by the CLI and REPL banner

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_USAGE: i32 = 64;
pub const EXIT_STATIC_ERROR: i32 = 65;
pub const EXIT_RUNTIME_ERROR: i32 = 70;

pub const REPL_PROMPT: &str = "> ";
