// ABOUTME: Error types for the scan/parse/resolve/runtime passes

use crate::token::{Token, TokenKind};
use thiserror::Error;

/// The closed set of error kinds from the language spec. `Display` title-cases
/// the variant and appends "Error" (e.g. `ZeroDivision` -> `ZeroDivisionError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Type,
    Variable,
    Argument,
    Parameter,
    Function,
    Identifier,
    Return,
    ZeroDivision,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "Syntax",
            ErrorKind::Type => "Type",
            ErrorKind::Variable => "Variable",
            ErrorKind::Argument => "Argument",
            ErrorKind::Parameter => "Parameter",
            ErrorKind::Function => "Function",
            ErrorKind::Identifier => "Identifier",
            ErrorKind::Return => "Return",
            ErrorKind::ZeroDivision => "ZeroDivision",
        };
        write!(f, "{name}Error")
    }
}

/// A single error shape covers both the static passes (scan/parse/resolve),
/// which report a source line and the lexeme location ("at 'LEXEME'" / "at
/// end" / nothing), and the runtime pass, which reports only the token's line.
#[derive(Error, Debug, Clone)]
pub enum JmplError {
    #[error("[line {line}] {kind}{location}: {message}.")]
    Static {
        line: usize,
        location: String,
        kind: ErrorKind,
        message: String,
    },

    #[error("[line {line}] {kind}: {message}.")]
    Runtime {
        token: Token,
        line: usize,
        kind: ErrorKind,
        message: String,
    },
}

impl JmplError {
    pub fn static_error(line: usize, lexeme: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        JmplError::Static {
            line,
            location: format!(" at '{}'", lexeme.into()),
            kind,
            message: message.into(),
        }
    }

    /// Static error located at a token, following the "at 'LEXEME'" / "at end" rule.
    pub fn at_token(token: &Token, kind: ErrorKind, message: impl Into<String>) -> Self {
        let location = if token.kind == TokenKind::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        JmplError::Static {
            line: token.line,
            location,
            kind,
            message: message.into(),
        }
    }

    pub fn runtime(token: &Token, kind: ErrorKind, message: impl Into<String>) -> Self {
        JmplError::Runtime {
            line: token.line,
            token: token.clone(),
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JmplError::Static { kind, .. } => *kind,
            JmplError::Runtime { kind, .. } => *kind,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, JmplError::Static { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_title_cases_and_appends_error() {
        assert_eq!(ErrorKind::ZeroDivision.to_string(), "ZeroDivisionError");
        assert_eq!(ErrorKind::Syntax.to_string(), "SyntaxError");
        assert_eq!(ErrorKind::Variable.to_string(), "VariableError");
    }

    #[test]
    fn static_error_formats_at_lexeme() {
        let err = JmplError::static_error(3, "+", ErrorKind::Syntax, "Expect expression");
        assert_eq!(err.to_string(), "[line 3] SyntaxError at '+': Expect expression.");
    }

    #[test]
    fn static_error_formats_at_end() {
        let token = Token::eof(5);
        let err = JmplError::at_token(&token, ErrorKind::Syntax, "Expect ';' after value");
        assert_eq!(err.to_string(), "[line 5] SyntaxError at end: Expect ';' after value.");
    }

    #[test]
    fn runtime_error_formats_without_lexeme() {
        let token = Token::new(TokenKind::Slash, "/", None, 7);
        let err = JmplError::runtime(&token, ErrorKind::ZeroDivision, "Division by zero");
        assert_eq!(err.to_string(), "[line 7] ZeroDivisionError: Division by zero.");
    }
}
