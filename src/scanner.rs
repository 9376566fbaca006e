// ABOUTME: Converts JMPL source text into a token stream

use crate::error::{ErrorKind, JmplError};
use crate::token::{Token, TokenKind};
use crate::value::Value;

fn keyword(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match word {
        "and" => And,
        "or" => Or,
        "xor" => Xor,
        "true" => True,
        "false" => False,
        "let" => Let,
        "null" => Null,
        "if" => If,
        "then" => Then,
        "else" => Else,
        "while" => While,
        "do" => Do,
        "out" => Out,
        "return" => Return,
        "function" => Function,
        _ => return None,
    })
}

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<JmplError>,
    start: usize,
    current: usize,
    line: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scans the whole source, returning every token produced (terminated by
    /// a synthetic `EOF`) and every scan error encountered. Scanning never
    /// stops early on an unrecognised character — it reports and continues.
    pub fn scan_tokens(mut self) -> (Vec<Token>, Vec<JmplError>) {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens.push(Token::eof(self.line));
        (self.tokens, self.errors)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        *self.source.get(self.current).unwrap_or(&'\0')
    }

    fn peek_next(&self) -> char {
        *self.source.get(self.current + 1).unwrap_or(&'\0')
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_token_literal(kind, None);
    }

    fn add_token_literal(&mut self, kind: TokenKind, literal: Option<Value>) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, literal, self.line));
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(JmplError::static_error(self.line, self.lexeme(), ErrorKind::Syntax, message));
    }

    fn scan_token(&mut self) {
        use TokenKind::*;
        let c = self.advance();
        match c {
            '(' => self.add_token(LeftParen),
            ')' => self.add_token(RightParen),
            '{' => self.add_token(LeftBrace),
            '}' => self.add_token(RightBrace),
            '[' => self.add_token(LeftSquare),
            ']' => self.add_token(RightSquare),
            ',' => self.add_token(Comma),
            '.' => self.add_token(Dot),
            '-' => self.add_token(Minus),
            '+' => self.add_token(Plus),
            '*' => self.add_token(Asterisk),
            '^' => self.add_token(Caret),
            '%' => self.add_token(Percent),
            ';' => self.add_token(Semicolon),
            ':' => {
                let kind = if self.match_char('=') { Assign } else { Colon };
                self.add_token(kind);
            }
            '|' => self.add_token(Pipe),
            '#' => self.add_token(Hashtag),
            '!' => {
                let kind = if self.match_char('=') { NotEqual } else { Not };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.match_char('=') {
                    EqualEqual
                } else if self.match_char('>') {
                    Implies
                } else {
                    Equal
                };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.match_char('=') { LessEqual } else { Less };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.match_char('=') { GreaterEqual } else { Greater };
                self.add_token(kind);
            }
            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(Slash);
                }
            }
            '¬' => {
                let kind = if self.match_char('=') { NotEqual } else { Not };
                self.add_token(kind);
            }
            '∑' => self.add_token(Summation),
            '∧' => self.add_token(And),
            '∨' => self.add_token(Or),
            '∈' => self.add_token(In),
            '≠' => self.add_token(NotEqual),
            '≤' => self.add_token(LessEqual),
            '≥' => self.add_token(GreaterEqual),
            '→' => self.add_token(MapsTo),
            '⇒' => self.add_token(Implies),
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if is_identifier_start(c) => self.identifier(),
            _ => self.error("Unexpected character"),
        }
    }

    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.error("Unterminated string");
            return;
        }

        self.advance();
        let value: String = self.source[self.start + 1..self.current - 1].iter().collect();
        self.add_token_literal(TokenKind::String, Some(Value::String(value)));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let text = self.lexeme();
        let value: f64 = text.parse().expect("scanned number lexeme is always valid f64 syntax");
        self.add_token_literal(TokenKind::Number, Some(Value::Number(value)));
    }

    fn identifier(&mut self) {
        while is_identifier_part(self.peek()) {
            self.advance();
        }
        let text = self.lexeme();
        match keyword(&text) {
            Some(kind) => self.add_token(kind),
            None => self.add_token(TokenKind::Identifier),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
