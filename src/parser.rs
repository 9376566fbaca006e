// ABOUTME: Recursive-descent parser turning a token stream into statements

use crate::ast::{Expr, NodeId, Stmt};
use crate::error::{ErrorKind, JmplError};
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Marks that a parse rule failed and already recorded a `JmplError`; the
/// caller either propagates it (to be caught by `declaration`'s synchronize)
/// or, for non-fatal cases like an overflowed parameter list, is never
/// constructed at all.
struct ParseError;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<JmplError>,
    next_id: NodeId,
}

impl Parser {
    pub fn parse(tokens: Vec<Token>) -> (Vec<Stmt>, Vec<JmplError>) {
        let mut parser = Parser { tokens, current: 0, errors: Vec::new(), next_id: 0 };
        let mut statements = Vec::new();
        while !parser.is_at_end() {
            if let Some(stmt) = parser.declaration() {
                statements.push(stmt);
            }
        }
        (statements, parser.errors)
    }

    fn next_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // -- token stream primitives --

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_token(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|k| self.check(*k)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&mut self, message: &str) -> ParseError {
        let token = self.peek().clone();
        self.errors.push(JmplError::at_token(&token, ErrorKind::Syntax, message));
        ParseError
    }

    fn error_at(&mut self, token: &Token, message: &str) {
        self.errors.push(JmplError::at_token(token, ErrorKind::Syntax, message));
    }

    /// Discards tokens until just past a `;` or until a token that can start
    /// a new statement, then resumes parsing from there.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            if matches!(
                self.peek().kind,
                TokenKind::Function | TokenKind::Let | TokenKind::If | TokenKind::Return | TokenKind::While
            ) {
                return;
            }
            self.advance();
        }
    }

    // -- statements --

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_token(&[TokenKind::Let]) { self.let_decl() } else { self.statement() };
        match result {
            Ok(stmt) => Some(stmt),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    fn let_decl(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
        let initializer = if self.match_token(&[TokenKind::Equal]) { Some(self.expression()?) } else { None };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Let { name, initializer })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(&[TokenKind::Function]) {
            return self.func_decl();
        }
        if self.match_token(&[TokenKind::If]) {
            return self.if_stmt();
        }
        if self.match_token(&[TokenKind::Out]) {
            return self.out_stmt();
        }
        if self.match_token(&[TokenKind::Return]) {
            return self.return_stmt();
        }
        if self.match_token(&[TokenKind::While]) {
            return self.while_stmt();
        }
        if self.match_token(&[TokenKind::LeftParen]) {
            return self.finish_block();
        }
        self.expr_stmt()
    }

    fn func_decl(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.errors.push(JmplError::at_token(&token, ErrorKind::Parameter, "Can't have more than 254 parameters"));
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::Equal, "Expect '=' before function body.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::Function { name, params, body })
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let condition = self.expression()?;
        self.consume(TokenKind::Then, "Expect 'then' after condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch =
            if self.match_token(&[TokenKind::Else]) { Some(Box::new(self.statement()?)) } else { None };
        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let condition = self.expression()?;
        self.consume(TokenKind::Do, "Expect 'do' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn out_stmt(&mut self) -> Result<Stmt, ParseError> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Output(value))
    }

    fn return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::Semicolon) { Some(self.expression()?) } else { None };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    /// Parses the contents of a block whose leading `(` has already been
    /// consumed by `statement`.
    fn finish_block(&mut self) -> Result<Stmt, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightParen) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after block.")?;
        Ok(Stmt::Block(statements))
    }

    fn expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // -- expressions --

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.summation()?;

        if self.match_token(&[TokenKind::Assign]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            if let Expr::Variable { name, .. } = &expr {
                let id = self.next_id();
                return Ok(Expr::Assign { id, name: name.clone(), value: Box::new(value) });
            }
            self.error_at(&equals, "Invalid assignment target");
            return Ok(expr);
        }

        Ok(expr)
    }

    fn summation(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&[TokenKind::Summation]) {
            let name = self.previous().clone();
            self.consume(TokenKind::LeftParen, "Expect '(' after summation operator.")?;
            let upper = Box::new(self.summation()?);
            self.consume(TokenKind::Comma, "Expect ',' after upper bound.")?;
            let lower = Box::new(self.lower_bound()?);
            self.consume(TokenKind::RightParen, "Expect ')' after summation bounds.")?;
            let summand = Box::new(self.expression()?);
            return Ok(Expr::Summation { name, upper, lower, summand });
        }
        self.or()
    }

    fn lower_bound(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(&[TokenKind::Let]) {
            let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
            self.consume(TokenKind::Equal, "Expect '=' after variable name.")?;
            let initializer = Some(self.expression()?);
            return Ok(Stmt::Let { name, initializer });
        }

        let expr = self.assignment()?;
        if !matches!(expr, Expr::Assign { .. }) {
            self.error_at_current("Expect a lower bound of the form 'let IDENT = expr' or an assignment");
        }
        Ok(Stmt::Expression(expr))
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.and()?;
        while self.match_token(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;
        while self.match_token(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;
        while self.match_token(&[TokenKind::EqualEqual, TokenKind::NotEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.term()?;
        while self.match_token(&[TokenKind::Less, TokenKind::LessEqual, TokenKind::Greater, TokenKind::GreaterEqual]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor()?;
        while self.match_token(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.exponent()?;
        while self.match_token(&[TokenKind::Asterisk, TokenKind::Slash]) {
            let op = self.previous().clone();
            let right = self.exponent()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn exponent(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;
        while self.match_token(&[TokenKind::Caret]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&[TokenKind::Not, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = Box::new(self.unary()?);
            return Ok(Expr::Unary { op, right });
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.match_token(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= 255 {
                    let token = self.peek().clone();
                    self.errors.push(JmplError::at_token(&token, ErrorKind::Argument, "Can't have more than 254 arguments"));
                }
                args.push(self.expression()?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call { callee: Box::new(callee), paren, args })
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&[TokenKind::True]) {
            return Ok(Expr::Literal(Value::Boolean(true)));
        }
        if self.match_token(&[TokenKind::False]) {
            return Ok(Expr::Literal(Value::Boolean(false)));
        }
        if self.match_token(&[TokenKind::Null]) {
            return Ok(Expr::Literal(Value::Null));
        }
        if self.match_token(&[TokenKind::Number, TokenKind::String]) {
            let literal = self.previous().literal.clone().expect("scanner attaches a literal to every NUMBER/STRING token");
            return Ok(Expr::Literal(literal));
        }
        if self.match_token(&[TokenKind::Identifier]) {
            let id = self.next_id();
            return Ok(Expr::Variable { id, name: self.previous().clone() });
        }
        if self.match_token(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }
        Err(self.error_at_current("Expect expression"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<JmplError>) {
        let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
        assert!(scan_errors.is_empty());
        Parser::parse(tokens)
    }

    #[test]
    fn parses_output_of_binary_expression() {
        let (stmts, errors) = parse("out 1 + 2;");
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Output(Expr::Binary { .. })));
    }

    #[test]
    fn parses_let_and_block() {
        let (stmts, errors) = parse("let a = 1; (let b = 2; out a + b;)");
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0], Stmt::Let { .. }));
        assert!(matches!(stmts[1], Stmt::Block(_)));
    }

    #[test]
    fn parses_grouping_inside_expression() {
        let (stmts, errors) = parse("out (1 + 2) * 3;");
        assert!(errors.is_empty());
        match &stmts[0] {
            Stmt::Output(Expr::Binary { left, .. }) => assert!(matches!(**left, Expr::Grouping(_))),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_function_declaration_and_call() {
        let (stmts, errors) = parse("function add(a, b) = return a + b; out add(1, 2);");
        assert!(errors.is_empty());
        assert!(matches!(stmts[0], Stmt::Function { .. }));
        assert!(matches!(stmts[1], Stmt::Output(Expr::Call { .. })));
    }

    #[test]
    fn invalid_assignment_target_reports_syntax_error_but_continues() {
        let (_, errors) = parse("1 := 2;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::Syntax);
    }

    #[test]
    fn parses_summation_with_let_lower_bound() {
        let (stmts, errors) = parse("out ∑(5, let i = 1) i;");
        assert!(errors.is_empty());
        match &stmts[0] {
            Stmt::Output(Expr::Summation { lower, .. }) => assert!(matches!(**lower, Stmt::Let { .. })),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn self_reference_parses_without_error_resolver_catches_it() {
        let (stmts, errors) = parse("(let a = a;)");
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 1);
    }
}
