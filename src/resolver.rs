// ABOUTME: Static pass computing lexical distances for variable references

use crate::ast::{Expr, NodeId, Stmt};
use crate::error::{ErrorKind, JmplError};
use crate::token::Token;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    errors: Vec<JmplError>,
    current_function: FunctionType,
}

impl Resolver {
    pub fn resolve(statements: &[Stmt]) -> (HashMap<NodeId, usize>, Vec<JmplError>) {
        let mut resolver = Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
        };
        for stmt in statements {
            resolver.resolve_stmt(stmt);
        }
        (resolver.locals, resolver.errors)
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.errors.push(JmplError::at_token(
                    name,
                    ErrorKind::Variable,
                    "Already a variable with this name in this scope",
                ));
                return;
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id, depth);
                return;
            }
        }
        // Not found in any scope: the interpreter resolves it against globals.
    }

    /// Resolves a function's parameters and body in a single scope. Mirrors
    /// `Interpreter::execute_function_body`, which binds parameters and runs
    /// the body's statements in the same call environment rather than
    /// nesting a second one for a block body — so a block body's statements
    /// are resolved directly here, not by dispatching to the generic
    /// `Stmt::Block` arm of `resolve_stmt`, which would push an extra scope
    /// the interpreter never creates.
    fn resolve_function(&mut self, params: &[Token], body: &Stmt) {
        let enclosing = self.current_function;
        self.current_function = FunctionType::Function;
        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        match body {
            Stmt::Block(statements) => {
                for s in statements {
                    self.resolve_stmt(s);
                }
            }
            other => self.resolve_stmt(other),
        }
        self.end_scope();
        self.current_function = enclosing;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Let { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }
            Stmt::If { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Function { name, params, body } => {
                self.declare(name);
                self.define(name);
                self.resolve_function(params, body);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.errors.push(JmplError::at_token(
                        keyword,
                        ErrorKind::Return,
                        "Can't return from top-level code",
                    ));
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Output(expr) => self.resolve_expr(expr),
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.errors.push(JmplError::at_token(
                            name,
                            ErrorKind::Variable,
                            "Can't read local variable in its own initialiser",
                        ));
                    }
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Summation { upper, lower, summand, .. } => {
                self.resolve_expr(upper);
                match lower.as_ref() {
                    Stmt::Let { .. } => {
                        self.begin_scope();
                        self.resolve_stmt(lower);
                        self.resolve_expr(summand);
                        self.end_scope();
                    }
                    _ => {
                        self.resolve_stmt(lower);
                        self.resolve_expr(summand);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(source: &str) -> (HashMap<NodeId, usize>, Vec<JmplError>) {
        let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
        assert!(scan_errors.is_empty());
        let (stmts, parse_errors) = Parser::parse(tokens);
        assert!(parse_errors.is_empty());
        Resolver::resolve(&stmts)
    }

    #[test]
    fn self_reference_in_initializer_is_an_error() {
        let (_, errors) = resolve("(let a = a;)");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::Variable);
    }

    #[test]
    fn redeclaration_in_same_scope_is_an_error() {
        let (_, errors) = resolve("(let a = 1; let a = 2;)");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::Variable);
    }

    #[test]
    fn return_outside_function_is_an_error() {
        let (_, errors) = resolve("return 1;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::Return);
    }

    #[test]
    fn return_inside_function_is_fine() {
        let (_, errors) = resolve("function f() = return 1; out f();");
        assert!(errors.is_empty());
    }

    #[test]
    fn local_variable_resolves_to_nonzero_distance() {
        let (locals, errors) = resolve("(let a = 1; (out a;))");
        assert!(errors.is_empty());
        assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn global_reference_is_left_unresolved() {
        let (locals, errors) = resolve("let a = 1; out a;");
        assert!(errors.is_empty());
        assert!(locals.is_empty());
    }
}
