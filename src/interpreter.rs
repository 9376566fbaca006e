// ABOUTME: Tree-walking evaluator executing statements against the environment chain

use crate::ast::{Expr, NodeId, Stmt};
use crate::env::Environment;
use crate::error::{ErrorKind, JmplError};
use crate::token::{Token, TokenKind};
use crate::value::{Callable, Function, Native, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

/// What a statement produced: either an ordinary completion, optionally
/// carrying the block's implicit last-expression value, or an in-flight
/// `return` unwinding toward the nearest function call boundary.
pub enum Flow {
    Normal(Option<Value>),
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: HashMap<NodeId, usize>,
    out: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        let globals = Environment::new();
        globals.define_native(
            "clock",
            Value::Callable(Rc::new(Native { name: "clock".to_string(), arity: 0, func: native_clock })),
        );
        Interpreter { environment: Rc::clone(&globals), globals, locals: HashMap::new(), out }
    }

    /// Replaces the resolver's output for the statements about to be
    /// interpreted. Node ids are only unique within a single parse, so this
    /// is a wholesale swap rather than a merge — each call to `interpret`
    /// only ever looks up ids from the resolve pass that preceded it.
    pub fn load_locals(&mut self, locals: HashMap<NodeId, usize>) {
        self.locals = locals;
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), JmplError> {
        for stmt in statements {
            self.execute_stmt(stmt)?;
        }
        Ok(())
    }

    // -- statements --

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow, JmplError> {
        match stmt {
            Stmt::Expression(expr) => Ok(Flow::Normal(Some(self.evaluate(expr)?))),
            Stmt::Let { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                if !self.environment.define(&name.lexeme, value) {
                    return Err(JmplError::at_token(
                        name,
                        ErrorKind::Identifier,
                        "Already a variable with this name in this scope",
                    ));
                }
                Ok(Flow::Normal(None))
            }
            Stmt::Block(statements) => {
                let new_env = Environment::with_parent(Rc::clone(&self.environment));
                self.execute_block(statements, new_env)
            }
            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_stmt(else_branch)
                } else {
                    Ok(Flow::Normal(None))
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute_stmt(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal(None))
            }
            Stmt::Function { name, params, body } => {
                let function = Function::new(
                    name.lexeme.clone(),
                    params.clone(),
                    Rc::new(body.as_ref().clone()),
                    Rc::clone(&self.environment),
                );
                if !self.environment.define(&name.lexeme, Value::Callable(Rc::new(function))) {
                    return Err(JmplError::at_token(
                        name,
                        ErrorKind::Identifier,
                        "Already a variable with this name in this scope",
                    ));
                }
                Ok(Flow::Normal(None))
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Output(expr) => {
                let value = self.evaluate(expr)?;
                self.out
                    .write_all(format!("{value}\n").as_bytes())
                    .expect("writing to the configured output sink does not fail");
                Ok(Flow::Normal(None))
            }
        }
    }

    /// The shared primitive for `Block` statements and function bodies:
    /// executes `statements` against `new_env`, restoring the previous
    /// environment on every exit path. The block's implicit value is
    /// whatever the *last* statement's own flow carried — only an
    /// `Expression` or nested `Block` statement ever produces
    /// `Normal(Some(_))`, so no extra bookkeeping is needed here.
    fn execute_block(&mut self, statements: &[Stmt], new_env: Rc<Environment>) -> Result<Flow, JmplError> {
        let previous = std::mem::replace(&mut self.environment, new_env);
        let mut result = Ok(Flow::Normal(None));
        for stmt in statements {
            match self.execute_stmt(stmt) {
                Ok(Flow::Return(value)) => {
                    result = Ok(Flow::Return(value));
                    break;
                }
                Ok(flow) => result = Ok(flow),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        self.environment = previous;
        result
    }

    /// Runs a user function's body in its call environment (parameters
    /// already bound). Unlike `execute_stmt(Stmt::Block(..))`, this does not
    /// introduce a further nested scope when the body is itself a block —
    /// the call environment already is that scope.
    pub fn execute_function_body(&mut self, body: &Stmt, call_env: Rc<Environment>) -> Result<Value, JmplError> {
        let flow = match body {
            Stmt::Block(statements) => self.execute_block(statements, call_env)?,
            other => self.execute_block(std::slice::from_ref(other), call_env)?,
        };
        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal(value) => Ok(value.unwrap_or(Value::Null)),
        }
    }

    // -- expressions --

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, JmplError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable { id, name } => self.lookup_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }
            Expr::Unary { op, right } => self.evaluate_unary(op, right),
            Expr::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_binary(&left, op, &right)
            }
            Expr::Logical { left, op, right } => self.evaluate_logical(left, op, right),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Call { callee, paren, args } => self.evaluate_call(callee, paren, args),
            Expr::Summation { name, upper, lower, summand } => self.evaluate_summation(name, upper, lower, summand),
        }
    }

    fn lookup_variable(&self, id: NodeId, name: &Token) -> Result<Value, JmplError> {
        let found = match self.locals.get(&id) {
            Some(&distance) => self.environment.get_at(distance, &name.lexeme),
            None => self.globals.get(&name.lexeme),
        };
        found.ok_or_else(|| {
            JmplError::runtime(name, ErrorKind::Variable, format!("Undefined variable '{}'", name.lexeme))
        })
    }

    fn assign_variable(&self, id: NodeId, name: &Token, value: Value) -> Result<(), JmplError> {
        let assigned = match self.locals.get(&id) {
            Some(&distance) => self.environment.assign_at(distance, &name.lexeme, value),
            None => self.globals.assign(&name.lexeme, value),
        };
        if assigned {
            Ok(())
        } else {
            Err(JmplError::runtime(name, ErrorKind::Variable, format!("Undefined variable '{}'", name.lexeme)))
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> Result<Value, JmplError> {
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(JmplError::runtime(op, ErrorKind::Type, "Operand must be a number")),
            },
            TokenKind::Not => Ok(Value::Boolean(!right.is_truthy())),
            _ => unreachable!("parser never emits a Unary node with this operator"),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, JmplError> {
        let left = self.evaluate(left)?;
        match op.kind {
            TokenKind::Or => {
                if left.is_truthy() {
                    return Ok(left);
                }
            }
            TokenKind::And => {
                if !left.is_truthy() {
                    return Ok(left);
                }
            }
            _ => unreachable!("parser never emits a Logical node with this operator"),
        }
        self.evaluate(right)
    }

    fn numeric_operands(&self, left: &Value, right: &Value, op: &Token) -> Result<(f64, f64), JmplError> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
            _ => Err(JmplError::runtime(op, ErrorKind::Type, "Operands must be numbers")),
        }
    }

    fn evaluate_binary(&self, left: &Value, op: &Token, right: &Value) -> Result<Value, JmplError> {
        use TokenKind::*;
        match op.kind {
            EqualEqual => Ok(Value::Boolean(left == right)),
            NotEqual => Ok(Value::Boolean(left != right)),
            Less | LessEqual | Greater | GreaterEqual => {
                let (a, b) = self.numeric_operands(left, right, op)?;
                let result = match op.kind {
                    Less => a < b,
                    LessEqual => a <= b,
                    Greater => a > b,
                    GreaterEqual => a >= b,
                    _ => unreachable!(),
                };
                Ok(Value::Boolean(result))
            }
            Minus => {
                let (a, b) = self.numeric_operands(left, right, op)?;
                Ok(Value::Number(a - b))
            }
            Asterisk => {
                let (a, b) = self.numeric_operands(left, right, op)?;
                Ok(Value::Number(a * b))
            }
            Caret => {
                let (a, b) = self.numeric_operands(left, right, op)?;
                Ok(Value::Number(a.powf(b)))
            }
            Slash => {
                let (a, b) = self.numeric_operands(left, right, op)?;
                if b == 0.0 {
                    return Err(JmplError::runtime(op, ErrorKind::ZeroDivision, "Division by zero"));
                }
                Ok(Value::Number(a / b))
            }
            Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!("{left}{right}"))),
                _ => Err(JmplError::runtime(op, ErrorKind::Type, "Operands must be numbers or strings")),
            },
            _ => unreachable!("parser never emits a Binary node with this operator"),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> Result<Value, JmplError> {
        let callee = self.evaluate(callee)?;
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.evaluate(arg)?);
        }

        let Value::Callable(callable) = callee else {
            return Err(JmplError::runtime(paren, ErrorKind::Syntax, "Only functions can be called"));
        };

        if arg_values.len() != callable.arity() {
            return Err(JmplError::runtime(
                paren,
                ErrorKind::Argument,
                format!("Expected {} arguments but got {}", callable.arity(), arg_values.len()),
            ));
        }

        callable.call(self, arg_values)
    }

    fn evaluate_summation(&mut self, name: &Token, upper: &Expr, lower: &Stmt, summand: &Expr) -> Result<Value, JmplError> {
        let upper_value = self.evaluate(upper)?;
        let upper_n = require_integer(&upper_value, name, "Upper bound must be an integer")?;

        let previous_env = Rc::clone(&self.environment);
        let pushes_scope = matches!(lower, Stmt::Let { .. });
        if pushes_scope {
            self.environment = Environment::with_parent(Rc::clone(&previous_env));
        }

        let result = self.run_summation(name, lower, summand, upper_n);

        self.environment = previous_env;
        result
    }

    fn run_summation(&mut self, name: &Token, lower: &Stmt, summand: &Expr, upper_n: f64) -> Result<Value, JmplError> {
        let loop_name = match lower {
            Stmt::Let { name, .. } => name.clone(),
            Stmt::Expression(Expr::Assign { name, .. }) => name.clone(),
            _ => unreachable!("parser only produces a Let or Assign-expression lower bound"),
        };

        self.execute_stmt(lower)?;

        let initial = self
            .environment
            .get(&loop_name.lexeme)
            .ok_or_else(|| JmplError::runtime(&loop_name, ErrorKind::Variable, format!("Undefined variable '{}'", loop_name.lexeme)))?;
        let mut i = require_integer(&initial, name, "Lower bound must be an integer")?;

        let mut accumulator: Option<Value> = None;
        while i <= upper_n {
            let term = self.evaluate(summand)?;
            accumulator = Some(accumulate(accumulator, term, name)?);

            i += 1.0;
            // The increment is a synthetic write generated by the summation
            // itself, not by any AST `Assign` node, so it always goes
            // through the chain-walking `Environment::assign` rather than a
            // resolved distance.
            self.environment.assign(&loop_name.lexeme, Value::Number(i));
        }

        Ok(accumulator.unwrap_or(Value::Number(0.0)))
    }
}

fn accumulate(accumulator: Option<Value>, term: Value, name: &Token) -> Result<Value, JmplError> {
    match (accumulator, term) {
        (None, Value::Number(n)) => Ok(Value::Number(n)),
        (None, Value::String(s)) => Ok(Value::String(s)),
        (Some(Value::Number(acc)), Value::Number(n)) => Ok(Value::Number(acc + n)),
        (Some(Value::String(acc)), Value::String(s)) => Ok(Value::String(acc + &s)),
        (Some(_), _) => Err(JmplError::runtime(name, ErrorKind::Syntax, "Summand type must not change across iterations")),
        (None, _) => Err(JmplError::runtime(name, ErrorKind::Syntax, "Summand must be a number or a string")),
    }
}

fn require_integer(value: &Value, token: &Token, message: &str) -> Result<f64, JmplError> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n),
        _ => Err(JmplError::runtime(token, ErrorKind::Syntax, message)),
    }
}

fn native_clock(_args: &[Value]) -> Result<Value, JmplError> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is set after the unix epoch")
        .as_secs_f64();
    Ok(Value::Number(now))
}

/// An in-memory output sink shared by value, so tests can run a program
/// against the public API and then inspect exactly what it printed.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        SharedOutput(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("JMPL output is always valid UTF-8")
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    fn run(source: &str) -> Result<String, JmplError> {
        let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
        assert!(scan_errors.is_empty(), "{scan_errors:?}");
        let (statements, parse_errors) = Parser::parse(tokens);
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        let (locals, resolve_errors) = Resolver::resolve(&statements);
        assert!(resolve_errors.is_empty(), "{resolve_errors:?}");

        let out = SharedOutput::new();
        let mut interpreter = Interpreter::with_output(Box::new(out.clone()));
        interpreter.load_locals(locals);
        interpreter.interpret(&statements)?;
        Ok(out.contents())
    }

    #[test]
    fn arithmetic_and_output() {
        assert_eq!(run("out 1 + 2;").unwrap(), "3\n");
    }

    #[test]
    fn let_bindings_and_addition() {
        assert_eq!(run("let a = 1; let b = 2; out a + b;").unwrap(), "3\n");
    }

    #[test]
    fn recursive_fibonacci() {
        let source = "function fib(n) = if n < 2 then return n; else return fib(n-1) + fib(n-2); out fib(10);";
        assert_eq!(run(source).unwrap(), "55\n");
    }

    #[test]
    fn closures_keep_independent_captured_state() {
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
    fn division_by_zero_is_a_runtime_error() {
        let err = run("out 1/0;").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZeroDivision);
        assert!(!err.is_static());
    }

    #[test]
    fn string_concatenation_with_plus() {
        assert_eq!(run("out \"a\" + \"b\";").unwrap(), "ab\n");
    }

    #[test]
    fn short_circuit_or_returns_determining_value() {
        assert_eq!(run("out 1 or 2;").unwrap(), "1\n");
        assert_eq!(run("out false or 2;").unwrap(), "2\n");
    }

    #[test]
    fn while_loop_accumulates() {
        assert_eq!(run("let i = 0; let sum = 0; while i < 5 do (i := i + 1; sum := sum + i;); out sum;").unwrap(), "15\n");
    }
}
