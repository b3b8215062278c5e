use std::io::prelude::*;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{Expr, Stmt};
use crate::diag::{RuntimeError, RuntimeErrorKind};
use crate::env::Env;
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Tree-walking evaluator.
///
/// Holds the active scope.  Entering a block swaps in a child scope for the duration of the
/// block; the enclosing scope is restored on every exit path, errors included.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
    env: Rc<Env>,
}

impl<'t, W: Write> Evaluator<'t, W> {
    pub fn new(output: &'t mut W) -> Evaluator<'t, W> {
        let globals = Env::new();
        Evaluator {
            output,
            env: globals.clone(),
            globals,
        }
    }

    /// Execute `program` in order, stopping at the first runtime error.
    ///
    /// Effects of statements executed before the failing one are kept.
    pub fn interpret(&mut self, program: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in program {
            if let Err(e) = self.execute(stmt) {
                debug!(error = %e, "runtime error");
                return Err(e);
            }
        }
        debug_assert!(Rc::ptr_eq(&self.env, &self.globals));
        Ok(())
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        trace!(?stmt, "execute");
        match stmt {
            Stmt::Expr(e) => {
                self.evaluate(e)?;
            }
            Stmt::Print(e) => {
                let v = self.evaluate(e)?;
                writeln!(self.output, "{}", v)?;
            }
            Stmt::VarDecl(name, init) => {
                let val = match init {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                self.env.define(&name.lexeme, val);
            }
            Stmt::Block(stmts) => {
                let scope = Env::with_parent(Some(self.env.clone()));
                self.execute_block(stmts, scope)?;
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.evaluate(cond)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }
            Stmt::While(cond, body) => {
                while self.evaluate(cond)?.is_truthy() {
                    self.execute(body)?;
                }
            }
            Stmt::For {
                initializer,
                condition,
                update,
                body,
            } => {
                // The initializer binds in the enclosing scope, like a preceding statement.
                if let Some(init) = initializer {
                    self.execute(init)?;
                }
                loop {
                    if let Some(cond) = condition {
                        if !self.evaluate(cond)?.is_truthy() {
                            break;
                        }
                    }
                    self.execute(body)?;
                    if let Some(update) = update {
                        self.evaluate(update)?;
                    }
                }
            }
        };
        Ok(())
    }

    fn execute_block(&mut self, stmts: &[Stmt], scope: Rc<Env>) -> Result<(), RuntimeError> {
        let mut inner = EnteredScope::enter(self, scope);
        for stmt in stmts {
            inner.execute(stmt)?;
        }
        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Var(name) => self.env.get(name),
            Expr::Group(e) => self.evaluate(e),
            Expr::Assign(name, rhs) => {
                let val = self.evaluate(rhs)?;
                self.env.assign(name, val.clone())?;
                Ok(val)
            }
            Expr::Logical(op, lhs, rhs) => {
                let l = self.evaluate(lhs)?;
                let short_circuit = match op.kind {
                    TokenKind::Or => l.is_truthy(),
                    TokenKind::And => !l.is_truthy(),
                    _ => unreachable!("no logical rule for '{}'", op),
                };
                if short_circuit {
                    Ok(l)
                } else {
                    self.evaluate(rhs)
                }
            }
            Expr::Ternary(cond, success, failure) => {
                if self.evaluate(cond)?.is_truthy() {
                    self.evaluate(success)
                } else {
                    self.evaluate(failure)
                }
            }
            Expr::Unary(op, operand) => {
                let v = self.evaluate(operand)?;
                unary(op, v)
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = self.evaluate(lhs)?;
                let r = self.evaluate(rhs)?;
                binary(op, l, r)
            }
        }
    }
}

fn unary(op: &Token, operand: Value) -> Result<Value, RuntimeError> {
    match op.kind {
        TokenKind::Minus => {
            if let Value::Number(n) = operand {
                Ok(Value::Number(-n))
            } else {
                Err(RuntimeError::at(op, RuntimeErrorKind::NumberOperand))
            }
        }
        TokenKind::Bang => Ok(Value::Bool(!operand.is_truthy())),
        _ => unreachable!("no unary rule for '{}'", op),
    }
}

fn binary(op: &Token, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    let val = match op.kind {
        TokenKind::Plus => match (lhs, rhs) {
            (Value::Number(l), Value::Number(r)) => Value::Number(l + r),
            (Value::String(l), Value::String(r)) => Value::String(l + &r),
            _ => return Err(RuntimeError::at(op, RuntimeErrorKind::AddOperands)),
        },
        TokenKind::Minus => {
            let (l, r) = number_operands(op, &lhs, &rhs)?;
            Value::Number(l - r)
        }
        TokenKind::Star => {
            let (l, r) = number_operands(op, &lhs, &rhs)?;
            Value::Number(l * r)
        }
        TokenKind::Slash => {
            let (l, r) = number_operands(op, &lhs, &rhs)?;
            if r == 0.0 {
                return Err(RuntimeError::at(op, RuntimeErrorKind::DivByZero));
            }
            Value::Number(l / r)
        }
        TokenKind::Less => {
            let (l, r) = number_operands(op, &lhs, &rhs)?;
            Value::Bool(l < r)
        }
        TokenKind::LessEqual => {
            let (l, r) = number_operands(op, &lhs, &rhs)?;
            Value::Bool(l <= r)
        }
        TokenKind::Greater => {
            let (l, r) = number_operands(op, &lhs, &rhs)?;
            Value::Bool(l > r)
        }
        TokenKind::GreaterEqual => {
            let (l, r) = number_operands(op, &lhs, &rhs)?;
            Value::Bool(l >= r)
        }
        TokenKind::EqualEqual => Value::Bool(lhs == rhs),
        TokenKind::BangEqual => Value::Bool(lhs != rhs),
        _ => unreachable!("no binary rule for '{}'", op),
    };
    Ok(val)
}

fn number_operands(op: &Token, lhs: &Value, rhs: &Value) -> Result<(f64, f64), RuntimeError> {
    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(RuntimeError::at(op, RuntimeErrorKind::NumberOperands)),
    }
}

/// Evaluator running inside a child scope.  Dropping it reinstates the enclosing scope.
struct EnteredScope<'e, 't, W: Write> {
    evaluator: &'e mut Evaluator<'t, W>,
    enclosing: Rc<Env>,
}

impl<'e, 't, W: Write> EnteredScope<'e, 't, W> {
    fn enter(evaluator: &'e mut Evaluator<'t, W>, scope: Rc<Env>) -> Self {
        trace!("push scope");
        let enclosing = mem::replace(&mut evaluator.env, scope);
        EnteredScope {
            evaluator,
            enclosing,
        }
    }
}

impl<W: Write> Drop for EnteredScope<'_, '_, W> {
    fn drop(&mut self) {
        mem::swap(&mut self.evaluator.env, &mut self.enclosing);
        trace!("pop scope");
    }
}

impl<'t, W: Write> Deref for EnteredScope<'_, 't, W> {
    type Target = Evaluator<'t, W>;

    fn deref(&self) -> &Self::Target {
        &*self.evaluator
    }
}

impl<W: Write> DerefMut for EnteredScope<'_, '_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::scanner::scan;

    fn op(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, 1, lexeme)
    }

    fn lit(v: Value) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    fn num(n: f64) -> Box<Expr> {
        lit(Value::Number(n))
    }

    fn string(s: &str) -> Box<Expr> {
        lit(Value::String(s.to_string()))
    }

    fn bin(kind: TokenKind, lexeme: &str, lhs: Box<Expr>, rhs: Box<Expr>) -> Expr {
        Expr::Binary(op(kind, lexeme), lhs, rhs)
    }

    fn eval_expr(expr: &Expr) -> Result<Value, RuntimeError> {
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out);
        let val = evaluator.evaluate(expr)?;
        assert!(out.is_empty());
        Ok(val)
    }

    fn fault(r: Result<Value, RuntimeError>) -> RuntimeErrorKind {
        match r {
            Err(RuntimeError::Fault { kind, .. }) => kind,
            r => panic!("unexpected output: {:?}", r),
        }
    }

    /// Run source text, returning what was printed and the runtime error, if any.
    fn run(input: &str) -> (String, Option<RuntimeError>) {
        let parsed = parse(scan(input).tokens);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out);
        let res = evaluator.interpret(&parsed.program);
        assert!(Rc::ptr_eq(&evaluator.env, &evaluator.globals));
        let output = String::from_utf8(out).expect("error while converting output");
        (output, res.err())
    }

    fn run_ok(input: &str) -> String {
        let (output, err) = run(input);
        if let Some(e) = err {
            panic!("unexpected error: {}", e);
        }
        output
    }

    #[test]
    fn unary_minus() -> Result<(), RuntimeError> {
        for n in [0.0, 1.0, -2.5, 1e10] {
            assert_eq!(
                eval_expr(&Expr::Unary(op(TokenKind::Minus, "-"), num(n)))?,
                Value::Number(-n)
            );
        }
        Ok(())
    }

    #[test]
    fn unary_minus_on_non_number() {
        assert_eq!(
            fault(eval_expr(&Expr::Unary(
                op(TokenKind::Minus, "-"),
                lit(Value::Bool(true))
            ))),
            RuntimeErrorKind::NumberOperand
        );
    }

    #[test]
    fn logical_not_uses_truthiness() -> Result<(), RuntimeError> {
        let cases = [
            (Value::Nil, true),
            (Value::Bool(false), true),
            (Value::Bool(true), false),
            (Value::Number(0.0), false),
            (Value::String(String::new()), false),
        ];
        for (v, expected) in cases {
            assert_eq!(
                eval_expr(&Expr::Unary(op(TokenKind::Bang, "!"), lit(v)))?,
                Value::Bool(expected)
            );
        }
        Ok(())
    }

    #[test]
    fn addition() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&bin(TokenKind::Plus, "+", num(1.0), num(2.0)))?,
            Value::Number(3.0)
        );
        assert_eq!(
            eval_expr(&bin(TokenKind::Plus, "+", string("a"), string("b")))?,
            Value::String("ab".to_string())
        );
        Ok(())
    }

    #[test]
    fn addition_of_mixed_types() {
        assert_eq!(
            fault(eval_expr(&bin(TokenKind::Plus, "+", num(1.0), string("a")))),
            RuntimeErrorKind::AddOperands
        );
        assert_eq!(
            fault(eval_expr(&bin(TokenKind::Plus, "+", string("a"), num(1.0)))),
            RuntimeErrorKind::AddOperands
        );
        assert_eq!(
            fault(eval_expr(&bin(
                TokenKind::Plus,
                "+",
                lit(Value::Nil),
                lit(Value::Nil)
            ))),
            RuntimeErrorKind::AddOperands
        );
    }

    #[test]
    fn arithmetic() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&bin(TokenKind::Minus, "-", num(1.0), num(3.0)))?,
            Value::Number(-2.0)
        );
        assert_eq!(
            eval_expr(&bin(TokenKind::Star, "*", num(4.0), num(2.5)))?,
            Value::Number(10.0)
        );
        assert_eq!(
            eval_expr(&bin(TokenKind::Slash, "/", num(1.0), num(2.0)))?,
            Value::Number(0.5)
        );
        Ok(())
    }

    #[test]
    fn arithmetic_on_non_numbers() {
        assert_eq!(
            fault(eval_expr(&bin(TokenKind::Star, "*", string("a"), num(3.0)))),
            RuntimeErrorKind::NumberOperands
        );
    }

    #[test]
    fn division_by_zero() {
        for numerator in [6.0, 0.0, -1.0] {
            assert_eq!(
                fault(eval_expr(&bin(
                    TokenKind::Slash,
                    "/",
                    num(numerator),
                    num(0.0)
                ))),
                RuntimeErrorKind::DivByZero
            );
        }
    }

    #[test]
    fn comparison() -> Result<(), RuntimeError> {
        let cases = [
            (TokenKind::Less, "<", 1.0, 2.0, true),
            (TokenKind::Less, "<", 2.0, 2.0, false),
            (TokenKind::LessEqual, "<=", 2.0, 2.0, true),
            (TokenKind::Greater, ">", 3.0, 2.0, true),
            (TokenKind::GreaterEqual, ">=", 1.0, 2.0, false),
        ];
        for (kind, lexeme, l, r, expected) in cases {
            assert_eq!(
                eval_expr(&bin(kind, lexeme, num(l), num(r)))?,
                Value::Bool(expected)
            );
        }
        Ok(())
    }

    #[test]
    fn comparison_of_strings_is_an_error() {
        assert_eq!(
            fault(eval_expr(&bin(TokenKind::Less, "<", string("a"), string("b")))),
            RuntimeErrorKind::NumberOperands
        );
    }

    #[test]
    fn equality_is_type_safe() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&bin(TokenKind::EqualEqual, "==", num(1.0), string("1")))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&bin(
                TokenKind::EqualEqual,
                "==",
                lit(Value::Nil),
                lit(Value::Nil)
            ))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&bin(
                TokenKind::EqualEqual,
                "==",
                lit(Value::Bool(false)),
                lit(Value::Nil)
            ))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&bin(TokenKind::BangEqual, "!=", string("a"), string("a")))?,
            Value::Bool(false)
        );
        Ok(())
    }

    #[test]
    fn print_stmt() {
        assert_eq!(
            run_ok("print 42; print 1.5; print \"hi\"; print nil; print 1 == 1;"),
            "42\n1.5\nhi\nnil\ntrue\n"
        );
    }

    #[test]
    fn logical_operators_return_operand() {
        assert_eq!(
            run_ok("print nil or \"yes\"; print 0 or 1; print nil and 1; print 1 and 2;"),
            "yes\n0\nnil\n2\n"
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(
            run_ok("var a = 1; true or (a = 2); false and (a = 3); print a;"),
            "1\n"
        );
    }

    #[test]
    fn ternary_evaluates_one_branch() {
        assert_eq!(
            run_ok("var a = 0; var b = 0; true ? (a = 1) : (b = 1); print a; print b;"),
            "1\n0\n"
        );
        assert_eq!(run_ok("print nil ? 1 : 2;"), "2\n");
    }

    #[test]
    fn assignment_is_an_expression() {
        assert_eq!(run_ok("var a; var b; a = b = 3; print a; print b;"), "3\n3\n");
    }

    #[test]
    fn redeclaration_overwrites() {
        assert_eq!(run_ok("var a = 1; var a; print a;"), "nil\n");
    }

    #[test]
    fn assignment_to_undeclared_variable() {
        match run("y = 1;") {
            (
                _,
                Some(RuntimeError::Fault {
                    kind: RuntimeErrorKind::UnknownAssignTarget(name),
                    ..
                }),
            ) if name == "y" => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn block_shadows_then_restores() {
        assert_eq!(
            run_ok("var x = 1; { var x = 2; print x; } print x;"),
            "2\n1\n"
        );
    }

    #[test]
    fn block_declarations_do_not_leak() {
        match run("{ var inner = 1; } print inner;") {
            (
                _,
                Some(RuntimeError::Fault {
                    kind: RuntimeErrorKind::UndefinedVar(name),
                    ..
                }),
            ) if name == "inner" => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn error_in_nested_block_restores_global_scope() {
        let parsed = parse(scan("var a = 1; { var a = 2; { print a; a = a / 0; } }").tokens);
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out);
        match evaluator.interpret(&parsed.program) {
            Err(RuntimeError::Fault {
                kind: RuntimeErrorKind::DivByZero,
                ..
            }) => (),
            r => panic!("unexpected output: {:?}", r),
        }
        assert!(Rc::ptr_eq(&evaluator.env, &evaluator.globals));
        let a = op(TokenKind::Identifier, "a");
        assert_eq!(evaluator.env.get(&a).ok(), Some(Value::Number(1.0)));
        assert_eq!(out, b"2\n");
    }

    #[test]
    fn first_runtime_error_stops_execution() {
        let (output, err) = run("print 1; print -\"x\"; print 2;");
        assert_eq!(output, "1\n");
        assert_eq!(
            err.as_ref().map(|e| e.to_string()),
            Some("On line 1 at '-': Operand must be a number.".to_string())
        );
    }

    #[test]
    fn if_else() {
        assert_eq!(
            run_ok("var foo; if (2 + 2 == 4) foo = 1; else foo = 2; print foo;"),
            "1\n"
        );
        assert_eq!(
            run_ok("var foo; if (2 + 2 != 4) foo = 1; else foo = 2; print foo;"),
            "2\n"
        );
        assert_eq!(run_ok("if (nil) print 1;"), "");
    }

    #[test]
    fn while_loop() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(run_ok("while (false) print 1;"), "");
    }

    #[test]
    fn for_loop() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn for_initializer_binds_in_enclosing_scope() {
        assert_eq!(
            run_ok("for (var i = 0; i < 2; i = i + 1) {} print i;"),
            "2\n"
        );
    }

    #[test]
    fn for_loop_without_clauses() {
        assert_eq!(
            run_ok("var i = 0; for (; i < 2;) { i = i + 1; } print i;"),
            "2\n"
        );
    }

    #[test]
    fn for_body_block_gets_fresh_scope_each_iteration() {
        assert_eq!(
            run_ok("for (var i = 0; i < 2; i = i + 1) { var j; print j; j = i; }"),
            "nil\nnil\n"
        );
    }

    #[test]
    fn rerun_gives_same_output() {
        let parsed = parse(scan("var a = 1; { var b = a + 1; print b; }").tokens);
        let mut outputs = vec![];
        for _ in 0..2 {
            let mut out: Vec<u8> = Vec::new();
            Evaluator::new(&mut out)
                .interpret(&parsed.program)
                .expect("runtime error");
            outputs.push(out);
        }
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[0], b"2\n");
    }
}
