use crate::token::Token;
use crate::value::Value;

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Expr(Box<Expr>),
    Print(Box<Expr>),
    VarDecl(Token, Option<Box<Expr>>),
    Block(Vec<Stmt>),
    If(Box<Expr>, Box<Stmt>, Option<Box<Stmt>>),
    While(Box<Expr>, Box<Stmt>),
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Box<Expr>>,
        update: Option<Box<Expr>>,
        body: Box<Stmt>,
    },
}

/// Operators keep their token so errors can point at them.
#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Literal(Value),
    Var(Token),
    Unary(Token, Box<Expr>),
    Binary(Token, Box<Expr>, Box<Expr>),
    /// `and` / `or`, evaluated lazily.
    Logical(Token, Box<Expr>, Box<Expr>),
    /// `condition ? success : failure`
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign(Token, Box<Expr>),
    Group(Box<Expr>),
}
