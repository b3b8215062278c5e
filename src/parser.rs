use tracing::debug;

use crate::ast::{Expr, Stmt};
use crate::diag::{ParseError, ParseErrorKind};
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Output of [`parse`]: the statements that parsed cleanly, in source order, and the errors
/// reported for the ones that did not.
#[derive(Debug, PartialEq)]
pub struct Parsed {
    pub program: Vec<Stmt>,
    pub errors: Vec<ParseError>,
}

impl Parsed {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a whole program, recovering from syntax errors at statement boundaries.
pub fn parse(tokens: Vec<Token>) -> Parsed {
    Parser::new(tokens).parse_program()
}

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<ParseError>,
}

type ParseResult<T> = Result<T, ParseError>;

impl Parser {
    /// Creates a parser over `tokens`, appending the `Eof` terminator if it is missing.
    pub fn new(mut tokens: Vec<Token>) -> Parser {
        match tokens.last() {
            Some(last) if last.kind == TokenKind::Eof => (),
            last => {
                let line = last.map_or(1, |t| t.line);
                tokens.push(Token::eof(line));
            }
        }
        Parser {
            tokens,
            current: 0,
            errors: vec![],
        }
    }

    pub fn parse_program(mut self) -> Parsed {
        let mut program = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                program.push(stmt);
            }
        }
        Parsed {
            program,
            errors: self.errors,
        }
    }

    #[cfg(test)]
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.expression()
    }

    /// Parse one declaration.  On error, report it and skip to the next statement boundary.
    fn declaration(&mut self) -> Option<Stmt> {
        let result = match self.peek().kind {
            TokenKind::Var => self.var_decl(),
            _ => self.statement(),
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                debug!(error = %e, "parse error");
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    /// Parse variable declaration.
    /// Current token is `var`.
    fn var_decl(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let name = self.consume(TokenKind::Identifier, "variable name")?;
        let init = if self.matches(TokenKind::Equal) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "';' after variable declaration")?;
        Ok(Stmt::VarDecl(name, init))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Print => {
                self.advance();
                let expr = Box::new(self.expression()?);
                self.consume(TokenKind::Semicolon, "';' after value")?;
                Ok(Stmt::Print(expr))
            }
            TokenKind::LeftBrace => self.block(),
            TokenKind::If => {
                self.advance();
                self.consume(TokenKind::LeftParen, "'(' after 'if'")?;
                let cond = Box::new(self.expression()?);
                self.consume(TokenKind::RightParen, "')' after if condition")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.matches(TokenKind::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If(cond, then_branch, else_branch))
            }
            TokenKind::While => {
                self.advance();
                self.consume(TokenKind::LeftParen, "'(' after 'while'")?;
                let cond = Box::new(self.expression()?);
                self.consume(TokenKind::RightParen, "')' after condition")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While(cond, body))
            }
            TokenKind::For => self.for_stmt(),
            _ => self.expression_stmt(),
        }
    }

    fn for_stmt(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.consume(TokenKind::LeftParen, "'(' after 'for'")?;

        let initializer = match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::Var => Some(Box::new(self.var_decl()?)),
            _ => Some(Box::new(self.expression_stmt()?)),
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        self.consume(TokenKind::Semicolon, "';' after loop condition")?;

        let update = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        self.consume(TokenKind::RightParen, "')' after for clauses")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            initializer,
            condition,
            update,
            body,
        })
    }

    fn expression_stmt(&mut self) -> ParseResult<Stmt> {
        let expr = Box::new(self.expression()?);
        self.consume(TokenKind::Semicolon, "';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftBrace, "'{'")?;
        let mut stmts = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "'}' after block")?;
        Ok(Stmt::Block(stmts))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let lhs = self.ternary()?;
        if self.check(TokenKind::Equal) {
            let equals = self.advance();
            let rhs = self.assignment()?;
            if let Expr::Var(name) = lhs {
                Ok(Expr::Assign(name, Box::new(rhs)))
            } else {
                Err(ParseError::at(
                    &equals,
                    ParseErrorKind::InvalidAssignmentTarget,
                ))
            }
        } else {
            Ok(lhs)
        }
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        let cond = self.logic_or()?;
        if !self.matches(TokenKind::Question) {
            return Ok(cond);
        }
        let success = self.expression()?;
        self.consume(TokenKind::Colon, "':' in conditional expression")?;
        let failure = self.expression()?;
        Ok(Expr::Ternary(
            Box::new(cond),
            Box::new(success),
            Box::new(failure),
        ))
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.logic_and()?;
        while let Some(op) = self.match_any(&[TokenKind::Or]) {
            expr = Expr::Logical(op, Box::new(expr), Box::new(self.logic_and()?));
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while let Some(op) = self.match_any(&[TokenKind::And]) {
            expr = Expr::Logical(op, Box::new(expr), Box::new(self.equality()?));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while let Some(op) = self.match_any(&[TokenKind::EqualEqual, TokenKind::BangEqual]) {
            expr = Expr::Binary(op, Box::new(expr), Box::new(self.comparison()?));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while let Some(op) = self.match_any(&[
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ]) {
            expr = Expr::Binary(op, Box::new(expr), Box::new(self.term()?));
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while let Some(op) = self.match_any(&[TokenKind::Plus, TokenKind::Minus]) {
            expr = Expr::Binary(op, Box::new(expr), Box::new(self.factor()?));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while let Some(op) = self.match_any(&[TokenKind::Star, TokenKind::Slash]) {
            expr = Expr::Binary(op, Box::new(expr), Box::new(self.unary()?));
        }
        Ok(expr)
    }

    /// A prefix operator applies to a primary expression only, so `--1` does not parse.
    fn unary(&mut self) -> ParseResult<Expr> {
        if let Some(op) = self.match_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let operand = self.primary()?;
            return Ok(Expr::Unary(op, Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        // TODO: can we avoid cloning tokens?
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::True => Expr::Literal(Value::Bool(true)),
            TokenKind::False => Expr::Literal(Value::Bool(false)),
            TokenKind::Nil => Expr::Literal(Value::Nil),
            TokenKind::Number => {
                let n = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| ParseError::at(&token, ParseErrorKind::BadNumberLiteral))?;
                Expr::Literal(Value::Number(n))
            }
            TokenKind::String => {
                let body = token
                    .lexeme
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(token.lexeme.as_str());
                Expr::Literal(Value::String(body.to_string()))
            }
            TokenKind::Identifier => Expr::Var(token),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "')' after expression")?;
                return Ok(Expr::Group(Box::new(expr)));
            }
            _ => {
                return Err(ParseError::at(
                    &token,
                    ParseErrorKind::ExpectedExpression,
                ))
            }
        };
        self.advance();
        Ok(expr)
    }

    /// Discard tokens until the start of what is likely the next statement.
    fn synchronize(&mut self) {
        let mut skipped = self.advance();
        while !self.is_at_end() {
            if skipped.kind == TokenKind::Semicolon || self.peek().kind.starts_statement() {
                break;
            }
            skipped = self.advance();
        }
        debug!(line = self.peek().line, "resynchronized");
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Move past the current token and return it.  Stays on `Eof`.
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        self.match_any(&[kind]).is_some()
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        if kinds.contains(&self.peek().kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn consume(&mut self, expected: TokenKind, what: &'static str) -> ParseResult<Token> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(ParseError::at(self.peek(), ParseErrorKind::Expected(what)))
        }
    }
}
