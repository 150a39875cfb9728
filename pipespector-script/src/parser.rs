//! Recursive-descent parser.
//!
//! ```text
//! program := stmt (';' stmt)* ';'?
//! stmt    := slot '=' expr
//! expr    := term ('+' term)*
//! term    := slot | string | call | '(' expr ')'
//! call    := ident '(' expr (',' expr)* ')'
//! ```

use crate::ast::{Assignment, Expr, Function};
use crate::error::ScriptError;
use crate::lexer::{Spanned, Token, tokenize};
use pipespector_core::SlotName;

pub fn parse(src: &str) -> Result<Vec<Assignment>, ScriptError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end_column: src.chars().count() + 1,
    };

    let mut program = Vec::new();
    while !parser.at_end() {
        program.push(parser.statement()?);
        if !parser.at_end() {
            parser.expect(&Token::Semi, "';' between statements")?;
        }
    }

    if program.is_empty() {
        return Err(ScriptError::Empty);
    }
    Ok(program)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end_column: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.column)
            .unwrap_or(self.end_column)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, want: &Token, what: &str) -> Result<(), ScriptError> {
        if self.peek() == Some(want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(ScriptError::syntax(self.column(), format!("expected {}", what)))
        }
    }

    fn statement(&mut self) -> Result<Assignment, ScriptError> {
        let column = self.column();
        let target = match self.next() {
            Some(Token::Ident(name)) => {
                SlotName::parse(&name).ok_or(ScriptError::UnknownSlot(name))?
            }
            _ => return Err(ScriptError::syntax(column, "expected a slot to assign")),
        };
        self.expect(&Token::Assign, "'='")?;
        let expr = self.expr()?;
        Ok(Assignment::new(target, expr))
    }

    fn expr(&mut self) -> Result<Expr, ScriptError> {
        let mut parts = vec![self.term()?];
        while self.peek() == Some(&Token::Plus) {
            self.pos += 1;
            parts.push(self.term()?);
        }

        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            Ok(Expr::Concat(parts))
        }
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let column = self.column();
        match self.next() {
            Some(Token::Str(bytes)) => Ok(Expr::Literal(bytes)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    return self.call(name);
                }
                SlotName::parse(&name)
                    .map(Expr::Slot)
                    .ok_or(ScriptError::UnknownSlot(name))
            }
            _ => Err(ScriptError::syntax(column, "expected a value")),
        }
    }

    /// Called with the opening parenthesis already consumed.
    fn call(&mut self, name: String) -> Result<Expr, ScriptError> {
        let function = Function::lookup(&name).ok_or(ScriptError::UnknownFunction(name))?;

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            args.push(self.expr()?);
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                args.push(self.expr()?);
            }
        }
        self.expect(&Token::RParen, "')'")?;

        if args.len() != function.arity() {
            return Err(ScriptError::Arity {
                function: function.name(),
                expected: function.arity(),
                got: args.len(),
            });
        }
        Ok(Expr::Call { function, args })
    }
}
