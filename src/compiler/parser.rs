//! The Parser module takes a token stream (Vec<Token>) from the lexer
//! and converts it into an AST.
//!
//! Statements are parsed by recursive descent with a single token of
//! lookahead; expressions are parsed by precedence climbing over the tiers
//! in [`Precedence`]. The first error aborts the parse.

use super::ast::*;
use super::error::{CompileError, CompileResult};
use super::lexer::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    /// Run the parser, consuming itself and returning the program.
    pub fn run(mut self) -> CompileResult<Program> {
        let mut program = Vec::new();
        while self.peek().is_some() {
            program.push(self.statement()?);
        }
        Ok(program)
    }

    /// statement = declaration | assignment | exit | raw-asm | loop
    ///
    /// Dispatch peeks a single token; a leading identifier means assignment.
    fn statement(&mut self) -> CompileResult<Statement> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::O) => self.declaration(),
            Some(TokenKind::Otawa) => self.exit_statement(),
            Some(TokenKind::Asen) => self.raw_asm(),
            Some(TokenKind::Tenpo) => self.tenpo_loop(),
            Some(TokenKind::Name(_)) => self.assignment(),
            _ => Err(self.syntax("a statement")),
        }
    }

    /// declaration = "o" name "li" type "=" expression ";"
    fn declaration(&mut self) -> CompileResult<Statement> {
        self.advance(); // o
        let name = self.name("a name after 'o'")?;
        self.expect(TokenKind::Li, "'li' after the declared name")?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::Eq, "'=' after the type")?;
        let value = self.expression(0)?;
        self.expect(TokenKind::Semi, "';' after the declaration")?;
        Ok(Statement::Declare { name, ty, value })
    }

    /// type = "awen"? ("nanpa" | "linja") "awen"?
    ///
    /// The mutability marker may sit on either side of the base type.
    fn parse_type(&mut self) -> CompileResult<Type> {
        let mut awen = self.eat(&TokenKind::Awen);
        let base = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Nanpa) => BaseType::Nanpa,
            Some(TokenKind::Linja) => BaseType::Linja,
            _ => return Err(self.syntax("a type after 'li'")),
        };
        self.advance();
        if self.eat(&TokenKind::Awen) {
            awen = true;
        }
        Ok(Type { base, awen })
    }

    /// assignment = name "=" expression ";"
    fn assignment(&mut self) -> CompileResult<Statement> {
        let name = self.name("a name")?;
        self.expect(TokenKind::Eq, "'=' after the assignment target")?;
        let value = self.expression(0)?;
        self.expect(TokenKind::Semi, "';' after the assignment")?;
        Ok(Statement::Assign { name, value })
    }

    /// exit = "otawa" expression ";"
    fn exit_statement(&mut self) -> CompileResult<Statement> {
        self.advance(); // otawa
        let code = self.expression(0)?;
        self.expect(TokenKind::Semi, "';' after otawa")?;
        Ok(Statement::Exit(code))
    }

    /// raw-asm = "asen" string-literal ";"
    ///
    /// The operand runs through the general expression parser and is shape
    /// checked afterwards: anything but a bare string literal is rejected.
    fn raw_asm(&mut self) -> CompileResult<Statement> {
        self.advance(); // asen
        let line = self.line();
        let expr = self.expression(0)?;
        let text = match expr {
            Expression::Term(Term::Str(text)) => text,
            _ => {
                return Err(CompileError::Syntax {
                    message: "expected a string literal after 'asen'".to_owned(),
                    line,
                })
            }
        };
        self.expect(TokenKind::Semi, "';' after asen")?;
        Ok(Statement::RawAsm(text))
    }

    /// loop = "tenpo" expression "la" "{"? statement* "}"? "pini"
    ///
    /// The braces are optional; `pini` alone also closes the body. Running
    /// out of tokens before `pini` is its own error, distinct from a plain
    /// syntax error.
    fn tenpo_loop(&mut self) -> CompileResult<Statement> {
        let line = self.line();
        self.advance(); // tenpo
        let condition = self.expression(0)?;
        self.expect(TokenKind::La, "'la' after the tenpo condition")?;
        let braced = self.eat(&TokenKind::OCurly);

        let mut body = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                None => return Err(CompileError::UnterminatedLoop { line }),
                Some(TokenKind::Pini) => {
                    self.advance();
                    break;
                }
                Some(TokenKind::CCurly) if braced => {
                    self.advance();
                    self.expect(TokenKind::Pini, "'pini' after '}'")?;
                    break;
                }
                _ => body.push(self.statement()?),
            }
        }
        Ok(Statement::Loop { condition, body })
    }

    /// expression = term (operator expression)*
    ///
    /// Precedence climbing: after consuming an operator, the right-hand side
    /// is parsed with a minimum precedence one above the operator's own, so
    /// operators of the same tier fold to the left.
    fn expression(&mut self, min_prec: u8) -> CompileResult<Expression> {
        let mut lhs = Expression::Term(self.term()?);

        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Fslash) => BinOp::Div,
                Some(TokenKind::Gt) => BinOp::Gt,
                Some(TokenKind::Deq) => BinOp::Eq,
                Some(TokenKind::Lt) => BinOp::Lt,
                _ => break,
            };
            let prec = op.precedence();
            if (prec as u8) < min_prec {
                break;
            }
            self.advance();

            let rhs = self.expression(prec as u8 + 1)?;
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    /// term = number | name | string-literal
    fn term(&mut self) -> CompileResult<Term> {
        let line = self.line();
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::Number(text)) => {
                self.advance();
                let value = text.parse::<i64>().map_err(|_| CompileError::Syntax {
                    message: format!("number '{}' is out of range", text),
                    line,
                })?;
                Ok(Term::Number(value))
            }
            Some(TokenKind::Name(name)) => {
                self.advance();
                Ok(Term::Name(name))
            }
            Some(TokenKind::Str(text)) => {
                self.advance();
                Ok(Term::Str(text))
            }
            _ => Err(self.syntax("a term")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Line of the current token, falling back to the last line of input.
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    /// Consume the current token if it matches `kind` exactly.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> CompileResult<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.syntax(what))
        }
    }

    fn syntax(&self, what: &str) -> CompileError {
        let got = match self.peek() {
            Some(token) => format!(", got {}", token.kind),
            None => ", got end of input".to_owned(),
        };
        CompileError::Syntax {
            message: format!("expected {}{}", what, got),
            line: self.line(),
        }
    }

    /// Consume a `Name` token and return its text.
    fn name(&mut self, what: &str) -> CompileResult<String> {
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::Name(name)) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.syntax(what)),
        }
    }
}
