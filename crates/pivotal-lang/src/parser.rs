use pivotal_solver::ConstraintOp;
use thiserror::Error;

use crate::ast::*;
use crate::lexer::{Lexer, Span, Token, TokenKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Comments may appear anywhere; newlines only between statements
    fn skip_comments(&mut self) {
        while self.peek_kind() == TokenKind::Comment {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Comment
        ) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(t) if t.kind != TokenKind::Eof => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("{:?}", t.kind),
                span: t.span,
            },
            _ => ParseError::UnexpectedEof,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        self.skip_comments();
        match self.current().cloned() {
            Some(t) if t.kind == kind => {
                self.advance();
                Ok(t)
            }
            _ => Err(self.unexpected(&format!("{:?}", kind))),
        }
    }

    /// End of the previously consumed token
    fn last_end(&self, fallback: Span) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.end)
            .unwrap_or(fallback.end)
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        loop {
            self.skip_separators();

            let statement = match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Var => Statement::Variables(self.parse_variables()?),
                TokenKind::Maximize => Statement::Objective(self.parse_objective()?),
                TokenKind::Ident | TokenKind::Number | TokenKind::Plus | TokenKind::Minus => {
                    Statement::Constraint(self.parse_constraint()?)
                }
                _ => return Err(self.unexpected("var, maximize, or a constraint")),
            };
            statements.push(statement);
            self.expect_statement_end()?;
        }

        Ok(Program { statements })
    }

    fn expect_statement_end(&mut self) -> Result<(), ParseError> {
        self.skip_comments();
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn parse_variables(&mut self) -> Result<VariableDecl, ParseError> {
        let start = self.expect(TokenKind::Var)?.span;

        let mut names = Vec::new();
        loop {
            let token = self.expect(TokenKind::Ident)?;
            names.push(Ident {
                span: token.span,
                name: token.text,
            });
            self.skip_comments();
            if self.peek_kind() != TokenKind::Comma {
                break;
            }
            self.advance();
        }

        Ok(VariableDecl {
            span: Span::new(start.start, self.last_end(start)),
            names,
        })
    }

    fn parse_objective(&mut self) -> Result<Objective, ParseError> {
        let start = self.expect(TokenKind::Maximize)?.span;

        self.skip_comments();
        if self.peek_kind() == TokenKind::Colon {
            self.advance();
        }

        let terms = self.parse_linear_expr()?;

        Ok(Objective {
            span: Span::new(start.start, self.last_end(start)),
            terms,
        })
    }

    fn parse_constraint(&mut self) -> Result<ConstraintDecl, ParseError> {
        self.skip_comments();
        let start = self.current().map(|t| t.span).unwrap_or(Span::new(0, 0));

        let terms = self.parse_linear_expr()?;

        self.skip_comments();
        let op = match self.peek_kind() {
            TokenKind::Le => ConstraintOp::Le,
            TokenKind::Ge => ConstraintOp::Ge,
            TokenKind::Eq => ConstraintOp::Eq,
            _ => return Err(self.unexpected("<=, >=, or =")),
        };
        self.advance();

        let rhs = self.parse_signed_number()?;

        Ok(ConstraintDecl {
            span: Span::new(start.start, self.last_end(start)),
            terms,
            op,
            rhs,
        })
    }

    /// term (('+' | '-') term)*, with an optional leading sign
    fn parse_linear_expr(&mut self) -> Result<Vec<TermExpr>, ParseError> {
        let mut terms = Vec::new();

        self.skip_comments();
        let mut sign = match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                -1.0
            }
            TokenKind::Plus => {
                self.advance();
                1.0
            }
            _ => 1.0,
        };

        loop {
            terms.push(self.parse_term(sign)?);

            self.skip_comments();
            sign = match self.peek_kind() {
                TokenKind::Plus => 1.0,
                TokenKind::Minus => -1.0,
                _ => break,
            };
            self.advance();
        }

        Ok(terms)
    }

    /// [number ['*']] ident
    fn parse_term(&mut self, sign: f64) -> Result<TermExpr, ParseError> {
        self.skip_comments();
        let start = self.current().map(|t| t.span).unwrap_or(Span::new(0, 0));

        let mut coefficient = 1.0;
        if self.peek_kind() == TokenKind::Number {
            let token = self.expect(TokenKind::Number)?;
            coefficient = parse_number(&token.text)?;
            self.skip_comments();
            if self.peek_kind() == TokenKind::Star {
                self.advance();
            }
        }

        let token = self.expect(TokenKind::Ident)?;

        Ok(TermExpr {
            span: start.merge(token.span),
            coefficient: sign * coefficient,
            variable: Ident {
                span: token.span,
                name: token.text,
            },
        })
    }

    fn parse_signed_number(&mut self) -> Result<f64, ParseError> {
        self.skip_comments();
        let sign = if self.peek_kind() == TokenKind::Minus {
            self.advance();
            -1.0
        } else {
            1.0
        };
        let token = self.expect(TokenKind::Number)?;
        Ok(sign * parse_number(&token.text)?)
    }
}

fn parse_number(text: &str) -> Result<f64, ParseError> {
    text.parse()
        .map_err(|_| ParseError::InvalidNumber(text.to_string()))
}
