//! Left-to-right parser for the boolean query language.
//!
//! Operators are combined strictly in reading order; parenthesized
//! groups are kept as `Expr::Group` so that priority folding can tell
//! them apart from the surrounding chain. `IN` wraps everything parsed
//! so far in the current group.

use crate::core::error::{FedError, Result};
use crate::core::query::ast::Expr;
use crate::core::query::lexer::{tokenize, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolOp {
    And,
    Or,
    Except,
}

enum Step {
    Operator(BoolOp),
    Restrict,
    Adjacent,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source_len: usize,
}

/// Parse a query string into a raw (unfolded) expression tree
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(FedError::parse(0, "empty query"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        source_len: source.len(),
    };
    let expr = parser.parse_chain()?;

    if let Some(token) = parser.peek() {
        return Err(FedError::parse(
            token.position,
            "unexpected closing parenthesis",
        ));
    }
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn end_position(&self) -> usize {
        self.source_len
    }

    fn parse_chain(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_operand()?;

        loop {
            let step = match self.peek().map(|t| &t.kind) {
                None | Some(TokenKind::RParen) => break,
                Some(TokenKind::And) => Step::Operator(BoolOp::And),
                Some(TokenKind::Or) => Step::Operator(BoolOp::Or),
                Some(TokenKind::Except) => Step::Operator(BoolOp::Except),
                Some(TokenKind::In) => Step::Restrict,
                Some(_) => Step::Adjacent,
            };

            match step {
                Step::Operator(op) => {
                    self.next();
                    let rhs = self.parse_operand()?;
                    lhs = combine(op, lhs, rhs);
                }
                Step::Restrict => {
                    self.next();
                    let fields = self.parse_field_list()?;
                    lhs = Expr::In {
                        expr: Box::new(lhs),
                        fields,
                    };
                }
                Step::Adjacent => {
                    let rhs = self.parse_operand()?;
                    lhs = combine(BoolOp::And, lhs, rhs);
                }
            }
        }

        Ok(lhs)
    }

    fn parse_operand(&mut self) -> Result<Expr> {
        let end = self.end_position();
        let token = self
            .next()
            .ok_or_else(|| FedError::parse(end, "expected an operand"))?;

        match token.kind {
            TokenKind::LParen => {
                let inner = self.parse_chain()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(Expr::Group(Box::new(inner))),
                    _ => Err(FedError::parse(token.position, "unbalanced parenthesis")),
                }
            }
            TokenKind::Quoted(phrase) => Ok(Expr::Phrase(phrase)),
            TokenKind::Colon => {
                let term = self.parse_value()?;
                Ok(Expr::Vocabulary { field: None, term })
            }
            TokenKind::Word(word) => match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Colon) => {
                    self.next();
                    let term = self.parse_value()?;
                    let field = if word == "*" { None } else { Some(word) };
                    Ok(Expr::Vocabulary { field, term })
                }
                Some(TokenKind::Compare(op)) => {
                    let op = *op;
                    self.next();
                    let value = self.parse_value()?;
                    Ok(Expr::Compare {
                        field: word,
                        op,
                        value,
                    })
                }
                _ if word.eq_ignore_ascii_case("all") => Ok(Expr::All),
                _ => Ok(Expr::Term(word)),
            },
            other => Err(FedError::parse(
                token.position,
                format!("unexpected {}", describe(&other)),
            )),
        }
    }

    fn parse_value(&mut self) -> Result<String> {
        let end = self.end_position();
        match self.next() {
            Some(Token {
                kind: TokenKind::Word(w) | TokenKind::Quoted(w),
                ..
            }) => Ok(w),
            Some(token) => Err(FedError::parse(
                token.position,
                format!("expected a value, found {}", describe(&token.kind)),
            )),
            None => Err(FedError::parse(end, "expected a value")),
        }
    }

    /// `IN Title` or `IN (Title OR Caption)`
    fn parse_field_list(&mut self) -> Result<Vec<String>> {
        let end = self.end_position();
        let token = self
            .next()
            .ok_or_else(|| FedError::parse(end, "expected a field list after IN"))?;

        match token.kind {
            TokenKind::Word(field) => Ok(vec![field]),
            TokenKind::LParen => {
                let mut fields = Vec::new();
                loop {
                    match self.next() {
                        Some(Token {
                            kind: TokenKind::Word(field),
                            ..
                        }) => fields.push(field),
                        _ => {
                            return Err(FedError::parse(token.position, "expected a field name"))
                        }
                    }
                    match self.next() {
                        Some(Token {
                            kind: TokenKind::Or,
                            ..
                        }) => continue,
                        Some(Token {
                            kind: TokenKind::RParen,
                            ..
                        }) => break,
                        _ => {
                            return Err(FedError::parse(
                                token.position,
                                "unterminated field list",
                            ))
                        }
                    }
                }
                Ok(fields)
            }
            other => Err(FedError::parse(
                token.position,
                format!("expected a field list, found {}", describe(&other)),
            )),
        }
    }
}

fn combine(op: BoolOp, lhs: Expr, rhs: Expr) -> Expr {
    match op {
        BoolOp::And => Expr::And(vec![lhs, rhs]),
        BoolOp::Or => Expr::Or(vec![lhs, rhs]),
        BoolOp::Except => Expr::Except(Box::new(lhs), Box::new(rhs)),
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Word(w) => format!("word '{w}'"),
        TokenKind::Quoted(q) => format!("phrase \"{q}\""),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Compare(op) => format!("'{}'", op.symbol()),
        TokenKind::And => "AND".to_string(),
        TokenKind::Or => "OR".to_string(),
        TokenKind::Except => "EXCEPT".to_string(),
        TokenKind::In => "IN".to_string(),
    }
}
