//! Tokenizer for the boolean query language.

use crate::core::error::{FedError, Result};
use crate::core::query::ast::CompareOp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word(String),
    Quoted(String),
    LParen,
    RParen,
    Colon,
    Compare(CompareOp),
    And,
    Or,
    Except,
    In,
}

/// Token with its byte offset in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | ':' | '=' | '<' | '>')
}

fn keyword(word: &str) -> Option<TokenKind> {
    match word.to_ascii_uppercase().as_str() {
        "AND" => Some(TokenKind::And),
        "OR" => Some(TokenKind::Or),
        "EXCEPT" => Some(TokenKind::Except),
        "IN" => Some(TokenKind::In),
        _ => None,
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match c {
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            ':' => {
                chars.next();
                TokenKind::Colon
            }
            '=' => {
                chars.next();
                TokenKind::Compare(CompareOp::Eq)
            }
            '<' | '>' => {
                chars.next();
                let next = chars.peek().map(|&(_, n)| n);
                match (c, next) {
                    ('<', Some('=')) => {
                        chars.next();
                        TokenKind::Compare(CompareOp::Le)
                    }
                    ('<', Some('>')) => {
                        chars.next();
                        TokenKind::Compare(CompareOp::Ne)
                    }
                    ('>', Some('=')) => {
                        chars.next();
                        TokenKind::Compare(CompareOp::Ge)
                    }
                    ('<', _) => TokenKind::Compare(CompareOp::Lt),
                    _ => TokenKind::Compare(CompareOp::Gt),
                }
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == '"' {
                        closed = true;
                        break;
                    }
                    text.push(ch);
                }
                if !closed {
                    return Err(FedError::parse(position, "unterminated quoted phrase"));
                }
                TokenKind::Quoted(text.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if !is_word_char(ch) {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                keyword(&word).unwrap_or(TokenKind::Word(word))
            }
        };

        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}
