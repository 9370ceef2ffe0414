//! Splitting a setting value into its compounds.
//!
//! A value is a whitespace separated list of compounds. A compound is
//! either a bare run of characters or a double-quoted string in which
//! `\"` stands for a literal quote. At the very end of a value `\"` is a
//! backslash followed by the closing quote, so a last compound can end in
//! a backslash without continuing the line.
use std::borrow::Cow;

use crate::error::{Error, ErrorKind, Result};

type Range = std::ops::Range<usize>;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum TokenType {
    Word,
    DqString,
    UnterminatedString,
    Eof,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            TokenType::Word => "word",
            TokenType::DqString => "string",
            TokenType::UnterminatedString => "[unterminated string]",
            TokenType::Eof => "end-of-value",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub ttype: TokenType,
    pub offset: usize,
    pub value: String,
}

#[derive(Debug)]
pub struct Tokenizer<'a> {
    data: &'a str,
    offset: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(data: &'a str) -> Tokenizer<'a> {
        Tokenizer { data, offset: 0 }
    }

    fn skip_space(&self) -> usize {
        self.data[self.offset..]
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(|c| c.len_utf8())
            .sum()
    }

    fn parse_dqstring(&mut self) -> (TokenType, Range) {
        let start = self.offset + 1;
        let s = &self.data[start..];
        let mut esc = false;
        for (i, c) in s.char_indices() {
            if esc {
                esc = false;
                continue;
            }
            match c {
                '\\' if s[i + 1..].starts_with('"') && s[i + 2..].trim().is_empty() => {
                    self.offset = start + i + 2;
                    return (
                        TokenType::DqString,
                        Range {
                            start,
                            end: start + i + 1,
                        },
                    );
                }
                '\\' => esc = true,
                '"' => {
                    self.offset = start + i + 1;
                    return (
                        TokenType::DqString,
                        Range {
                            start,
                            end: start + i,
                        },
                    );
                }
                _ => {}
            }
        }
        // No closing quote, the rest of the value is the string.
        self.offset = self.data.len();
        (
            TokenType::UnterminatedString,
            Range {
                start,
                end: self.data.len(),
            },
        )
    }

    fn parse_word(&mut self) -> (TokenType, Range) {
        let offset = self.offset;
        let n: usize = self.data[offset..]
            .chars()
            .take_while(|&c| !c.is_whitespace() && c != '"')
            .map(|c| c.len_utf8())
            .sum();
        self.offset += n;
        (
            TokenType::Word,
            Range {
                start: offset,
                end: offset + n,
            },
        )
    }

    pub fn next_token(&mut self) -> Token {
        self.offset += self.skip_space();
        let offset = self.offset;
        let (ttype, range) = match self.data[offset..].chars().next() {
            None => {
                return Token {
                    ttype: TokenType::Eof,
                    offset,
                    value: String::new(),
                }
            }
            Some('"') => self.parse_dqstring(),
            Some(_) => self.parse_word(),
        };
        let dq = ttype != TokenType::Word;
        Token {
            ttype,
            offset,
            value: expand_string(dq, &self.data[range]),
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.ttype == TokenType::Eof {
            None
        } else {
            Some(token)
        }
    }
}

/// Split a raw value into its compounds.
pub fn split_values(value: &str) -> Vec<String> {
    Tokenizer::new(value).map(|t| t.value).collect()
}

// True if `s` ends in an unescaped backslash.
fn ends_in_backslash(s: &str) -> bool {
    s.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"')
}

fn quote_always(value: &str) -> String {
    let mut r = String::with_capacity(value.len() + 2);
    r.push('"');
    for c in value.chars() {
        if c == '"' {
            r.push('\\');
        }
        r.push(c);
    }
    r.push('"');
    r
}

/// Quote a compound if it would not survive `split_values` as-is.
pub fn quote(value: &str) -> Cow<'_, str> {
    if needs_quotes(value) {
        Cow::Owned(quote_always(value))
    } else {
        Cow::Borrowed(value)
    }
}

/// Quote the last compound of a value. One that ends in a backslash is
/// always quoted, otherwise the line would be taken as continued.
pub fn quote_last(value: &str) -> Cow<'_, str> {
    if ends_in_backslash(value) {
        Cow::Owned(quote_always(value))
    } else {
        quote(value)
    }
}

/// Join compounds back into a raw value, quoting where needed.
pub fn join_values<S: AsRef<str>>(values: &[S]) -> String {
    let last = values.len().saturating_sub(1);
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if i == last {
                quote_last(v.as_ref())
            } else {
                quote(v.as_ref())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check that `join_values` can write these compounds so that
/// `split_values` gives them back.
///
/// A quoted compound that ends in a backslash only survives as the last
/// one of a value.
pub fn check_values<S: AsRef<str>>(values: &[S]) -> Result<()> {
    let last = values.len().saturating_sub(1);
    for (i, v) in values.iter().enumerate() {
        let v = v.as_ref();
        if i != last && needs_quotes(v) && ends_in_backslash(v) {
            return Err(Error::new(
                ErrorKind::Value,
                format!("{:?}: quoted value ending in a backslash must come last", v),
            ));
        }
    }
    Ok(())
}

// Only `\"` is an escape; other backslashes are literal (think windows paths).
fn expand_string(dq: bool, s: &str) -> String {
    if !dq || !s.contains("\\\"") {
        return s.to_string();
    }
    s.replace("\\\"", "\"")
}
