//! Line scanner turning doxyfile text into chunks.
//!
//! Nothing in here can fail: a line that is not an assignment simply
//! becomes raw text.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::chunk::{Chunk, Operator, RawText, Setting};
use crate::serializer::LineSeparator;

static RE_SETTING: Lazy<Regex> = Lazy::new(|| {
    let re = r"^\s*(@?[A-Za-z_][A-Za-z0-9_]*)\s*(\+?=)(.*)$";
    Regex::new(re).expect("could not compile RE_SETTING regexp")
});

/// Text split into physical lines.
#[derive(Debug, Clone, Default)]
pub(crate) struct SplitLines {
    pub lines: Vec<String>,
    /// The first line terminator seen.
    pub separator: Option<LineSeparator>,
    /// False if the last line had no terminator.
    pub final_newline: bool,
}

/// Split on `\r\n`, `\n` or `\r`.
pub(crate) fn split_lines(text: &str) -> SplitLines {
    let mut lines = Vec::new();
    let mut separator = None;
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let (sep, len) = match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => (LineSeparator::CrLf, 2),
            b'\r' => (LineSeparator::Cr, 1),
            b'\n' => (LineSeparator::Lf, 1),
            _ => {
                i += 1;
                continue;
            }
        };
        lines.push(text[start..i].to_string());
        separator.get_or_insert(sep);
        i += len;
        start = i;
    }
    let final_newline = start == text.len();
    if !final_newline {
        lines.push(text[start..].to_string());
    }
    SplitLines {
        lines,
        separator,
        final_newline,
    }
}

// If the line ends in an unescaped backslash, return it without.
fn strip_continuation(s: &str) -> Option<&str> {
    let t = s.trim_end();
    let n = t.chars().rev().take_while(|&c| c == '\\').count();
    if n % 2 == 1 {
        Some(&t[..t.len() - 1])
    } else {
        None
    }
}

/// Produces the chunks of a doxyfile, in order.
#[derive(Debug)]
pub struct Parser {
    lines: Vec<String>,
    pos: usize,
    separator: Option<LineSeparator>,
    final_newline: bool,
}

impl Parser {
    pub fn from_text(text: &str) -> Parser {
        let split = split_lines(text);
        Parser {
            lines: split.lines,
            pos: 0,
            separator: split.separator,
            final_newline: split.final_newline,
        }
    }

    /// The line separator used by the text, if it has more than one line.
    pub fn separator(&self) -> Option<LineSeparator> {
        self.separator
    }

    /// False if the text did not end in a line separator.
    pub fn final_newline(&self) -> bool {
        self.final_newline
    }

    fn parse_setting(&mut self) -> Option<Setting> {
        let first = &self.lines[self.pos];
        let caps = RE_SETTING.captures(first)?;
        let identifier = caps.get(1)?.as_str();
        let operator = Operator::parse(caps.get(2)?.as_str())?;
        let line = self.pos as u32 + 1;

        let mut pieces = Vec::new();
        let mut source = vec![first.clone()];
        let mut rest = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        let mut continued = false;
        let mut next = self.pos + 1;
        loop {
            match strip_continuation(rest) {
                Some(piece) => {
                    continued = true;
                    pieces.push(piece.trim());
                    if next == self.lines.len() {
                        break;
                    }
                    source.push(self.lines[next].clone());
                    rest = &self.lines[next];
                    next += 1;
                }
                None => {
                    pieces.push(rest.trim());
                    break;
                }
            }
        }
        let value = pieces
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        debug!("parse: line {}: {} {} {:?} (continued: {})", line, identifier, operator, value, continued);

        let setting = Setting::parsed(identifier, operator, value, continued, source, line);
        self.pos = next;
        Some(setting)
    }

    /// The next chunk, or `None` at end of text.
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        if self.pos == self.lines.len() {
            return None;
        }
        if let Some(setting) = self.parse_setting() {
            return Some(Chunk::Setting(setting));
        }
        let mut raw = RawText::from_lines(Vec::new());
        while self.pos < self.lines.len() && !RE_SETTING.is_match(&self.lines[self.pos]) {
            raw.push_line(self.lines[self.pos].clone());
            self.pos += 1;
        }
        trace!("parse: {} raw line(s)", raw.lines().len());
        Some(Chunk::RawText(raw))
    }
}

impl Iterator for Parser {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        self.next_chunk()
    }
}
