//! Setting metadata (group, note, type, text label).
//!
//! Metadata lives in a properties file keyed by `IDENTIFIER.property`,
//! for example `PROJECT_NAME.group = Project`. A default set is bundled
//! with the crate; more files can be layered on top.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;

use crate::error::{Error, ErrorKind, Result};

/// Group a setting is shown under.
pub const GROUP: &str = "group";
/// Free text describing the setting.
pub const NOTE: &str = "note";
/// Value type hint (`string`, `boolean`, `integer`, `enum`, `path`, `list`).
pub const TYPE: &str = "type";
/// Human readable label.
pub const TEXT: &str = "text";

/// Name of the group settings without a `group` property end up in.
pub const OTHERS: &str = "Others";

static BUNDLED: Lazy<Properties> =
    Lazy::new(|| Properties::parse(include_str!("../resources/doxyfile.properties")));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    map: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Properties {
        Properties::default()
    }

    /// The metadata bundled with this crate.
    pub fn bundled() -> Properties {
        BUNDLED.clone()
    }

    /// Parse properties text. Malformed lines are skipped.
    pub fn parse(text: &str) -> Properties {
        let mut map = HashMap::new();
        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            let mut line = line.trim_start().to_string();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            while ends_in_continuation(&line) {
                line.pop();
                match lines.next() {
                    Some(next) => line.push_str(next.trim_start()),
                    None => break,
                }
            }
            let sep = match line.find(|c: char| c == '=' || c == ':') {
                Some(sep) => sep,
                None => {
                    trace!("properties: skipping {:?}", line);
                    continue;
                }
            };
            let key = line[..sep].trim();
            if key.is_empty() {
                continue;
            }
            map.insert(key.to_string(), unescape(line[sep + 1..].trim()));
        }
        Properties { map }
    }

    /// Read a properties file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Properties> {
        let path = path.as_ref();
        let name = path.to_string_lossy().to_string();
        let data = fs::read(path).map_err(|e| Error::from(e).file(name.clone()))?;
        let text = String::from_utf8(data)
            .map_err(|_| Error::new(ErrorKind::Utf8, "utf-8 error").file(name))?;
        Ok(Properties::parse(&text))
    }

    /// Layer `other` on top of these properties.
    pub fn merge(&mut self, other: Properties) {
        self.map.extend(other.map);
    }

    pub fn get(&self, identifier: &str, property: &str) -> Option<&str> {
        self.map
            .get(&format!("{}.{}", identifier, property))
            .map(|s| s.as_str())
    }

    pub fn set(&mut self, identifier: &str, property: &str, value: impl Into<String>) {
        self.map
            .insert(format!("{}.{}", identifier, property), value.into());
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn ends_in_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }
    let mut r = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            r.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => r.push('\n'),
            Some('t') => r.push('\t'),
            Some(c) => r.push(c),
            None => {}
        }
    }
    r
}
