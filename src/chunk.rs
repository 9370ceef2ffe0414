use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::tokenizer::{check_values, join_values, split_values};

/// Assignment operator of a setting.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operator {
    /// `=`, replaces the value.
    Assign,
    /// `+=`, appends to a list-valued option.
    Append,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Operator::Assign => "=",
            Operator::Append => "+=",
        }
    }

    pub fn parse(s: &str) -> Option<Operator> {
        match s {
            "=" => Some(Operator::Assign),
            "+=" => Some(Operator::Append),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lines we did not recognize, kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawText {
    lines: Vec<String>,
}

impl RawText {
    /// Build raw text from a string, one entry per line.
    pub fn new(text: &str) -> RawText {
        RawText {
            lines: crate::parser::split_lines(text).lines,
        }
    }

    pub(crate) fn from_lines(lines: Vec<String>) -> RawText {
        RawText { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// One `IDENTIFIER = VALUE` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    identifier: String,
    operator: Operator,
    value: String,
    continued: bool,
    properties: HashMap<String, String>,
    // Physical lines this setting was parsed from. Empty for new settings.
    source: Vec<String>,
    line: u32,
    modified: bool,
}

impl Setting {
    /// A new `IDENTIFIER = value` setting.
    pub fn new(identifier: impl Into<String>, value: impl Into<String>) -> Setting {
        Setting {
            identifier: identifier.into(),
            operator: Operator::Assign,
            value: value.into(),
            continued: false,
            properties: HashMap::new(),
            source: Vec::new(),
            line: 0,
            modified: true,
        }
    }

    pub fn with_operator(mut self, operator: Operator) -> Setting {
        self.operator = operator;
        self
    }

    pub(crate) fn parsed(
        identifier: &str,
        operator: Operator,
        value: String,
        continued: bool,
        source: Vec<String>,
        line: u32,
    ) -> Setting {
        Setting {
            identifier: identifier.to_string(),
            operator,
            value,
            continued,
            properties: HashMap::new(),
            source,
            line,
            modified: false,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The raw value: compounds separated by spaces, quoted where needed.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True if the value was spread over backslash-continued lines.
    pub fn continued(&self) -> bool {
        self.continued
    }

    /// Line number in the source text, 0 for settings that were not parsed.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The physical lines this setting was read from.
    pub fn source_lines(&self) -> &[String] {
        &self.source
    }

    /// True if the setting changed since it was parsed, or was never parsed.
    pub fn is_modified(&self) -> bool {
        self.modified || self.source.is_empty()
    }

    /// Change the raw value. Returns true if it actually changed.
    pub fn set_value(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if value == self.value {
            return false;
        }
        self.value = value;
        self.modified = true;
        true
    }

    pub fn set_operator(&mut self, operator: Operator) -> bool {
        if operator == self.operator {
            return false;
        }
        self.operator = operator;
        self.modified = true;
        true
    }

    pub fn set_continued(&mut self, continued: bool) -> bool {
        if continued == self.continued {
            return false;
        }
        self.continued = continued;
        self.modified = true;
        true
    }

    /// The value split into compounds.
    pub fn values(&self) -> Vec<String> {
        split_values(&self.value)
    }

    /// Replace the value by a list of compounds.
    pub fn set_values<S: AsRef<str>>(&mut self, values: &[S]) -> Result<bool> {
        check_values(values)?;
        Ok(self.set_value(join_values(values)))
    }

    pub fn has_value(&self) -> bool {
        !self.value.trim().is_empty()
    }

    pub fn is_list(&self) -> bool {
        self.values().len() > 1
    }

    /// A property set on this setting. Defaults are resolved by the `Doxyfile`.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|s| s.as_str())
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set a property. Properties are metadata, they do not mark the
    /// setting as modified.
    pub fn set_property(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.properties.get(name) == Some(&value) {
            return false;
        }
        self.properties.insert(name.to_string(), value);
        true
    }

    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        self.properties.remove(name)
    }
}

/// An ordered fragment of a doxyfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    RawText(RawText),
    Setting(Setting),
}

impl Chunk {
    pub fn as_setting(&self) -> Option<&Setting> {
        match self {
            Chunk::Setting(s) => Some(s),
            Chunk::RawText(_) => None,
        }
    }

    pub(crate) fn as_setting_mut(&mut self) -> Option<&mut Setting> {
        match self {
            Chunk::Setting(s) => Some(s),
            Chunk::RawText(_) => None,
        }
    }

    pub fn is_setting(&self) -> bool {
        matches!(self, Chunk::Setting(_))
    }
}

impl From<Setting> for Chunk {
    fn from(s: Setting) -> Chunk {
        Chunk::Setting(s)
    }
}

impl From<RawText> for Chunk {
    fn from(r: RawText) -> Chunk {
        Chunk::RawText(r)
    }
}

/// Settings sharing the same `group` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    identifiers: Vec<String>,
}

impl Group {
    pub(crate) fn new(name: impl Into<String>) -> Group {
        Group {
            name: name.into(),
            identifiers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifiers of the settings in this group, in append order.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.iter().any(|i| i == identifier)
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub(crate) fn add(&mut self, identifier: &str) {
        if !self.contains(identifier) {
            self.identifiers.push(identifier.to_string());
        }
    }

    pub(crate) fn remove(&mut self, identifier: &str) {
        self.identifiers.retain(|i| i != identifier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_settings_count_as_modified() {
        let s = Setting::new("INPUT", "src");
        assert!(s.is_modified());
        assert_eq!(s.operator(), Operator::Assign);
        assert_eq!(s.line(), 0);
    }

    #[test]
    fn set_value_tracks_changes() {
        let mut s = Setting::parsed(
            "INPUT",
            Operator::Assign,
            "src".to_string(),
            false,
            vec!["INPUT = src".to_string()],
            4,
        );
        assert!(!s.is_modified());
        assert!(!s.set_value("src"));
        assert!(!s.is_modified());
        assert!(s.set_value("src include"));
        assert!(s.is_modified());
        assert!(s.is_list());
    }

    #[test]
    fn values_round_trip_through_quoting() {
        let mut s = Setting::new("PROJECT_NAME", "");
        assert!(!s.has_value());
        s.set_values(&["My Project"]).unwrap();
        assert_eq!(s.value(), "\"My Project\"");
        assert_eq!(s.values(), vec!["My Project"]);
    }

    #[test]
    fn properties_do_not_mark_modified() {
        let mut s = Setting::parsed("X", Operator::Append, String::new(), false, vec!["X +=".into()], 1);
        assert!(s.set_property("group", "Mine"));
        assert!(!s.set_property("group", "Mine"));
        assert_eq!(s.property("group"), Some("Mine"));
        assert!(!s.is_modified());
    }

    #[test]
    fn group_keeps_identifiers_unique() {
        let mut g = Group::new("Input");
        g.add("INPUT");
        g.add("FILE_PATTERNS");
        g.add("INPUT");
        assert_eq!(g.identifiers(), &["INPUT".to_string(), "FILE_PATTERNS".to_string()]);
        g.remove("INPUT");
        assert_eq!(g.len(), 1);
    }
}
