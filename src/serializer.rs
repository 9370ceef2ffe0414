use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chunk::{Chunk, Setting};
use crate::doxyfile::Doxyfile;
use crate::error::{Error, ErrorKind};
use crate::tokenizer::{join_values, quote, quote_last};

/// Identifier column width doxygen itself uses.
pub const DEFAULT_WIDTH: usize = 23;

/// Line terminator written after every line.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineSeparator {
    /// `\r\n` on windows, `\n` everywhere else.
    #[default]
    System,
    Lf,
    Cr,
    CrLf,
}

impl LineSeparator {
    pub fn as_str(&self) -> &'static str {
        match *self {
            LineSeparator::System => {
                if cfg!(windows) {
                    "\r\n"
                } else {
                    "\n"
                }
            }
            LineSeparator::Lf => "\n",
            LineSeparator::Cr => "\r",
            LineSeparator::CrLf => "\r\n",
        }
    }
}

impl FromStr for LineSeparator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(LineSeparator::System),
            "lf" | "unix" => Ok(LineSeparator::Lf),
            "cr" | "mac" => Ok(LineSeparator::Cr),
            "crlf" | "windows" => Ok(LineSeparator::CrLf),
            _ => Err(Error::new(ErrorKind::Config, format!("unknown line separator: {}", s))),
        }
    }
}

/// Where the value starts.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    /// Pad the identifier to a fixed column, like doxygen does.
    Fixed(usize),
    /// Identifier, one space, operator.
    Compact,
}

impl Default for Alignment {
    fn default() -> Alignment {
        Alignment::Fixed(DEFAULT_WIDTH)
    }
}

impl FromStr for Alignment {
    type Err = Error;

    /// `compact`, `fixed`, `fixed:WIDTH` or just `WIDTH`.
    fn from_str(s: &str) -> Result<Self, Error> {
        let bad = || Error::new(ErrorKind::Config, format!("unknown alignment: {}", s));
        match s {
            "compact" => Ok(Alignment::Compact),
            "fixed" => Ok(Alignment::Fixed(DEFAULT_WIDTH)),
            _ => {
                let width = s.strip_prefix("fixed:").unwrap_or(s);
                width.parse().map(Alignment::Fixed).map_err(|_| bad())
            }
        }
    }
}

/// How multi-value settings are laid out.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListMode {
    /// Keep settings on one line or continued, as they were read.
    #[default]
    DoNotChange,
    /// Everything on one line.
    SingleLine,
    /// One value per line, joined by backslashes.
    Continued,
}

impl FromStr for ListMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "do-not-change" | "keep" => Ok(ListMode::DoNotChange),
            "single-line" | "single" => Ok(ListMode::SingleLine),
            "continued" | "split" => Ok(ListMode::Continued),
            _ => Err(Error::new(ErrorKind::Config, format!("unknown list mode: {}", s))),
        }
    }
}

impl fmt::Display for ListMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ListMode::DoNotChange => "do-not-change",
            ListMode::SingleLine => "single-line",
            ListMode::Continued => "continued",
        })
    }
}

/// Turns a `Doxyfile` back into text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Serializer {
    pub alignment: Alignment,
    pub list_mode: ListMode,
    pub separator: LineSeparator,
}

impl Serializer {
    pub fn new() -> Serializer {
        Serializer::default()
    }

    /// Defaults, but with the line separator the doxyfile was read with.
    pub fn for_doxyfile(doxyfile: &Doxyfile) -> Serializer {
        Serializer {
            separator: doxyfile.line_separator(),
            ..Serializer::default()
        }
    }

    pub fn alignment(mut self, alignment: Alignment) -> Serializer {
        self.alignment = alignment;
        self
    }

    pub fn list_mode(mut self, list_mode: ListMode) -> Serializer {
        self.list_mode = list_mode;
        self
    }

    pub fn separator(mut self, separator: LineSeparator) -> Serializer {
        self.separator = separator;
        self
    }

    fn head(&self, setting: &Setting) -> String {
        let identifier = setting.identifier();
        let mut head = identifier.to_string();
        match self.alignment {
            Alignment::Fixed(width) => {
                let n = identifier.chars().count();
                let pad = if n < width { width - n } else { 1 };
                head.extend(std::iter::repeat(' ').take(pad));
            }
            Alignment::Compact => head.push(' '),
        }
        head.push_str(setting.operator().as_str());
        head.push(' ');
        head
    }

    /// The lines a setting is written as, without separators.
    pub fn setting_lines(&self, setting: &Setting) -> Vec<String> {
        if self.list_mode == ListMode::DoNotChange && !setting.is_modified() {
            return setting.source_lines().to_vec();
        }
        let head = self.head(setting);
        let values = setting.values();
        if values.is_empty() {
            return vec![head.trim_end().to_string()];
        }
        let continued = match self.list_mode {
            ListMode::DoNotChange => setting.continued(),
            ListMode::SingleLine => false,
            ListMode::Continued => true,
        };
        if !continued || values.len() == 1 {
            return vec![format!("{}{}", head, join_values(&values))];
        }

        let indent = " ".repeat(head.chars().count());
        let last = values.len() - 1;
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let prefix = if i == 0 { head.as_str() } else { indent.as_str() };
                if i == last {
                    format!("{}{}", prefix, quote_last(v))
                } else {
                    format!("{}{} \\", prefix, quote(v))
                }
            })
            .collect()
    }

    fn lines<'a>(&self, doxyfile: &'a Doxyfile) -> impl Iterator<Item = String> + 'a {
        let this = *self;
        doxyfile.chunks().iter().flat_map(move |chunk| match chunk {
            Chunk::RawText(raw) => raw.lines().to_vec(),
            Chunk::Setting(setting) => this.setting_lines(setting),
        })
    }

    /// Serialize a whole doxyfile.
    pub fn serialize(&self, doxyfile: &Doxyfile) -> String {
        let sep = self.separator.as_str();
        let mut out = String::new();
        for line in self.lines(doxyfile) {
            out.push_str(&line);
            out.push_str(sep);
        }
        if !doxyfile.final_newline() && out.ends_with(sep) {
            out.truncate(out.len() - sep.len());
        }
        out
    }

    /// Serialize a whole doxyfile into a writer.
    pub fn write_to<W: io::Write>(&self, doxyfile: &Doxyfile, mut w: W) -> io::Result<()> {
        w.write_all(self.serialize(doxyfile).as_bytes())?;
        w.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Operator;

    fn setting(id: &str, value: &str) -> Setting {
        Setting::new(id, value)
    }

    #[test]
    fn fixed_alignment_matches_doxygen() {
        let s = Serializer::new();
        assert_eq!(
            s.setting_lines(&setting("PROJECT_NAME", "\"My Project\"")),
            vec!["PROJECT_NAME           = \"My Project\""]
        );
        assert_eq!(s.setting_lines(&setting("PROJECT_BRIEF", "")), vec!["PROJECT_BRIEF          ="]);
    }

    #[test]
    fn long_identifier_gets_one_space() {
        let s = Serializer::new().alignment(Alignment::Fixed(4));
        assert_eq!(s.setting_lines(&setting("INPUT", "a")), vec!["INPUT = a"]);
    }

    #[test]
    fn compact_alignment_and_append() {
        let s = Serializer::new().alignment(Alignment::Compact);
        let st = setting("INPUT", "a").with_operator(Operator::Append);
        assert_eq!(s.setting_lines(&st), vec!["INPUT += a"]);
    }

    #[test]
    fn continued_lists_are_indented_to_the_head() {
        let s = Serializer::new()
            .alignment(Alignment::Compact)
            .list_mode(ListMode::Continued);
        assert_eq!(
            s.setting_lines(&setting("INPUT", "src \"doc files\" x")),
            vec!["INPUT = src \\", "        \"doc files\" \\", "        x"]
        );
    }

    #[test]
    fn single_value_is_never_continued() {
        let s = Serializer::new().list_mode(ListMode::Continued);
        assert_eq!(s.setting_lines(&setting("INPUT", "src")).len(), 1);
    }

    #[test]
    fn single_line_mode_joins() {
        let mut st = setting("INPUT", "a b");
        st.set_continued(true);
        let keep = Serializer::new().alignment(Alignment::Compact);
        assert_eq!(keep.setting_lines(&st).len(), 2);
        let single = keep.list_mode(ListMode::SingleLine);
        assert_eq!(single.setting_lines(&st), vec!["INPUT = a b"]);
    }

    #[test]
    fn parse_options() {
        assert_eq!("crlf".parse::<LineSeparator>().unwrap(), LineSeparator::CrLf);
        assert_eq!("compact".parse::<Alignment>().unwrap(), Alignment::Compact);
        assert_eq!("fixed:30".parse::<Alignment>().unwrap(), Alignment::Fixed(30));
        assert_eq!("16".parse::<Alignment>().unwrap(), Alignment::Fixed(16));
        assert_eq!("split".parse::<ListMode>().unwrap(), ListMode::Continued);
        assert!("sideways".parse::<ListMode>().is_err());
    }
}
