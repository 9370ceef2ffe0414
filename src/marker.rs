//! Diagnostics found in a doxygen log.
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// `file:line: severity: message`
static RE_DIAGNOSTIC: Lazy<Regex> = Lazy::new(|| {
    let re = r"^(.+?):(\d+):\s*([^:]+?)\s*:\s*(.*)$";
    Regex::new(re).expect("could not compile RE_DIAGNOSTIC regexp")
});

// warning: Tag `FOO' at line 12 of file `bar.cfg' has become obsolete.
static RE_OBSOLETE: Lazy<Regex> = Lazy::new(|| {
    let re = r"(?i)^\s*(?:warning:\s*)?tag [`']([^`']+)' at line (\d+) of file [`']([^`']+)' has become obsolete";
    Regex::new(re).expect("could not compile RE_OBSOLETE regexp")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// `warning` (any case) is a warning, everything else an error.
    pub fn from_text(s: &str) -> Severity {
        if s.trim().eq_ignore_ascii_case("warning") {
            Severity::Warning
        } else {
            Severity::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A diagnostic attached to a line of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub file: PathBuf,
    pub line: u32,
    pub severity: Severity,
    pub message: String,
    /// The obsolete setting, for "tag has become obsolete" warnings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting: Option<String>,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file.display(),
            self.line,
            self.severity.as_str(),
            self.message
        )
    }
}

fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Parse one log line.
pub fn parse_line(line: &str, base_dir: &Path) -> Option<Marker> {
    if let Some(caps) = RE_OBSOLETE.captures(line) {
        let setting = caps[1].to_string();
        return Some(Marker {
            file: resolve(base_dir, &caps[3]),
            line: caps[2].parse().ok()?,
            severity: Severity::Warning,
            message: format!("Tag `{}' has become obsolete.", setting),
            setting: Some(setting),
        });
    }
    let caps = RE_DIAGNOSTIC.captures(line)?;
    Some(Marker {
        file: resolve(base_dir, &caps[1]),
        line: caps[2].parse().ok()?,
        severity: Severity::from_text(&caps[3]),
        message: caps[4].trim().to_string(),
        setting: None,
    })
}

/// Find all markers in a log. Relative paths are taken relative to `base_dir`.
pub fn parse_log(log: &str, base_dir: &Path) -> Vec<Marker> {
    let markers: Vec<_> = log.lines().filter_map(|l| parse_line(l, base_dir)).collect();
    debug!("parse_log: {} marker(s)", markers.len());
    markers
}
