use std::fmt;
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What went wrong.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Reading or writing a file failed.
    Io,
    /// The doxyfile is not valid utf-8.
    Utf8,
    /// No setting with that identifier.
    UnknownSetting,
    /// The documentation generator could not be started.
    Launch,
    /// Invalid preferences.
    Config,
    /// Invalid glob pattern.
    Pattern,
    /// A value that cannot be written back.
    Value,
}

#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub line: u32,
    pub msg: String,
    pub file_name: String,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Error {
        Error {
            kind,
            line: 0,
            msg: msg.into(),
            file_name: "doxyfile-text".to_string(),
        }
    }

    pub(crate) fn unknown_setting(identifier: &str) -> Error {
        Error::new(ErrorKind::UnknownSetting, format!("no such setting: {}", identifier))
    }

    /// Attach the name of the file this error is about.
    pub fn file(mut self, name: impl Into<String>) -> Error {
        self.file_name = name.into();
        self
    }

    /// Attach a line number.
    pub fn at_line(mut self, line: u32) -> Error {
        self.line = line;
        self
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::new(ErrorKind::Io, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::new(ErrorKind::Config, e.to_string()).at_line(e.line() as u32)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.file_name, self.msg)
        } else {
            write!(f, "{}:{}: {}", self.file_name, self.line, self.msg)
        }
    }
}

impl std::error::Error for Error {}
