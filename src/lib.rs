//! Doxyfile editing and doxygen build supervision.
//!
//! A [`Doxyfile`] is parsed into an ordered list of [`Chunk`]s: settings
//! (`IDENTIFIER = VALUE`, possibly continued over several lines) and raw
//! text (comments, blank lines, anything else). Settings can be looked up
//! by identifier or group and changed; a [`Serializer`] writes the file
//! back, reproducing untouched parts byte for byte.
//!
//! A [`BuildJob`] runs doxygen on a doxyfile, collects its output and
//! extracts [`Marker`]s from it. The [`JobRegistry`] keeps one job per
//! doxyfile.
//!
//! ```no_run
//! use doxyedit::{Doxyfile, Serializer};
//!
//! let mut doxyfile = Doxyfile::from_file("Doxyfile")?;
//! doxyfile.set_value("PROJECT_NAME", "\"My Project\"")?;
//! doxyfile.save(&Serializer::for_doxyfile(&doxyfile))?;
//! # Ok::<(), doxyedit::Error>(())
//! ```
#[macro_use]
extern crate log;

mod chunk;
mod discover;
mod doxyfile;
mod error;
mod job;
pub mod marker;
mod parser;
mod prefs;
pub mod properties;
mod registry;
mod serializer;
mod tokenizer;

pub use chunk::{Chunk, Group, Operator, RawText, Setting};
pub use discover::{find_doxyfiles, DOXYFILE_PATTERNS};
pub use doxyfile::{Doxyfile, Location, SettingEvent, SettingListener};
pub use error::{Error, ErrorKind, Result};
pub use job::{BuildCommand, BuildJob, JobListener, JobState, Outcome, POLL_INTERVAL};
pub use marker::{Marker, Severity};
pub use parser::Parser;
pub use prefs::{Preferences, CONFIG_ENV, DOXYGEN_ENV};
pub use properties::Properties;
pub use registry::JobRegistry;
pub use serializer::{Alignment, LineSeparator, ListMode, Serializer, DEFAULT_WIDTH};
pub use tokenizer::{check_values, join_values, quote, quote_last, split_values};
