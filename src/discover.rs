//! Finding doxyfiles on disk.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result};

/// File name patterns that look like doxyfiles.
pub const DOXYFILE_PATTERNS: &[&str] = &["Doxyfile*", "*.doxyfile", "*.doxy"];

fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| Error::new(ErrorKind::Pattern, format!("{}: {}", pattern, e.msg)))?;
    paths
        .map(|p| {
            p.map_err(|e| {
                Error::new(ErrorKind::Io, e.error().to_string()).file(e.path().to_string_lossy())
            })
        })
        .collect()
}

/// Expand glob patterns into a sorted list of doxyfiles.
///
/// A pattern that names a directory is searched recursively for files
/// matching `DOXYFILE_PATTERNS`.
pub fn find_doxyfiles<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut found = BTreeSet::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        for path in expand(pattern)? {
            if path.is_dir() {
                for p in DOXYFILE_PATTERNS {
                    let sub = Path::new(&path).join("**").join(p);
                    found.extend(expand(&sub.to_string_lossy())?.into_iter().filter(|p| p.is_file()));
                }
            } else if path.is_file() {
                found.insert(path);
            }
        }
        trace!("find_doxyfiles: {} -> {} so far", pattern, found.len());
    }
    Ok(found.into_iter().collect())
}
