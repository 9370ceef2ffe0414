use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::job::BuildCommand;
use crate::properties::Properties;
use crate::serializer::{Alignment, LineSeparator, ListMode, Serializer};

/// Environment variable naming a preferences file.
pub const CONFIG_ENV: &str = "DOXYEDIT_CONFIG";
/// Environment variable naming the doxygen executable.
pub const DOXYGEN_ENV: &str = "DOXYEDIT_DOXYGEN";

/// User preferences, stored as JSON.
///
/// ```json
/// {
///   "doxygen": "/usr/local/bin/doxygen",
///   "doxygen_args": ["-d", "preprocessor"],
///   "alignment": "compact",
///   "list_mode": "continued",
///   "line_separator": "lf",
///   "properties": ["extra.properties"],
///   "variables": { "PROJECT_ROOT": "/src/project" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
    /// Doxygen executable. Looked up in `$PATH` if not set.
    pub doxygen: Option<PathBuf>,
    /// Arguments passed to doxygen before the doxyfile.
    pub doxygen_args: Vec<String>,
    pub alignment: Alignment,
    pub list_mode: ListMode,
    /// `None` keeps the separator the file was read with.
    pub line_separator: Option<LineSeparator>,
    /// Extra setting metadata files, applied in order.
    pub properties: Vec<PathBuf>,
    /// Extra environment variables for builds.
    pub variables: BTreeMap<String, String>,
}

impl Preferences {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Preferences> {
        let path = path.as_ref();
        let name = path.to_string_lossy().to_string();
        let data = fs::read_to_string(path).map_err(|e| Error::from(e).file(name.clone()))?;
        let mut prefs: Preferences =
            serde_json::from_str(&data).map_err(|e| Error::from(e).file(name))?;
        // Relative metadata paths are relative to the preferences file.
        if let Some(dir) = path.parent() {
            for p in &mut prefs.properties {
                if p.is_relative() {
                    *p = dir.join(&*p);
                }
            }
        }
        Ok(prefs)
    }

    /// Load from `explicit`, else from `$DOXYEDIT_CONFIG`, else defaults.
    /// `$DOXYEDIT_DOXYGEN` overrides the executable either way.
    pub fn load(explicit: Option<&Path>) -> Result<Preferences> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut prefs = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                debug!("preferences from {}", path.display());
                Preferences::from_file(path)?
            }
            None => Preferences::default(),
        };
        if let Some(doxygen) = env::var_os(DOXYGEN_ENV) {
            prefs.doxygen = Some(PathBuf::from(doxygen));
        }
        Ok(prefs)
    }

    /// Serializer for a file that was read with `separator`.
    pub fn serializer(&self, separator: LineSeparator) -> Serializer {
        Serializer::new()
            .alignment(self.alignment)
            .list_mode(self.list_mode)
            .separator(self.line_separator.unwrap_or(separator))
    }

    /// The bundled metadata with the configured files layered on top.
    pub fn defaults(&self) -> Result<Properties> {
        let mut props = Properties::bundled();
        for path in &self.properties {
            props.merge(Properties::from_file(path)?);
        }
        Ok(props)
    }

    pub fn build_command(&self) -> Result<BuildCommand> {
        let mut command = match &self.doxygen {
            Some(path) => BuildCommand::new(path),
            None => BuildCommand::detect()?,
        };
        command.args = self.doxygen_args.clone();
        command.variables = self.variables.clone();
        Ok(command)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::new(ErrorKind::Config, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_json_is_default() {
        let prefs: Preferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.alignment, Alignment::Fixed(crate::serializer::DEFAULT_WIDTH));
    }

    #[test]
    fn parse_all_fields() {
        let prefs: Preferences = serde_json::from_str(
            r#"{
                "doxygen": "/opt/bin/doxygen",
                "doxygen_args": ["-q"],
                "alignment": "compact",
                "list_mode": "continued",
                "line_separator": "crlf",
                "variables": { "ROOT": "/src" }
            }"#,
        )
        .unwrap();
        assert_eq!(prefs.alignment, Alignment::Compact);
        assert_eq!(prefs.list_mode, ListMode::Continued);
        let s = prefs.serializer(LineSeparator::Lf);
        assert_eq!(s.separator, LineSeparator::CrLf);
        let cmd = prefs.build_command().unwrap();
        assert_eq!(cmd.program, PathBuf::from("/opt/bin/doxygen"));
        assert_eq!(cmd.args, vec!["-q".to_string()]);
        assert_eq!(cmd.variables.get("ROOT").map(|s| s.as_str()), Some("/src"));
    }

    #[test]
    fn fixed_alignment_width() {
        let prefs: Preferences = serde_json::from_str(r#"{ "alignment": { "fixed": 30 } }"#).unwrap();
        assert_eq!(prefs.alignment, Alignment::Fixed(30));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::File::create(&path)
            .unwrap()
            .write_all(b"{\n  \"colour\": \"blue\"\n}\n")
            .unwrap();
        let err = Preferences::from_file(&path).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.to_string().starts_with(&path.to_string_lossy().to_string()));
    }

    #[test]
    fn properties_files_are_relative_to_prefs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("extra.properties"), "PROJECT_NAME.group = Mine\n").unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{ "properties": ["extra.properties"] }"#).unwrap();
        let prefs = Preferences::from_file(&path).unwrap();
        let props = prefs.defaults().unwrap();
        assert_eq!(props.get("PROJECT_NAME", "group"), Some("Mine"));
        assert_eq!(props.get("INPUT", "group"), Some("Input"));
    }
}
