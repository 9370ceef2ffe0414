use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::chunk::{Chunk, Group, Setting};
use crate::error::{Error, ErrorKind, Result};
use crate::parser::Parser;
use crate::properties::{self, Properties};
use crate::serializer::{LineSeparator, Serializer};

/// Where a doxyfile lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A file inside a project: the project root and a path relative to it.
    Workspace { root: PathBuf, path: PathBuf },
    /// A plain file system path.
    File(PathBuf),
}

impl Location {
    /// The absolute path of the file. Nothing is resolved on disk.
    pub fn resolved_path(&self) -> PathBuf {
        match self {
            Location::Workspace { root, path } => absolute(&root.join(path)),
            Location::File(path) => absolute(path),
        }
    }

    /// Path relative to the project root, for workspace files.
    pub fn workspace_path(&self) -> Option<&Path> {
        match self {
            Location::Workspace { path, .. } => Some(path),
            Location::File(_) => None,
        }
    }

    /// File name, for display.
    pub fn name(&self) -> String {
        self.resolved_path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// The directory the file is in.
    pub fn directory(&self) -> PathBuf {
        let path = self.resolved_path();
        path.parent().map(Path::to_path_buf).unwrap_or(path)
    }
}

fn absolute(path: &Path) -> PathBuf {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    let mut r = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                if !r.pop() {
                    r.push(c);
                }
            }
            c => r.push(c),
        }
    }
    r
}

/// Something that happened to a setting.
#[derive(Debug)]
pub enum SettingEvent<'a> {
    /// The value of a setting changed.
    ValueChanged(&'a Setting),
    /// A property of a setting changed.
    PropertyChanged { setting: &'a Setting, name: &'a str },
    /// A new setting was appended.
    Appended(&'a Setting),
    /// All chunks were replaced by a (re)load.
    Reloaded,
}

/// Observer of setting changes.
pub trait SettingListener: Send {
    fn setting_changed(&self, event: &SettingEvent<'_>);
}

impl<F> SettingListener for F
where
    F: Fn(&SettingEvent<'_>) + Send,
{
    fn setting_changed(&self, event: &SettingEvent<'_>) {
        self(event)
    }
}

/// A doxygen configuration file.
///
/// Chunks are kept in file order. Settings are also indexed by identifier
/// (the last one appended wins) and by group. Two doxyfiles are equal when
/// their absolute paths are equal.
pub struct Doxyfile {
    location: Location,
    chunks: Vec<Chunk>,
    settings: HashMap<String, usize>,
    groups: Vec<Group>,
    defaults: Properties,
    listeners: Vec<Box<dyn SettingListener>>,
    separator: LineSeparator,
    final_newline: bool,
    modified_on_disk: Option<SystemTime>,
}

impl fmt::Debug for Doxyfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Doxyfile")
            .field("location", &self.location)
            .field("chunks", &self.chunks.len())
            .field("settings", &self.settings.len())
            .finish()
    }
}

impl Doxyfile {
    /// An empty doxyfile backed by `location`. Nothing is read yet.
    pub fn new(location: Location) -> Doxyfile {
        Doxyfile {
            location,
            chunks: Vec::new(),
            settings: HashMap::new(),
            groups: Vec::new(),
            defaults: Properties::bundled(),
            listeners: Vec::new(),
            separator: LineSeparator::System,
            final_newline: true,
            modified_on_disk: None,
        }
    }

    /// Read and parse a doxyfile from the file system.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Doxyfile> {
        let mut doxyfile = Doxyfile::new(Location::File(path.into()));
        doxyfile.load()?;
        Ok(doxyfile)
    }

    /// Parse text; `location` is only used for identity and saving.
    pub fn from_text(location: Location, text: &str) -> Doxyfile {
        let mut doxyfile = Doxyfile::new(location);
        doxyfile.parse_str(text);
        doxyfile
    }

    /// Use other setting metadata instead of the bundled one.
    pub fn with_defaults(mut self, defaults: Properties) -> Doxyfile {
        self.defaults = defaults;
        self.rebuild_index();
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Absolute path; this is what identifies a doxyfile.
    pub fn path(&self) -> PathBuf {
        self.location.resolved_path()
    }

    pub fn name(&self) -> String {
        self.location.name()
    }

    pub fn directory(&self) -> PathBuf {
        self.location.directory()
    }

    pub fn defaults(&self) -> &Properties {
        &self.defaults
    }

    /// Line separator detected while parsing.
    pub fn line_separator(&self) -> LineSeparator {
        self.separator
    }

    /// False if the parsed text did not end in a line separator.
    pub fn final_newline(&self) -> bool {
        self.final_newline
    }

    /// Read the backing file, replacing everything parsed before.
    pub fn load(&mut self) -> Result<()> {
        let path = self.path();
        let name = path.to_string_lossy().to_string();
        let data = fs::read(&path).map_err(|e| Error::from(e).file(name.clone()))?;
        let text = String::from_utf8(data)
            .map_err(|_| Error::new(ErrorKind::Utf8, "utf-8 error").file(name.clone()))?;
        self.parse_str(&text);
        self.modified_on_disk = modified_time(&path);
        info!("loaded {}: {} chunks, {} settings", name, self.chunks.len(), self.settings.len());
        Ok(())
    }

    /// Parse text, replacing everything parsed before.
    pub fn parse_str(&mut self, text: &str) {
        self.chunks.clear();
        self.settings.clear();
        self.groups.clear();
        let mut parser = Parser::from_text(text);
        for chunk in parser.by_ref() {
            self.adopt(chunk);
        }
        self.separator = parser.separator().unwrap_or_default();
        self.final_newline = parser.final_newline();
        self.notify(&SettingEvent::Reloaded);
    }

    /// Write the doxyfile back to its location.
    pub fn save(&mut self, serializer: &Serializer) -> Result<()> {
        let path = self.path();
        let name = path.to_string_lossy().to_string();
        fs::write(&path, serializer.serialize(self)).map_err(|e| Error::from(e).file(name.clone()))?;
        self.modified_on_disk = modified_time(&path);
        debug!("saved {}", name);
        Ok(())
    }

    /// True if the file on disk changed since it was loaded or saved.
    pub fn changed_on_disk(&self) -> bool {
        modified_time(&self.path()) != self.modified_on_disk
    }

    pub fn add_listener(&mut self, listener: impl SettingListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self, event: &SettingEvent<'_>) {
        for listener in &self.listeners {
            let res = panic::catch_unwind(AssertUnwindSafe(|| listener.setting_changed(event)));
            if res.is_err() {
                warn!("{}: setting listener panicked on {:?}", self.name(), event);
            }
        }
    }

    // Take ownership of a chunk and index it.
    fn adopt(&mut self, chunk: Chunk) -> usize {
        let pos = self.chunks.len();
        self.chunks.push(chunk);
        if let Some(setting) = self.chunks[pos].as_setting() {
            let identifier = setting.identifier().to_string();
            let group = self.group_name(setting);
            if let Some(old) = self.settings.insert(identifier.clone(), pos) {
                let line = self.chunks[old].as_setting().map(|s| s.line()).unwrap_or(0);
                debug!("{}: {} overrides line {}", self.name(), identifier, line);
                for g in &mut self.groups {
                    g.remove(&identifier);
                }
            }
            self.group_mut(&group).add(&identifier);
            self.groups.retain(|g| !g.is_empty());
        }
        pos
    }

    fn rebuild_index(&mut self) {
        let chunks = std::mem::take(&mut self.chunks);
        self.settings.clear();
        self.groups.clear();
        for chunk in chunks {
            self.adopt(chunk);
        }
    }

    fn group_name(&self, setting: &Setting) -> String {
        setting
            .property(properties::GROUP)
            .or_else(|| self.defaults.get(setting.identifier(), properties::GROUP))
            .unwrap_or(properties::OTHERS)
            .to_string()
    }

    fn group_mut(&mut self, name: &str) -> &mut Group {
        let pos = match self.groups.iter().position(|g| g.name() == name) {
            Some(pos) => pos,
            None => {
                self.groups.push(Group::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[pos]
    }

    /// Append a chunk at the end of the file.
    ///
    /// The chunk is moved into the doxyfile, so it belongs to exactly one
    /// file. A setting with an identifier that already exists becomes the
    /// effective setting; the older one stays in the chunk list.
    pub fn append(&mut self, chunk: impl Into<Chunk>) -> &Chunk {
        let pos = self.adopt(chunk.into());
        self.final_newline = true;
        if let Some(setting) = self.chunks[pos].as_setting() {
            self.notify(&SettingEvent::Appended(setting));
        }
        &self.chunks[pos]
    }

    /// Append a new `IDENTIFIER = value` setting.
    pub fn add_setting(&mut self, identifier: &str, value: impl Into<String>) -> &Setting {
        let pos = self.chunks.len();
        self.append(Setting::new(identifier, value));
        match &self.chunks[pos] {
            Chunk::Setting(s) => s,
            Chunk::RawText(_) => unreachable!("just appended a setting"),
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The effective settings, in file order.
    pub fn settings(&self) -> impl Iterator<Item = &Setting> + '_ {
        self.chunks.iter().enumerate().filter_map(move |(i, c)| {
            let s = c.as_setting()?;
            if self.settings.get(s.identifier()) == Some(&i) {
                Some(s)
            } else {
                None
            }
        })
    }

    pub fn setting(&self, identifier: &str) -> Option<&Setting> {
        let pos = *self.settings.get(identifier)?;
        self.chunks[pos].as_setting()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.settings.contains_key(identifier)
    }

    /// Number of distinct settings.
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Groups, in order of first use.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// A property of a setting, falling back to the defaults.
    pub fn property(&self, identifier: &str, name: &str) -> Option<&str> {
        self.setting(identifier)?
            .property(name)
            .or_else(|| self.defaults.get(identifier, name))
    }

    fn position(&self, identifier: &str) -> Result<usize> {
        self.settings
            .get(identifier)
            .copied()
            .ok_or_else(|| Error::unknown_setting(identifier).file(self.name()))
    }

    fn setting_mut(&mut self, identifier: &str) -> Result<(usize, &mut Setting)> {
        let pos = self.position(identifier)?;
        match self.chunks[pos].as_setting_mut() {
            Some(s) => Ok((pos, s)),
            None => Err(Error::unknown_setting(identifier)),
        }
    }

    /// Change the value of a setting. Returns true if it changed.
    pub fn set_value(&mut self, identifier: &str, value: impl Into<String>) -> Result<bool> {
        let (pos, setting) = self.setting_mut(identifier)?;
        if !setting.set_value(value) {
            return Ok(false);
        }
        if let Some(setting) = self.chunks[pos].as_setting() {
            self.notify(&SettingEvent::ValueChanged(setting));
        }
        Ok(true)
    }

    /// Change the value of a setting to a list of compounds.
    pub fn set_values<S: AsRef<str>>(&mut self, identifier: &str, values: &[S]) -> Result<bool> {
        crate::tokenizer::check_values(values)?;
        self.set_value(identifier, crate::tokenizer::join_values(values))
    }

    /// Change a property of a setting. Changing `group` moves the setting
    /// to another group.
    pub fn set_property(
        &mut self,
        identifier: &str,
        name: &str,
        value: impl Into<String>,
    ) -> Result<bool> {
        let (pos, setting) = self.setting_mut(identifier)?;
        if !setting.set_property(name, value) {
            return Ok(false);
        }
        if name == properties::GROUP {
            let group = match self.chunks[pos].as_setting() {
                Some(s) => self.group_name(s),
                None => properties::OTHERS.to_string(),
            };
            for g in &mut self.groups {
                g.remove(identifier);
            }
            self.group_mut(&group).add(identifier);
            self.groups.retain(|g| !g.is_empty());
        }
        if let Some(setting) = self.chunks[pos].as_setting() {
            self.notify(&SettingEvent::PropertyChanged { setting, name });
        }
        Ok(true)
    }

    /// Serialize with the defaults and this file's line separator.
    pub fn to_text(&self) -> String {
        Serializer::for_doxyfile(self).serialize(self)
    }
}

impl PartialEq for Doxyfile {
    fn eq(&self, other: &Doxyfile) -> bool {
        self.path().to_string_lossy() == other.path().to_string_lossy()
    }
}

impl Eq for Doxyfile {}

impl Hash for Doxyfile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path().to_string_lossy().hash(state);
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn doxyfile(text: &str) -> Doxyfile {
        Doxyfile::from_text(Location::File(PathBuf::from("/tmp/project/Doxyfile")), text)
    }

    #[test]
    fn last_appended_setting_wins() {
        init();
        let d = doxyfile("INPUT = a\n# comment\nINPUT = b\n");
        assert_eq!(d.chunks().len(), 3);
        assert_eq!(d.len(), 1);
        assert_eq!(d.setting("INPUT").map(|s| s.value()), Some("b"));
        assert_eq!(d.settings().count(), 1);
        let inputs = d
            .chunks()
            .iter()
            .filter_map(|c| c.as_setting())
            .filter(|s| s.identifier() == "INPUT")
            .count();
        assert_eq!(inputs, 2);
    }

    #[test]
    fn settings_without_group_go_to_others() {
        let mut d = doxyfile("");
        d.append(Setting::new("MY_OWN_TAG", "x"));
        let mut grouped = Setting::new("ANOTHER_TAG", "y");
        grouped.set_property(properties::GROUP, "Custom");
        d.append(grouped);
        assert!(d.group(properties::OTHERS).unwrap().contains("MY_OWN_TAG"));
        assert_eq!(d.group("Custom").unwrap().identifiers(), &["ANOTHER_TAG".to_string()]);
    }

    #[test]
    fn bundled_defaults_provide_groups() {
        let d = doxyfile("PROJECT_NAME = x\nINPUT = src\nNOT_KNOWN = 1\n");
        let names: Vec<_> = d.groups().iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["Project", "Input", "Others"]);
        assert_eq!(d.property("INPUT", properties::TYPE), Some("list"));
    }

    #[test]
    fn empty_defaults_put_everything_in_others() {
        let d = doxyfile("PROJECT_NAME = x\n").with_defaults(Properties::new());
        assert_eq!(d.groups().len(), 1);
        assert_eq!(d.groups()[0].name(), properties::OTHERS);
    }

    #[test]
    fn changing_group_moves_setting() {
        let mut d = doxyfile("MY_TAG = 1\n");
        assert!(d.set_property("MY_TAG", properties::GROUP, "Mine").unwrap());
        assert!(d.group(properties::OTHERS).is_none());
        assert!(d.group("Mine").unwrap().contains("MY_TAG"));
        assert_eq!(d.property("MY_TAG", properties::GROUP), Some("Mine"));
    }

    #[test]
    fn listeners_see_changes_and_survive_panics() {
        let mut d = doxyfile("INPUT = a\n");
        let seen = Arc::new(Mutex::new(Vec::new()));
        d.add_listener(|_: &SettingEvent<'_>| panic!("bad listener"));
        let s = seen.clone();
        d.add_listener(move |e: &SettingEvent<'_>| {
            let what = match e {
                SettingEvent::ValueChanged(s) => format!("value {}", s.value()),
                SettingEvent::PropertyChanged { name, .. } => format!("property {}", name),
                SettingEvent::Appended(s) => format!("appended {}", s.identifier()),
                SettingEvent::Reloaded => "reloaded".to_string(),
            };
            s.lock().unwrap().push(what);
        });
        assert!(d.set_value("INPUT", "b").unwrap());
        assert!(!d.set_value("INPUT", "b").unwrap());
        d.set_property("INPUT", properties::NOTE, "hi").unwrap();
        d.add_setting("RECURSIVE", "YES");
        d.parse_str("");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["value b", "property note", "appended RECURSIVE", "reloaded"]
        );
    }

    #[test]
    fn unknown_setting_is_an_error() {
        let mut d = doxyfile("");
        let err = d.set_value("NOPE", "1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownSetting);
    }

    #[test]
    fn reparse_replaces_chunks() {
        let mut d = doxyfile("INPUT = a\n");
        d.parse_str("INPUT = a\n");
        assert_eq!(d.chunks().len(), 1);
        assert_eq!(d.groups().iter().map(|g| g.len()).sum::<usize>(), 1);
    }

    #[test]
    fn equality_is_by_resolved_path() {
        let a = Doxyfile::new(Location::File(PathBuf::from("/w/proj/./Doxyfile")));
        let b = Doxyfile::new(Location::Workspace {
            root: PathBuf::from("/w"),
            path: PathBuf::from("proj/Doxyfile"),
        });
        let c = Doxyfile::new(Location::File(PathBuf::from("/w/other/Doxyfile")));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(b.location().workspace_path(), Some(Path::new("proj/Doxyfile")));
        assert_eq!(b.directory(), PathBuf::from("/w/proj"));
        assert_eq!(b.name(), "Doxyfile");
    }
}
