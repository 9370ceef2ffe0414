//! Running doxygen on a doxyfile.
//!
//! A `BuildJob` starts the generator as a child process, drains its
//! stdout and stderr on two threads into one log, and turns the log
//! into markers when the process is done.
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::doxyfile::{Doxyfile, Location};
use crate::error::{Error, ErrorKind, Result};
use crate::marker::{self, Marker};

/// How often the supervising thread checks for exit and cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The program to run and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: PathBuf,
    /// Arguments put before the doxyfile path.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub variables: BTreeMap<String, String>,
}

impl BuildCommand {
    pub fn new(program: impl Into<PathBuf>) -> BuildCommand {
        BuildCommand {
            program: program.into(),
            args: Vec::new(),
            variables: BTreeMap::new(),
        }
    }

    /// Find `doxygen` in `$PATH`.
    pub fn detect() -> Result<BuildCommand> {
        which::which("doxygen")
            .map(BuildCommand::new)
            .map_err(|e| Error::new(ErrorKind::Launch, format!("doxygen not found: {}", e)))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> BuildCommand {
        self.args.push(arg.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> BuildCommand {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// The variable the platform's dynamic loader searches.
    pub fn library_path_variable() -> &'static str {
        if cfg!(windows) {
            "PATH"
        } else if cfg!(target_os = "macos") {
            "DYLD_LIBRARY_PATH"
        } else {
            "LD_LIBRARY_PATH"
        }
    }

    // Library search path with the program's directory in front.
    fn library_path(&self) -> Option<OsString> {
        let dir = self.program.parent().filter(|d| !d.as_os_str().is_empty())?;
        let current = env::var_os(Self::library_path_variable()).unwrap_or_default();
        let paths = std::iter::once(dir.to_path_buf()).chain(env::split_paths(&current));
        match env::join_paths(paths) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("cannot extend {}: {}", Self::library_path_variable(), e);
                None
            }
        }
    }

    fn command(&self, doxyfile: &Path, directory: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(doxyfile)
            .current_dir(directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = self.library_path() {
            cmd.env(Self::library_path_variable(), path);
        }
        cmd.envs(&self.variables);
        // Own process group, so a cancel reaches the tools doxygen starts.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    /// Non-zero exit. `None` if killed by a signal.
    Failed(Option<i32>),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Never ran.
    Idle,
    Running,
    Finished(Outcome),
}

/// Gets told what a job is doing. Calls come from the job's threads.
pub trait JobListener: Send + Sync {
    /// A new run started, the log is empty again.
    fn log_cleared(&self, _job: &BuildJob) {}
    /// A line was read from the child.
    fn log_appended(&self, _job: &BuildJob, _text: &str) {}
    /// The job was dropped from its registry.
    fn job_removed(&self, _job: &BuildJob) {}
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// The doxygen run for one doxyfile.
pub struct BuildJob {
    location: Location,
    command: Mutex<BuildCommand>,
    state: Mutex<JobState>,
    log: Mutex<String>,
    markers: Mutex<Vec<Marker>>,
    listeners: Mutex<Vec<Arc<dyn JobListener>>>,
    cancel: AtomicBool,
}

impl fmt::Debug for BuildJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildJob")
            .field("doxyfile", &self.path())
            .field("state", &self.state())
            .finish()
    }
}

impl BuildJob {
    pub fn new(doxyfile: &Doxyfile, command: BuildCommand) -> BuildJob {
        BuildJob {
            location: doxyfile.location().clone(),
            command: Mutex::new(command),
            state: Mutex::new(JobState::Idle),
            log: Mutex::new(String::new()),
            markers: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            cancel: AtomicBool::new(false),
        }
    }

    /// Absolute path of the doxyfile.
    pub fn path(&self) -> PathBuf {
        self.location.resolved_path()
    }

    /// True if this job builds `doxyfile`.
    pub fn is_for(&self, doxyfile: &Doxyfile) -> bool {
        self.path().to_string_lossy() == doxyfile.path().to_string_lossy()
    }

    pub fn command(&self) -> BuildCommand {
        lock(&self.command).clone()
    }

    /// Takes effect on the next run.
    pub fn set_command(&self, command: BuildCommand) {
        *lock(&self.command) = command;
    }

    pub fn state(&self) -> JobState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == JobState::Running
    }

    /// Everything read from the child so far.
    pub fn log(&self) -> String {
        lock(&self.log).clone()
    }

    /// Markers of the last finished run.
    pub fn markers(&self) -> Vec<Marker> {
        lock(&self.markers).clone()
    }

    pub fn add_listener(&self, listener: Arc<dyn JobListener>) {
        lock(&self.listeners).push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn JobListener>) {
        lock(&self.listeners).retain(|l| !Arc::ptr_eq(l, listener));
    }

    // Call every listener; one that panics does not stop the others.
    fn notify(&self, what: &str, f: impl Fn(&dyn JobListener)) {
        let listeners = lock(&self.listeners).clone();
        for listener in &listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| f(listener.as_ref()))).is_err() {
                warn!("{}: job listener panicked in {}", self.path().display(), what);
            }
        }
    }

    pub(crate) fn notify_removed(&self) {
        self.notify("job_removed", |l| l.job_removed(self));
    }

    /// Ask a running job to stop. Does nothing if it is not running.
    ///
    /// A job is running from the moment `run()` or `schedule()` is called,
    /// so a cancel right after `schedule()` is never lost. On unix the
    /// whole process group of the child is killed; elsewhere only the
    /// child itself, and the run ends when its children close the output.
    pub fn cancel(&self) {
        let state = lock(&self.state);
        if *state == JobState::Running {
            debug!("{}: cancel requested", self.path().display());
            self.cancel.store(true, Ordering::SeqCst);
        }
    }

    fn append_log(&self, text: &str) {
        lock(&self.log).push_str(text);
        self.notify("log_appended", |l| l.log_appended(self, text));
    }

    fn drain<R: Read>(&self, r: R) {
        let mut reader = BufReader::new(r);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
                    self.append_log(&format!("{}\n", line));
                }
                Err(e) => {
                    warn!("{}: reading output: {}", self.path().display(), e);
                    break;
                }
            }
        }
    }

    fn supervise(&self, child: &mut Child) -> Result<Outcome> {
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                info!("{}: cancelled, killing process {}", self.path().display(), child.id());
                kill(child);
                return Ok(Outcome::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(Outcome::Ok),
                Ok(Some(status)) => return Ok(Outcome::Failed(status.code())),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill(child);
                    return Err(e.into());
                }
            }
        }
    }

    // The cancel flag is only reset here, under the state lock.
    fn finish(&self, outcome: Outcome) {
        let mut state = lock(&self.state);
        *state = JobState::Finished(outcome);
        self.cancel.store(false, Ordering::SeqCst);
    }

    // Mark the job running and start a fresh log.
    fn start(&self) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if *state == JobState::Running {
                return Err(Error::new(ErrorKind::Launch, "build is already running")
                    .file(self.path().to_string_lossy()));
            }
            *state = JobState::Running;
        }
        lock(&self.log).clear();
        lock(&self.markers).clear();
        self.notify("log_cleared", |l| l.log_cleared(self));
        Ok(())
    }

    /// Run doxygen and wait for it.
    ///
    /// Errors only if the process could not be started or waited for; a
    /// build that fails is `Ok(Outcome::Failed(..))`.
    pub fn run(&self) -> Result<Outcome> {
        self.start()?;
        self.execute()
    }

    fn execute(&self) -> Result<Outcome> {
        let command = self.command();
        let path = self.path();
        let directory = self.location.directory();
        if self.cancel.load(Ordering::SeqCst) {
            info!("{}: cancelled before start", path.display());
            self.finish(Outcome::Cancelled);
            return Ok(Outcome::Cancelled);
        }
        info!("{}: running {}", path.display(), command);

        let mut child = match command.command(&path, &directory).spawn() {
            Ok(child) => child,
            Err(e) => {
                self.finish(Outcome::Failed(None));
                return Err(Error::new(ErrorKind::Launch, format!("{}: {}", command.program.display(), e))
                    .file(path.to_string_lossy()));
            }
        };
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Leaving the scope joins both drain threads.
        let result = thread::scope(|s| {
            if let Some(out) = stdout {
                s.spawn(move || self.drain(out));
            }
            if let Some(err) = stderr {
                s.spawn(move || self.drain(err));
            }
            self.supervise(&mut child)
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.finish(Outcome::Failed(None));
                return Err(e.file(path.to_string_lossy()));
            }
        };
        if outcome != Outcome::Cancelled {
            let markers = marker::parse_log(&self.log(), &directory);
            *lock(&self.markers) = markers;
        }
        info!("{}: finished: {:?}", path.display(), outcome);
        self.finish(outcome);
        Ok(outcome)
    }

    /// Run on a background thread. The job is running when this returns.
    pub fn schedule(self: &Arc<Self>) -> thread::JoinHandle<Result<Outcome>> {
        let started = self.start();
        let job = Arc::clone(self);
        thread::spawn(move || {
            started?;
            job.execute()
        })
    }
}

// Kill the child and, on unix, everything else in its process group.
fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = child.id() as libc::pid_t;
        // SAFETY: plain syscall; the group was created for this child.
        unsafe { libc::kill(-pgid, libc::SIGKILL) };
    }
    let _ = child.kill();
    let _ = child.wait();
}
