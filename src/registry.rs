//! One build job per doxyfile.
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;

use crate::doxyfile::Doxyfile;
use crate::job::{BuildCommand, BuildJob, JobState};

static GLOBAL: Lazy<JobRegistry> = Lazy::new(JobRegistry::new);

/// Keeps at most one `BuildJob` per doxyfile path, most recently
/// requested first.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<Vec<Arc<BuildJob>>>,
}

impl JobRegistry {
    pub fn new() -> JobRegistry {
        JobRegistry::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static JobRegistry {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<BuildJob>>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The job for `doxyfile`, created if needed. An existing job gets
    /// `command` for its next run.
    pub fn get_or_create(&self, doxyfile: &Doxyfile, command: BuildCommand) -> Arc<BuildJob> {
        let mut jobs = self.lock();
        let job = match jobs.iter().position(|j| j.is_for(doxyfile)) {
            Some(pos) => {
                let job = jobs.remove(pos);
                job.set_command(command);
                job
            }
            None => {
                debug!("registry: new job for {}", doxyfile.path().display());
                Arc::new(BuildJob::new(doxyfile, command))
            }
        };
        jobs.insert(0, Arc::clone(&job));
        job
    }

    pub fn find(&self, doxyfile: &Doxyfile) -> Option<Arc<BuildJob>> {
        self.lock().iter().find(|j| j.is_for(doxyfile)).cloned()
    }

    /// Drop the job for `doxyfile`. Its listeners are told.
    pub fn remove(&self, doxyfile: &Doxyfile) -> Option<Arc<BuildJob>> {
        let job = {
            let mut jobs = self.lock();
            let pos = jobs.iter().position(|j| j.is_for(doxyfile))?;
            jobs.remove(pos)
        };
        job.notify_removed();
        Some(job)
    }

    /// Drop all jobs that have finished a run. Idle and running jobs
    /// stay. Returns how many were dropped.
    pub fn remove_finished(&self) -> usize {
        let removed: Vec<_> = {
            let mut jobs = self.lock();
            let (done, kept): (Vec<_>, Vec<_>) = jobs
                .drain(..)
                .partition(|j| matches!(j.state(), JobState::Finished(_)));
            *jobs = kept;
            done
        };
        for job in &removed {
            job.notify_removed();
        }
        removed.len()
    }

    /// All jobs, most recently requested first.
    pub fn jobs(&self) -> Vec<Arc<BuildJob>> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
