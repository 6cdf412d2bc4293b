//! Batch remuxing of a directory tree.
//!
//! Files are discovered up front, their output names resolved and reserved,
//! then remuxed concurrently with at most one operation per available core.

use remuxer_common::paths::{has_extension, output_path_with};
use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One planned remux operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Results of a batch run. Every job lands in exactly one list.
#[derive(Debug)]
pub struct BatchSummary<T> {
    pub succeeded: Vec<(BatchJob, T)>,
    /// Failed jobs with the error message. Jobs that never started because
    /// the run was cancelled are reported here too.
    pub failed: Vec<(BatchJob, String)>,
}

impl<T> BatchSummary<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Number of operations allowed in flight.
///
/// `max_jobs = 0` means one per core; larger requests are capped at the core
/// count.
pub fn concurrency_limit(max_jobs: usize) -> usize {
    let cores = num_cpus::get().max(1);
    if max_jobs == 0 {
        cores
    } else {
        max_jobs.min(cores)
    }
}

/// Recursively find files under `dir` with one of `extensions`, sorted.
pub fn discover<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Error walking directory: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, extensions))
        .collect();

    files.sort();
    debug!("Discovered {} files under {:?}", files.len(), dir);
    files
}

/// Resolve an output path for every input.
///
/// Names already on disk and names handed to earlier inputs are both
/// considered taken, so inputs sharing a stem never collide. Inputs whose
/// name cannot be resolved are returned separately with the reason.
pub fn plan_jobs(inputs: Vec<PathBuf>, extension: &str) -> (Vec<BatchJob>, Vec<(PathBuf, String)>) {
    plan_jobs_with(inputs, extension, |path| path.exists())
}

pub(crate) fn plan_jobs_with<F>(
    inputs: Vec<PathBuf>,
    extension: &str,
    mut exists: F,
) -> (Vec<BatchJob>, Vec<(PathBuf, String)>)
where
    F: FnMut(&Path) -> bool,
{
    let mut reserved: HashSet<PathBuf> = HashSet::new();
    let mut jobs = Vec::with_capacity(inputs.len());
    let mut rejected = Vec::new();

    for input in inputs {
        match output_path_with(&input, extension, |p| reserved.contains(p) || exists(p)) {
            Ok(output) => {
                reserved.insert(output.clone());
                jobs.push(BatchJob { input, output });
            }
            Err(e) => rejected.push((input, e.to_string())),
        }
    }

    (jobs, rejected)
}

/// Run `job` for every planned job with at most `limit` in flight.
///
/// Each job runs on the blocking pool. Once `cancel` fires, jobs that have
/// not started are failed without running; running ones finish.
pub async fn run_batch<T, E, F>(
    jobs: Vec<BatchJob>,
    limit: usize,
    cancel: CancellationToken,
    job: F,
) -> BatchSummary<T>
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: Fn(&BatchJob) -> Result<T, E> + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let job = Arc::new(job);
    let mut handles = Vec::with_capacity(jobs.len());

    for planned in jobs {
        let sem = semaphore.clone();
        let job = job.clone();
        let cancel = cancel.clone();
        let owned = planned.clone();

        let handle = tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = sem.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                return Err("cancelled before start".to_string());
            };

            tokio::task::spawn_blocking(move || (*job)(&owned).map_err(|e| e.to_string()))
                .await
                .unwrap_or_else(|e| Err(format!("task failed: {}", e)))
        });
        handles.push((planned, handle));
    }

    let mut summary = BatchSummary {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };

    for (planned, handle) in handles {
        let result = handle
            .await
            .unwrap_or_else(|e| Err(format!("task failed: {}", e)));

        match result {
            Ok(value) => {
                info!("Remuxed {:?} -> {:?}", planned.input, planned.output);
                summary.succeeded.push((planned, value));
            }
            Err(message) => {
                warn!("Failed {:?}: {}", planned.input, message);
                summary.failed.push((planned, message));
            }
        }
    }

    summary
}
