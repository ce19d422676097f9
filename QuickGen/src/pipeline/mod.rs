//! Batch conversion pipeline
//!
//! Drives one named conversion across every matching file under a source
//! directory. Jobs run one at a time and independently of each other: a
//! per-file failure is recorded and the batch moves on, while a fatal
//! (library-level) failure stops it.

mod discovery;
mod job;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use cwbridge::codec::{AssetCodec, Conversion};

use crate::error::{Error, Result};

pub use discovery::{find_source_files, has_suffix};
pub use job::{ConversionJob, output_name};

/// What to convert and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub conversion: Conversion,
    /// Directory searched recursively for sources; must exist.
    pub source_dir: PathBuf,
    /// Directory outputs are written to; created if missing.
    pub target_dir: PathBuf,
}

/// Progress notifications for a batch
#[derive(Debug)]
pub enum JobEvent<'a> {
    /// Jobs were planned; nothing has run yet.
    Planned { total: usize },
    /// A job finished and its output was written.
    Converted {
        job: &'a ConversionJob,
        current: usize,
        total: usize,
    },
    /// A job failed on its own input; the batch continues.
    Failed {
        job: &'a ConversionJob,
        error: &'a cwbridge::Error,
        current: usize,
        total: usize,
    },
}

/// A job that failed, with the reason
#[derive(Debug)]
pub struct FailedJob {
    pub job: ConversionJob,
    pub error: cwbridge::Error,
}

/// Result of a batch run
#[derive(Debug)]
pub struct BatchReport {
    pub conversion: Conversion,
    /// Jobs whose output was written, in processing order
    pub converted: Vec<ConversionJob>,
    /// Jobs that failed on their own input
    pub failed: Vec<FailedJob>,
}

impl BatchReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Plan the jobs for every source under `source_dir`
pub fn plan_jobs(source_dir: &Path, target_dir: &Path, conversion: Conversion) -> Vec<ConversionJob> {
    let jobs: Vec<_> = find_source_files(source_dir, conversion)
        .into_iter()
        .filter_map(|source| ConversionJob::new(conversion, source, target_dir))
        .collect();

    // Outputs are flat, so same-named sources in different folders collide.
    let mut owners: HashMap<&Path, &Path> = HashMap::new();
    for job in &jobs {
        if let Some(previous) = owners.insert(&job.target, &job.source) {
            tracing::warn!(
                "{} overwrites the output of {} ({})",
                job.source.display(),
                previous.display(),
                job.name
            );
        }
    }

    jobs
}

/// Run a batch
///
/// # Errors
/// - `SourceNotFound` if the source directory does not exist (nothing is written)
/// - `Bridge` if the codec cannot perform the conversion at all (nothing is written)
/// - `BatchAborted` if a job fails in a way that rules out the remaining jobs
pub fn run<C, F>(codec: &C, request: &BatchRequest, progress: F) -> Result<BatchReport>
where
    C: AssetCodec + ?Sized,
    F: Fn(&JobEvent<'_>),
{
    let conversion = request.conversion;
    if !request.source_dir.is_dir() {
        return Err(Error::SourceNotFound(request.source_dir.clone()));
    }

    codec.check(conversion)?;

    fs::create_dir_all(&request.target_dir)?;

    tracing::info!(
        "Converting {conversion}: {:?} -> {:?}",
        request.source_dir,
        request.target_dir
    );
    let jobs = plan_jobs(&request.source_dir, &request.target_dir, conversion);
    let total = jobs.len();
    progress(&JobEvent::Planned { total });

    let mut report = BatchReport {
        conversion,
        converted: Vec::with_capacity(total),
        failed: Vec::new(),
    };

    for (index, job) in jobs.into_iter().enumerate() {
        let current = index + 1;
        match job.run(codec) {
            Ok(()) => {
                progress(&JobEvent::Converted {
                    job: &job,
                    current,
                    total,
                });
                report.converted.push(job);
            }
            Err(error) if error.is_fatal() => {
                tracing::error!("Aborting batch at {}: {error}", job.source.display());
                return Err(Error::BatchAborted {
                    job: job.name,
                    source: error,
                });
            }
            Err(error) => {
                tracing::debug!("{} failed: {error}", job.source.display());
                progress(&JobEvent::Failed {
                    job: &job,
                    error: &error,
                    current,
                    total,
                });
                report.failed.push(FailedJob { job, error });
            }
        }
    }

    tracing::info!(
        "Converted {} of {} files ({} failed)",
        report.converted.len(),
        total,
        report.failed.len()
    );
    Ok(report)
}
