//! Backup job executor - Orchestrates one world backup.
//!
//! A job resolves the world, prepares the output directory, fixes the file
//! manifest and then runs the zip writer on a blocking worker while a
//! progress tracker samples it. Failures end the job, never the caller.

use crate::archive::progress::{format_bytes, format_duration, log_report};
use crate::archive::{write_archive, ArchiveOptions, ProgressCounter, ProgressReport, ProgressTracker};
use crate::config::Config;
use crate::fs::walker::{build_manifest, Manifest, WalkOptions};
use crate::host::WorldResolver;
use crate::utils::Result;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const ARCHIVE_EXTENSION: &str = "zip";

pub type ReportSink = Arc<dyn Fn(ProgressReport) + Send + Sync>;

/// One backup run, fixed at trigger time.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub id: Uuid,
    pub world: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub archive_path: PathBuf,
    pub created: DateTime<Local>,
}

impl ArchiveJob {
    pub fn new(world: &str, source: PathBuf, destination: &Path, created: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            world: world.to_string(),
            archive_path: destination.join(archive_file_name(world, &created)),
            source,
            destination: destination.to_path_buf(),
            created,
        }
    }
}

/// `<world>_<yyyy-MM-dd_HH-mm-ss>.zip`
///
/// Second precision: two jobs for one world in the same second share a name
/// and the later one overwrites the earlier archive.
pub fn archive_file_name(world: &str, created: &DateTime<Local>) -> String {
    format!(
        "{}_{}.{}",
        world,
        created.format("%Y-%m-%d_%H-%M-%S"),
        ARCHIVE_EXTENSION
    )
}

/// Backup execution result
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub world: String,
    pub archive_path: PathBuf,
    pub files: usize,
    pub bytes: u64,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub enum BackupOutcome {
    Completed(ArchiveSummary),

    /// The host does not currently have this world; nothing was touched
    WorldUnavailable,

    /// Another backup of the same world is still running in this process
    AlreadyRunning,
}

/// Runs archive jobs for named worlds.
pub struct BackupService {
    resolver: Arc<dyn WorldResolver>,
    options: ArchiveOptions,
    progress_interval: Duration,
    on_report: ReportSink,
    running: Arc<Mutex<HashSet<String>>>,
}

impl BackupService {
    pub fn new(
        resolver: Arc<dyn WorldResolver>,
        options: ArchiveOptions,
        progress_interval: Duration,
    ) -> Self {
        Self {
            resolver,
            options,
            progress_interval,
            on_report: Arc::new(log_report),
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn from_config(config: &Config, resolver: Arc<dyn WorldResolver>) -> Self {
        Self::new(
            resolver,
            ArchiveOptions::from(&config.archive),
            config.progress_interval(),
        )
    }

    /// Replace where progress reports go (the log by default).
    pub fn with_report_sink(mut self, sink: ReportSink) -> Self {
        self.on_report = sink;
        self
    }

    /// Back up `world` into `destination`, named after the current local time.
    pub async fn backup(&self, world: &str, destination: &Path) -> Result<BackupOutcome> {
        self.backup_at(world, destination, Local::now()).await
    }

    /// Back up `world` with an explicit job timestamp.
    pub async fn backup_at(
        &self,
        world: &str,
        destination: &Path,
        created: DateTime<Local>,
    ) -> Result<BackupOutcome> {
        let Some(source) = self.resolver.world_folder(world) else {
            warn!("World not found: {}", world);
            return Ok(BackupOutcome::WorldUnavailable);
        };

        let Some(_running) = RunningGuard::acquire(&self.running, world) else {
            warn!("Backup of world {} is already running, skipping", world);
            return Ok(BackupOutcome::AlreadyRunning);
        };

        let job = ArchiveJob::new(world, source, destination, created);
        info!(
            job_id = %job.id,
            "Starting backup of world {} from {}",
            job.world,
            job.source.display()
        );

        match self.run_job(&job).await {
            Ok(summary) => {
                info!(
                    job_id = %job.id,
                    "Backed up world {} to {} ({} files, {}, {})",
                    job.world,
                    summary.archive_path.display(),
                    summary.files,
                    format_bytes(summary.bytes),
                    format_duration(summary.duration.as_secs())
                );
                Ok(BackupOutcome::Completed(summary))
            }
            Err(e) => {
                error!(job_id = %job.id, "Failed to back up world {}: {}", job.world, e);
                Err(e)
            }
        }
    }

    async fn run_job(&self, job: &ArchiveJob) -> Result<ArchiveSummary> {
        let start_time = Instant::now();

        let source = job.source.clone();
        let destination = job.destination.clone();
        let manifest = tokio::task::spawn_blocking(move || prepare(&source, &destination)).await??;
        let total = manifest.len();

        let counter = ProgressCounter::new();
        let done = CancellationToken::new();
        let sink = Arc::clone(&self.on_report);
        let tracker = ProgressTracker::new(
            &job.world,
            counter.clone(),
            total,
            self.progress_interval,
            done.clone(),
        )
        .spawn(move |report| sink(report));

        let archive_path = job.archive_path.clone();
        let options = self.options.clone();
        let result = tokio::task::spawn_blocking(move || {
            // Stops the tracker however the writer exits
            let _done = done.drop_guard();
            write_archive(&manifest, &archive_path, &options, &counter)
        })
        .await;

        let _ = tracker.await;
        let stats = result??;

        Ok(ArchiveSummary {
            world: job.world.clone(),
            archive_path: job.archive_path.clone(),
            files: stats.files,
            bytes: stats.bytes,
            duration: start_time.elapsed(),
        })
    }
}

/// Create the output directory and fix the manifest. Blocking.
fn prepare(source: &Path, destination: &Path) -> Result<Manifest> {
    std::fs::create_dir_all(destination)?;

    // An output directory inside the world must not end up in its own archive
    let mut options = WalkOptions::default();
    if let (Ok(src), Ok(dst)) = (source.canonicalize(), destination.canonicalize()) {
        if let Ok(inner) = dst.strip_prefix(&src) {
            options.exclude.push(source.join(inner));
        }
    }

    Ok(build_manifest(source, &options)?)
}

/// Marks a world as being backed up until dropped.
struct RunningGuard {
    running: Arc<Mutex<HashSet<String>>>,
    world: String,
}

impl RunningGuard {
    fn acquire(running: &Arc<Mutex<HashSet<String>>>, world: &str) -> Option<Self> {
        let mut set = running.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(world.to_string()) {
            return None;
        }
        Some(Self {
            running: Arc::clone(running),
            world: world.to_string(),
        })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut set = self.running.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.world);
    }
}
