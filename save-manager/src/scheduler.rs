//! Fixed-period save and backup timers.
//!
//! Both timers run on the shared `JobScheduler` and never wait on each other.
//! Timer bodies only queue host work on the main path; archive I/O happens
//! inside [`BackupService`] on blocking workers.

use crate::config::Config;
use crate::executor::BackupService;
use crate::host::MainPath;
use crate::utils::color::translate_alternate_color_codes;
use crate::utils::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Gap between the "preparing" and "saving" notices.
pub const SAVE_NOTICE_DELAY: Duration = Duration::from_secs(5);

/// What the timers do when they fire.
pub struct MaintenanceTasks {
    config: Arc<Config>,
    main: MainPath,
    backups: Arc<BackupService>,
    save_notice_delay: Duration,
    sweep_running: AtomicBool,
}

impl MaintenanceTasks {
    pub fn new(config: Arc<Config>, main: MainPath, backups: Arc<BackupService>) -> Self {
        Self {
            config,
            main,
            backups,
            save_notice_delay: SAVE_NOTICE_DELAY,
            sweep_running: AtomicBool::new(false),
        }
    }

    pub fn with_save_notice_delay(mut self, delay: Duration) -> Self {
        self.save_notice_delay = delay;
        self
    }

    fn notice(&self, template: &str) {
        if self.config.enable_broadcast {
            self.main
                .broadcast(translate_alternate_color_codes('&', template));
        }
    }

    /// Save timer: announce, then save on the main path after a short delay.
    pub fn save_tick(&self) -> JoinHandle<()> {
        let messages = &self.config.broadcast_messages;
        self.notice(&messages.preparing);

        let saving = self
            .config
            .enable_broadcast
            .then(|| translate_alternate_color_codes('&', &messages.saving));

        self.main.execute_later(self.save_notice_delay, move |host| {
            if let Some(saving) = saving {
                host.broadcast(&saving);
            }
            match host.save_all() {
                Ok(()) => tracing::info!("Worlds saved automatically."),
                Err(e) => tracing::error!("Automatic save failed: {:#}", e),
            }
        })
    }

    /// Backup timer: archive every configured world, one after another.
    ///
    /// Returns false when skipped because the previous sweep is still running.
    pub async fn backup_sweep(&self) -> bool {
        let Some(_sweep) = SweepGuard::acquire(&self.sweep_running) else {
            tracing::warn!("Skipping scheduled backup: previous sweep still running");
            return false;
        };

        let messages = &self.config.broadcast_messages;
        self.notice(&messages.backing_up);

        for world in &self.config.worlds {
            let destination = self.config.backup_directory(&world.directory);
            // Failures are logged by the service and only end that world's job
            let _ = self.backups.backup(&world.name, &destination).await;
        }

        self.notice(&messages.backup_complete);
        true
    }
}

/// Holds the sweep flag for the lifetime of one sweep.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepGuard(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MaintenanceScheduler {
    scheduler: Mutex<JobScheduler>,
    tasks: Arc<MaintenanceTasks>,
}

impl MaintenanceScheduler {
    pub async fn new(tasks: Arc<MaintenanceTasks>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            tasks,
        })
    }

    /// Register the save timer and, when enabled, the backup timer.
    pub async fn init_schedules(&self) -> Result<()> {
        let config = Arc::clone(&self.tasks.config);

        let tasks = Arc::clone(&self.tasks);
        let save_job = Job::new_repeated_async(config.save_period(), move |_uuid, _lock| {
            let tasks = Arc::clone(&tasks);
            Box::pin(async move {
                tasks.save_tick();
            })
        })?;
        self.scheduler.lock().await.add(save_job).await?;
        tracing::info!(interval_secs = config.save_interval, "Save timer registered");

        if !config.enable_backups {
            tracing::info!("Backups disabled, backup timer not registered");
            return Ok(());
        }

        let tasks = Arc::clone(&self.tasks);
        let backup_job = Job::new_repeated_async(config.backup_period(), move |_uuid, _lock| {
            let tasks = Arc::clone(&tasks);
            Box::pin(async move {
                tasks.backup_sweep().await;
            })
        })?;
        self.scheduler.lock().await.add(backup_job).await?;
        tracing::info!(
            interval_secs = config.backup_interval,
            worlds = config.worlds.len(),
            "Backup timer registered"
        );

        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler.lock().await.start().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.lock().await.shutdown().await?;
        Ok(())
    }
}
