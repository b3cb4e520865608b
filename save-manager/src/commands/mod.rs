//! Command dispatch and the `backup <world>` command.
//!
//! Commands arrive from any surface (console, HTTP) together with the
//! [`CommandSender`] that issued them. Dispatch returns whether the command
//! was handled; validation errors are reported to the sender and still count
//! as handled.
//!
//! Replies made during dispatch go straight to the sender on the caller's
//! thread. Only the completion reply of a background backup is queued on the
//! main path.

pub mod console;

use crate::config::Config;
use crate::executor::{BackupOutcome, BackupService};
use crate::host::MainPath;
use crate::utils::color::{GREEN, RED, YELLOW};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const BACKUP_PERMISSION: &str = "savemanager.backup";

/// Whoever issued a command.
pub trait CommandSender: Send + Sync {
    fn name(&self) -> &str;
    fn has_permission(&self, permission: &str) -> bool;
    fn send_message(&self, message: &str);
}

pub struct CommandDispatcher {
    config: Arc<Config>,
    main: MainPath,
    backups: Arc<BackupService>,
}

impl CommandDispatcher {
    pub fn new(config: Arc<Config>, main: MainPath, backups: Arc<BackupService>) -> Self {
        Self {
            config,
            main,
            backups,
        }
    }

    /// Route a command by name (case-insensitive). False when unknown.
    pub fn dispatch(&self, sender: Arc<dyn CommandSender>, label: &str, args: &[String]) -> bool {
        if label.eq_ignore_ascii_case("backup") {
            self.backup(sender, args);
            return true;
        }
        false
    }

    /// `backup <world>`. Returns the background job when one was started.
    pub fn backup(&self, sender: Arc<dyn CommandSender>, args: &[String]) -> Option<JoinHandle<()>> {
        if !sender.has_permission(BACKUP_PERMISSION) {
            sender.send_message(&format!("{}You don't have permission to do that.", RED));
            return None;
        }

        let [world] = args else {
            sender.send_message(&format!("{}Usage: /backup <world_name>", RED));
            return None;
        };

        let world = world.clone();
        let destination = self.config.backup_directory(&world);
        sender.send_message(&format!("{}Starting backup for world: {}", YELLOW, world));
        tracing::info!("{} requested a backup of world {}", sender.name(), world);

        let backups = Arc::clone(&self.backups);
        let main = self.main.clone();
        Some(tokio::spawn(async move {
            let reply = match backups.backup(&world, &destination).await {
                Ok(BackupOutcome::Completed(_)) => {
                    format!("{}Backup for world '{}' completed.", GREEN, world)
                }
                Ok(BackupOutcome::WorldUnavailable) => {
                    format!("{}World not found: {}", RED, world)
                }
                Ok(BackupOutcome::AlreadyRunning) => {
                    format!("{}A backup of world '{}' is already running.", RED, world)
                }
                Err(e) => format!("{}Backup for world '{}' failed: {}", RED, world, e),
            };
            main.execute(move |_| sender.send_message(&reply));
        }))
    }
}
