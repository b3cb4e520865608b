//! Console command surface: one command per stdin line.

use super::{CommandDispatcher, CommandSender};
use crate::utils::color::{strip_color, RED};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The operator at the terminal. Holds every permission.
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        "CONSOLE"
    }

    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn send_message(&self, message: &str) {
        tracing::info!("[Console] {}", strip_color(message));
    }
}

/// Split a command line into its label and arguments. A leading `/` is optional.
pub fn parse_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut parts = line.split_whitespace();
    let label = parts.next()?.to_string();
    Some((label, parts.map(String::from).collect()))
}

/// Read stdin on a detached thread so a pending read never holds up exit.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);

    let spawned = std::thread::Builder::new()
        .name("console-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read console input: {}", e);
                        break;
                    }
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Console input unavailable: {}", e);
    }

    rx
}

/// Run console commands until stdin closes, `stop`, or cancellation.
pub async fn run_console(dispatcher: Arc<CommandDispatcher>, shutdown: CancellationToken) {
    run_lines(spawn_stdin_reader(), dispatcher, Arc::new(ConsoleSender), shutdown).await;
}

async fn run_lines(
    mut lines: mpsc::Receiver<String>,
    dispatcher: Arc<CommandDispatcher>,
    sender: Arc<dyn CommandSender>,
    shutdown: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.recv() => line,
        };

        let Some(line) = line else {
            tracing::debug!("Console input closed");
            break;
        };

        let Some((label, args)) = parse_command_line(&line) else {
            continue;
        };

        if label.eq_ignore_ascii_case("stop") {
            tracing::info!("Stop requested from console");
            shutdown.cancel();
            break;
        }

        if !dispatcher.dispatch(Arc::clone(&sender), &label, &args) {
            sender.send_message(&format!("{}Unknown command: {}", RED, label));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveOptions;
    use crate::commands::testing::TestSender;
    use crate::config::Config;
    use crate::executor::BackupService;
    use crate::host::process::WorldContainer;
    use crate::host::testing::RecordingHost;
    use crate::host::MainLoop;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_parse_command_line() {
        assert_eq!(
            parse_command_line("  /backup world  "),
            Some(("backup".to_string(), vec!["world".to_string()]))
        );
        assert_eq!(
            parse_command_line("backup a b"),
            Some(("backup".to_string(), vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(parse_command_line("   "), None);
        assert_eq!(parse_command_line("/"), None);
    }

    #[tokio::test]
    async fn test_console_lines_dispatch_and_stop() {
        let temp = TempDir::new().unwrap();
        let (main, _main_loop) = MainLoop::start(RecordingHost::default()).unwrap();
        let backups = BackupService::new(
            Arc::new(WorldContainer::new(temp.path())),
            ArchiveOptions::default(),
            Duration::from_millis(5),
        );
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::new(Config::default()),
            main,
            Arc::new(backups),
        ));
        let sender = TestSender::permitted();
        let shutdown = CancellationToken::new();

        let (tx, rx) = mpsc::channel(8);
        for line in ["", "help", "backup", "stop", "backup world"] {
            tx.send(line.to_string()).await.unwrap();
        }

        run_lines(rx, dispatcher, sender.clone(), shutdown.clone()).await;

        assert!(shutdown.is_cancelled());
        assert_eq!(
            sender.messages(),
            vec!["§cUnknown command: help", "§cUsage: /backup <world_name>"]
        );
    }

    #[tokio::test]
    async fn test_console_ends_when_input_closes() {
        let temp = TempDir::new().unwrap();
        let (main, _main_loop) = MainLoop::start(RecordingHost::default()).unwrap();
        let backups = BackupService::new(
            Arc::new(WorldContainer::new(temp.path())),
            ArchiveOptions::default(),
            Duration::from_millis(5),
        );
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::new(Config::default()),
            main,
            Arc::new(backups),
        ));
        let shutdown = CancellationToken::new();

        let (tx, rx) = mpsc::channel::<String>(1);
        drop(tx);

        run_lines(rx, dispatcher, TestSender::permitted(), shutdown.clone()).await;
        assert!(!shutdown.is_cancelled());
    }
}
