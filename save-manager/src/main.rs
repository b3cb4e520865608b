//! Save Manager - Main entry point
//!
//! Runs the save and backup timers next to a game server and accepts
//! `backup <world>` from the console and the HTTP control API.

use anyhow::Result;
use clap::Parser;
use save_manager::api::{self, AppState};
use save_manager::commands::{console::run_console, CommandDispatcher};
use save_manager::daemon::shutdown::ShutdownCoordinator;
use save_manager::host::process::{ProcessHost, WorldContainer};
use save_manager::host::MainLoop;
use save_manager::scheduler::{MaintenanceScheduler, MaintenanceTasks};
use save_manager::{utils, BackupService, Config};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port for the HTTP control API (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = args.config {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };
    if let Some(port) = args.port {
        config.api.port = port;
    }

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    api::health::init_start_time();

    tracing::info!(
        "Starting save-manager v{} (worlds in {})",
        env!("CARGO_PKG_VERSION"),
        config.server.world_container.display()
    );

    let config = Arc::new(config);
    let shutdown = ShutdownCoordinator::new();

    // Main path owns the host
    let (main_path, main_loop) =
        MainLoop::start(ProcessHost::new(config.server.save_command.clone()))?;

    let resolver = Arc::new(WorldContainer::new(&config.server.world_container));
    let backups = Arc::new(BackupService::from_config(&config, resolver));

    // Timers
    let tasks = Arc::new(MaintenanceTasks::new(
        Arc::clone(&config),
        main_path.clone(),
        Arc::clone(&backups),
    ));
    let scheduler = MaintenanceScheduler::new(tasks).await?;
    scheduler.init_schedules().await?;
    scheduler.start().await?;

    // Command surfaces
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&config),
        main_path,
        backups,
    ));
    let console_handle = tokio::spawn(run_console(Arc::clone(&dispatcher), shutdown.token()));

    let server_handle = if config.api.enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = api::create_router(AppState::new(dispatcher, config.api.token.clone()));
        let token = shutdown.token();

        tracing::info!("Control API listening on http://{}", addr);
        if config.api.token.is_none() {
            tracing::warn!("api.token is not set, HTTP commands will be refused");
        }

        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        }))
    } else {
        drop(dispatcher);
        None
    };

    // Wait for shutdown signal
    shutdown.wait_for_signal().await;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown error: {}", e);
    }
    drop(scheduler);

    if let Some(handle) = server_handle {
        match tokio::time::timeout(Duration::from_secs(5), handle).await {
            Ok(Ok(Ok(()))) => tracing::info!("Control API stopped"),
            Ok(Ok(Err(e))) => tracing::error!("Control API error during shutdown: {}", e),
            Ok(Err(e)) => tracing::error!("Control API task panicked: {}", e),
            Err(_) => tracing::warn!("Control API shutdown timeout, forcing exit"),
        }
    }
    let _ = console_handle.await;

    // Let queued saves and notices finish, then stop the main path
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    std::thread::spawn(move || {
        main_loop.stop();
        let _ = done_tx.send(());
    });
    if tokio::time::timeout(Duration::from_secs(10), done_rx).await.is_err() {
        tracing::warn!("Main path still busy, exiting anyway");
    }

    tracing::info!("Auto Save disabled.");
    Ok(())
}
