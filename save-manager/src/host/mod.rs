//! The host process boundary and its main path.
//!
//! The host owns state that is only safe to touch from one thread: chat
//! broadcasts, the save action and replies to command senders. All of that
//! work is queued on a [`MainPath`] and executed in order by a dedicated
//! thread started with [`MainLoop::start`]. Archive I/O never runs there.

pub mod process;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Main-path services provided by the host.
pub trait Host: Send + 'static {
    /// Send a (color-coded) notice to everyone connected.
    fn broadcast(&mut self, message: &str);

    /// Flush all worlds to disk. Runs synchronously on the main path.
    fn save_all(&mut self) -> anyhow::Result<()>;
}

/// Maps a logical world name to the directory currently backing it.
pub trait WorldResolver: Send + Sync {
    fn world_folder(&self, name: &str) -> Option<PathBuf>;
}

pub type MainTask = Box<dyn FnOnce(&mut dyn Host) + Send>;

enum Envelope {
    Run(MainTask),
    Stop,
}

/// Handle for queueing work onto the main path.
#[derive(Clone)]
pub struct MainPath {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl MainPath {
    /// Queue a task. Returns false once the main loop has stopped.
    pub fn execute<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut dyn Host) + Send + 'static,
    {
        self.tx.send(Envelope::Run(Box::new(task))).is_ok()
    }

    /// Queue a task after `delay` without blocking any thread meanwhile.
    pub fn execute_later<F>(&self, delay: Duration, task: F) -> JoinHandle<()>
    where
        F: FnOnce(&mut dyn Host) + Send + 'static,
    {
        let main = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !main.execute(task) {
                tracing::debug!("Main loop stopped before delayed task could run");
            }
        })
    }

    pub fn broadcast(&self, message: String) {
        self.execute(move |host| host.broadcast(&message));
    }
}

/// The thread draining the main path.
pub struct MainLoop {
    handle: thread::JoinHandle<()>,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl MainLoop {
    /// Start the main thread, taking ownership of the host.
    pub fn start<H: Host>(mut host: H) -> std::io::Result<(MainPath, MainLoop)> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

        let handle = thread::Builder::new()
            .name("server-main".to_string())
            .spawn(move || {
                let host: &mut dyn Host = &mut host;
                while let Some(Envelope::Run(task)) = rx.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(|| task(&mut *host))).is_err() {
                        tracing::error!("Main path task panicked");
                    }
                }
                tracing::debug!("Main loop stopped");
            })?;

        let main = MainPath { tx: tx.clone() };
        Ok((main, MainLoop { handle, tx }))
    }

    /// Run everything queued so far, then stop the thread and wait for it.
    ///
    /// Tasks queued after this point are dropped and `execute` reports false
    /// once the thread is gone. Outstanding [`MainPath`] handles do not keep
    /// the thread alive.
    pub fn stop(self) {
        let _ = self.tx.send(Envelope::Stop);
        if self.handle.join().is_err() {
            tracing::error!("Main loop thread panicked");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_tasks_run_in_order_on_main_thread() {
        let host = RecordingHost::default();
        let (main, main_loop) = MainLoop::start(host.clone()).unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        main.broadcast("first".to_string());
        main.broadcast("second".to_string());
        main.execute(move |_| {
            let _ = tx.send(thread::current().name().map(String::from));
        });

        assert_eq!(rx.await.unwrap().as_deref(), Some("server-main"));
        assert_eq!(host.broadcasts(), vec!["first", "second"]);

        drop(main);
        tokio::task::spawn_blocking(move || main_loop.stop()).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_drains_queue_with_live_handles() {
        let host = RecordingHost::default();
        let (main, main_loop) = MainLoop::start(host.clone()).unwrap();

        main.broadcast("queued".to_string());
        let stopped = tokio::task::spawn_blocking(move || main_loop.stop());
        tokio::time::timeout(Duration::from_secs(2), stopped)
            .await
            .expect("stop should not wait for handles to drop")
            .unwrap();

        assert_eq!(host.broadcasts(), vec!["queued"]);
        assert!(!main.execute(|host| host.broadcast("too late")));
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_loop() {
        let host = RecordingHost::default();
        let (main, _main_loop) = MainLoop::start(host.clone()).unwrap();

        main.execute(|_| panic!("boom"));
        main.broadcast("still alive".to_string());
        drain(&main).await;

        assert_eq!(host.broadcasts(), vec!["still alive"]);
    }

    #[tokio::test]
    async fn test_execute_later_waits() {
        let host = RecordingHost::default();
        let (main, _main_loop) = MainLoop::start(host.clone()).unwrap();

        let delayed = main.execute_later(Duration::from_millis(50), |host| host.broadcast("late"));
        main.broadcast("early".to_string());
        drain(&main).await;
        assert_eq!(host.broadcasts(), vec!["early"]);

        delayed.await.unwrap();
        drain(&main).await;
        assert_eq!(host.broadcasts(), vec!["early", "late"]);
    }
}
