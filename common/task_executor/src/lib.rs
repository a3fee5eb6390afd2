//! A thin wrapper around a `tokio::runtime::Handle` that threads a shutdown
//! signal and a `slog::Logger` through every task the pipeline spawns.
//!
//! Mirrors the teacher's `common/task_executor` crate: components never hold
//! a raw `tokio::runtime::Handle` themselves, they hold a `TaskExecutor` so
//! that a single `Signal` can ask every spawned task to wind down together
//! (the Signature Verification Service and the Fork-Choice Gateway actor in
//! particular).

use futures::future::Future;
use slog::{crit, debug, o};
use std::sync::Arc;
use tokio::runtime::Handle;

mod metrics {
    use lazy_static::lazy_static;
    use lighthouse_metrics::*;

    lazy_static! {
        pub static ref TASKS_SPAWNED: Result<IntCounter> = try_create_int_counter(
            "task_executor_tasks_spawned_total",
            "Count of tasks spawned by the task executor"
        );
    }
}

/// Builds an `exit-future`-style shutdown pair: `Signal::fire()` resolves
/// every clone of `Exit` and any future still polling on one returns `Ok(())`
/// immediately after.
pub fn shutdown_signal() -> (Signal, Exit) {
    let (tx, rx) = tokio::sync::watch::channel(false);
    (Signal { tx }, Exit { rx })
}

#[derive(Clone)]
pub struct Signal {
    tx: tokio::sync::watch::Sender<bool>,
}

impl Signal {
    /// Asks all outstanding `Exit`s to resolve. Idempotent.
    pub fn fire(&self) {
        let _ = self.tx.send(true);
    }
}

#[derive(Clone)]
pub struct Exit {
    rx: tokio::sync::watch::Receiver<bool>,
}

impl Exit {
    /// Resolves once `Signal::fire` has been called.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_exited(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Provides a reason for a task ending, purely for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Success,
    Failure(&'static str),
}

#[derive(Clone)]
pub struct TaskExecutor {
    handle: Handle,
    exit: Exit,
    log: slog::Logger,
}

impl TaskExecutor {
    pub fn new(handle: Handle, exit: Exit, log: slog::Logger) -> Self {
        Self { handle, exit, log }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn exit(&self) -> Exit {
        self.exit.clone()
    }

    pub fn log(&self) -> &slog::Logger {
        &self.log
    }

    /// Spawns a task that runs until completion or until the executor's
    /// `Exit` fires, whichever comes first. Matches the teacher's
    /// `TaskExecutor::spawn` (a "best effort" spawn that does not propagate
    /// panics back to the caller).
    pub fn spawn<F>(&self, task: F, name: &'static str)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        lighthouse_metrics::inc_counter(&metrics::TASKS_SPAWNED);
        let exit = self.exit.clone();
        let log = self.log.clone();
        self.handle.spawn(async move {
            tokio::select! {
                () = task => {
                    debug!(log, "Task completed"; "name" => name);
                }
                () = exit.wait() => {
                    debug!(log, "Task shutdown via exit signal"; "name" => name);
                }
            }
        });
    }

    /// Spawns a blocking (CPU-bound or synchronous I/O) task on tokio's
    /// blocking thread pool, matching the shape a disk-backed `store`
    /// implementation would use for historical lookups.
    pub fn spawn_blocking<F, R>(&self, task: F, name: &'static str) -> tokio::task::JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let log = self.log.new(o!("blocking_task" => name));
        self.handle.spawn_blocking(move || {
            debug!(log, "Spawning blocking task");
            task()
        })
    }

    /// Reports a panic that a caller could not otherwise surface (e.g. one
    /// swallowed by `JoinHandle::await`'s `Err`).
    pub fn report_panic(&self, name: &str, reason: &dyn std::fmt::Debug) {
        crit!(self.log, "Task panicked"; "name" => name, "reason" => format!("{:?}", reason));
    }
}

pub fn test_runtime() -> (Arc<tokio::runtime::Runtime>, TaskExecutor, Signal) {
    let runtime = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("test runtime builds"),
    );
    let (signal, exit) = shutdown_signal();
    let log = slog::Logger::root(slog::Discard, o!());
    let executor = TaskExecutor::new(runtime.handle().clone(), exit, log);
    (runtime, executor, signal)
}
