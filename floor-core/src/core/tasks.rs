//! 后台任务
//!
//! 核心只有两类长期任务：审计写入 worker 和事件流 listener。
//! 关闭时先停 listener，再停 worker，保证审计队列最后排空。

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 单个任务收到取消信号后的最长等待时间
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskKind {
    /// 事件监听器，关闭时最先停止
    Listener,
    /// 长期后台工作者（审计写入），关闭时最后停止
    Worker,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Listener => "listener",
            TaskKind::Worker => "worker",
        })
    }
}

struct TaskEntry {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Outcome of [`BackgroundTasks::shutdown`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub stopped: usize,
    pub failed: usize,
    pub aborted: usize,
}

/// Registry of the long-lived tasks owned by a [`FloorState`](super::FloorState)
///
/// ```ignore
/// let (state, tasks) = FloorState::initialize(&config).await?;
/// // ...
/// drop(state);
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    entries: Vec<TaskEntry>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// 任务内部用来监听关闭信号
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a task; a panic is caught and logged instead of tearing down the runtime
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if token.is_cancelled() => {
                    tracing::debug!(task = name, %kind, "Task stopped");
                }
                Ok(()) => {
                    tracing::warn!(task = name, %kind, "Task exited before shutdown");
                }
                Err(payload) => {
                    tracing::error!(
                        task = name,
                        %kind,
                        panic = %panic_message(payload.as_ref()),
                        "Task panicked"
                    );
                }
            }
        });
        tracing::debug!(task = name, %kind, "Task spawned");
        self.entries.push(TaskEntry { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 返回在关闭之前就已退出的任务数量
    pub fn check_health(&self) -> usize {
        let mut finished = 0;
        for entry in self.entries.iter().filter(|e| e.handle.is_finished()) {
            tracing::error!(task = entry.name, kind = %entry.kind, "Task is no longer running");
            finished += 1;
        }
        finished
    }

    /// Cancel every task and wait for them, listeners before workers
    pub async fn shutdown(mut self) -> ShutdownReport {
        tracing::info!(tasks = self.entries.len(), "Stopping background tasks");
        self.shutdown.cancel();
        self.entries.sort_by_key(|entry| entry.kind);

        let mut report = ShutdownReport::default();
        for mut entry in self.entries {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut entry.handle).await {
                Ok(Ok(())) => report.stopped += 1,
                Ok(Err(e)) => {
                    tracing::error!(task = entry.name, error = %e, "Task join failed");
                    report.failed += 1;
                }
                Err(_) => {
                    tracing::error!(task = entry.name, grace = ?SHUTDOWN_GRACE, "Task ignored shutdown, aborting");
                    entry.handle.abort();
                    report.aborted += 1;
                }
            }
        }
        tracing::info!(
            stopped = report.stopped,
            failed = report.failed,
            aborted = report.aborted,
            "Background tasks stopped"
        );
        report
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
