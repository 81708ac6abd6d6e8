//! Delayed single-shot task executor.
//!
//! Every scheduled task owns an independent timer on the tokio runtime. A task
//! leaves the pending map exactly once: when its timer fires, when it is
//! cancelled, or when it is finished early. Whichever happens first wins, so
//! the callback runs at most once.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Callback invoked with the task payload when it fires.
pub type TaskCallback<T> = Box<dyn FnOnce(T) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

struct PendingTask<T> {
    payload: T,
    callback: TaskCallback<T>,
    timer: JoinHandle<()>,
}

/// Cancellable deferred task executor, keyed by task id.
pub struct Scheduler<T> {
    tasks: Arc<Mutex<HashMap<Uuid, PendingTask<T>>>>,
}

impl<T> Default for Scheduler<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T>
where
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `callback(payload)` after `delay`. Returns the task id.
    pub async fn schedule<F, Fut>(&self, delay: Duration, payload: T, callback: F) -> Uuid
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let callback: TaskCallback<T> = Box::new(move |payload| callback(payload).boxed());

        // Held across spawn + insert so the timer can't observe a missing entry
        let mut tasks = self.tasks.lock().await;

        let pending = Arc::clone(&self.tasks);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let task = pending.lock().await.remove(&id);
            if let Some(task) = task {
                debug!(task_id = %id, "Scheduled task fired");
                run_task(id, task.payload, task.callback).await;
            }
        });

        tasks.insert(
            id,
            PendingTask {
                payload,
                callback,
                timer,
            },
        );
        debug!(task_id = %id, delay_ms = delay.as_millis() as u64, "Scheduled task");

        id
    }

    /// Drop a pending task without running it. Returns `false` if the task
    /// already fired or was never scheduled.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let task = self.tasks.lock().await.remove(&id);
        match task {
            Some(task) => {
                task.timer.abort();
                debug!(task_id = %id, "Cancelled scheduled task");
                true
            }
            None => false,
        }
    }

    /// Cancel the timer and run the callback right away, in the caller's task.
    ///
    /// Returns `false` without doing anything if the task already fired, was
    /// cancelled, or was finished before.
    pub async fn finish_now(&self, id: Uuid) -> bool {
        let task = self.tasks.lock().await.remove(&id);
        let Some(task) = task else {
            debug!(task_id = %id, "Task already finished");
            return false;
        };

        task.timer.abort();
        debug!(task_id = %id, "Finishing scheduled task early");
        run_task(id, task.payload, task.callback).await;
        true
    }

    pub async fn is_pending(&self, id: Uuid) -> bool {
        self.tasks.lock().await.contains_key(&id)
    }

    pub async fn pending(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Abort every pending task and hand back their payloads.
    ///
    /// Pending tasks don't survive a restart; the count is logged so the loss
    /// is visible.
    pub async fn shutdown(&self) -> Vec<T> {
        let drained: Vec<PendingTask<T>> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain().map(|(_, task)| task).collect()
        };

        if !drained.is_empty() {
            warn!(
                count = drained.len(),
                "Shutting down with outstanding scheduled tasks"
            );
        }

        drained
            .into_iter()
            .map(|task| {
                task.timer.abort();
                task.payload
            })
            .collect()
    }
}

async fn run_task<T>(id: Uuid, payload: T, callback: TaskCallback<T>) {
    let outcome = AssertUnwindSafe(async move { callback(payload).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => debug!(task_id = %id, "Scheduled task completed"),
        Ok(Err(e)) => error!(task_id = %id, error = %e, "Scheduled task failed"),
        Err(_) => error!(task_id = %id, "Scheduled task panicked"),
    }
}
