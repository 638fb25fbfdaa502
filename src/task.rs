//! One-shot background jobs (image decode, JPEG encode).
//!
//! The job runs on its own worker thread and hands back exactly one
//! `Result` over a channel. The owner polls from the frame loop, so the
//! main loop never blocks on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::error::{Error, Result};

pub struct BackgroundTask<T> {
    name: String,
    rx: Option<Receiver<Result<T>>>,
    cancelled: Arc<AtomicBool>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    /// Start `job` on a named worker thread.
    pub fn spawn<F>(name: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::sync_channel(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let worker_name = name.clone();

        let spawned = thread::Builder::new()
            .name(format!("task-{name}"))
            .spawn(move || {
                let result = job();
                if flag.load(Ordering::Acquire) {
                    debug!(task = %worker_name, "result dropped, task was cancelled");
                    return;
                }
                // Receiver gone means the owner lost interest.
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            warn!(task = %name, "failed to spawn worker: {e}");
            let (tx, rx) = mpsc::sync_channel(1);
            let _ = tx.send(Err(Error::TaskSpawn { name: name.clone(), reason: e.to_string() }));
            return Self { name, rx: Some(rx), cancelled };
        }

        Self { name, rx: Some(rx), cancelled }
    }

    /// Non-blocking check. Yields the result once; `None` before and after.
    pub fn poll(&mut self) -> Option<Result<T>> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.rx = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // Worker died without reporting (panic inside the job).
                self.rx = None;
                Some(Err(Error::TaskCancelled))
            }
        }
    }

    /// Block until the job resolves.
    pub fn wait(mut self) -> Result<T> {
        let rx = self.rx.take().ok_or(Error::TaskCancelled)?;
        rx.recv().unwrap_or(Err(Error::TaskCancelled))
    }
}

impl<T> BackgroundTask<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop waiting; whatever the worker produces is thrown away.
    pub fn cancel(&mut self) {
        if self.rx.take().is_some() {
            self.cancelled.store(true, Ordering::Release);
            debug!(task = %self.name, "cancelled");
        }
    }

    /// True once the result was taken or the task was cancelled.
    pub fn is_settled(&self) -> bool {
        self.rx.is_none()
    }
}

impl<T> Drop for BackgroundTask<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn poll_until<T: Send + 'static>(task: &mut BackgroundTask<T>) -> Result<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(r) = task.poll() {
                return r;
            }
            assert!(Instant::now() < deadline, "task never resolved");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn resolves_exactly_once() {
        let mut task = BackgroundTask::spawn("answer", || Ok(42));
        assert_eq!(poll_until(&mut task).unwrap(), 42);
        assert!(task.is_settled());
        assert!(task.poll().is_none());
    }

    #[test]
    fn errors_are_delivered() {
        let task: BackgroundTask<()> =
            BackgroundTask::spawn("fail", || Err(Error::Decode("bad bytes".into())));
        assert!(matches!(task.wait(), Err(Error::Decode(_))));
    }

    #[test]
    fn cancelled_task_never_yields() {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let mut task = BackgroundTask::spawn("slow", move || {
            let _ = gate_rx.recv();
            Ok(1)
        });
        task.cancel();
        gate_tx.send(()).unwrap();
        assert!(task.is_settled());
        assert!(task.poll().is_none());
    }

    #[test]
    fn panicking_job_reports_cancelled() {
        let mut task: BackgroundTask<u8> = BackgroundTask::spawn("boom", || panic!("job blew up"));
        assert!(matches!(poll_until(&mut task), Err(Error::TaskCancelled)));
    }
}
