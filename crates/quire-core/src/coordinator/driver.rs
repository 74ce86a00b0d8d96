use super::Coordinator;
use crate::error::{QuireError, Result};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Background thread that runs due persists and flushes everything on shutdown
pub struct CoordinatorDriver {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<Result<usize>>>,
}

impl CoordinatorDriver {
    /// Start driving `coordinator`, waking at least every `poll`
    pub fn spawn(coordinator: Arc<Coordinator>, poll: Duration) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("quire-coordinator".to_string())
            .spawn(move || {
                loop {
                    let wait = coordinator
                        .next_deadline()
                        .map(|d| d.saturating_duration_since(coordinator.clock.now()))
                        .unwrap_or(poll)
                        .min(poll);

                    match stopped.recv_timeout(wait) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            coordinator.run_due();
                        }
                    }
                }
                let flushed = coordinator.flush_all()?;
                tracing::debug!(flushed, "Coordinator driver stopped");
                Ok(flushed)
            })
            .map_err(|e| QuireError::IoFailure(format!("failed to start coordinator thread: {}", e)))?;

        Ok(CoordinatorDriver {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stop the thread after flushing all outstanding work
    pub fn shutdown(mut self) -> Result<usize> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<usize> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| QuireError::IoFailure("coordinator thread panicked".to_string()))?,
            None => Ok(0),
        }
    }
}

impl Drop for CoordinatorDriver {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            tracing::warn!(error = %e, "Coordinator flush on drop failed");
        }
    }
}
