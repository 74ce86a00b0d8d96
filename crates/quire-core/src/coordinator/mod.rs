//! Debounced, single-flight persistence per key
//!
//! Each key (usually a note id) moves through a small state machine:
//!
//! ```text
//! Idle --schedule--> Scheduled --due/flush--> InFlight --done--> Idle
//!                        ^                       |
//!                        |                    schedule
//!                        |                       v
//!                        +--done (retry delay)-- InFlightWithPending
//! ```
//!
//! Scheduling while `Scheduled` replaces the producer and restarts the delay.
//! Scheduling while a persist runs keeps only the newest request as pending.
//! The coordinator never runs two persists for the same key at once and
//! never retries a failed persist on its own.

mod clock;
mod driver;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::CoordinatorDriver;

use crate::config::CoordinatorConfig;
use crate::error::{QuireError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Work that renders the latest editor state and saves it
pub type Producer = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// Save progress reported for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Pending,
    Saving,
    Saved,
    Error(String),
}

/// Receives save status changes, typically to drive a UI indicator
pub trait StatusSink: Send + Sync {
    fn status(&self, key: &str, status: &SaveStatus);
}

impl<F> StatusSink for F
where
    F: Fn(&str, &SaveStatus) + Send + Sync,
{
    fn status(&self, key: &str, status: &SaveStatus) {
        self(key, status)
    }
}

/// Observable state of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Idle,
    Scheduled { deadline: Instant },
    InFlight,
    InFlightWithPending,
}

enum Slot {
    Scheduled { deadline: Instant, producer: Producer },
    InFlight,
    InFlightWithPending { producer: Producer },
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("persist panicked: {}", detail)
}

pub struct Coordinator {
    slots: Mutex<HashMap<String, Slot>>,
    done: Condvar,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn StatusSink>>,
    debounce: Duration,
    retry_delay: Duration,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("debounce", &self.debounce)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(config: &CoordinatorConfig) -> Self {
        Coordinator {
            slots: Mutex::new(HashMap::new()),
            done: Condvar::new(),
            clock: Arc::new(SystemClock),
            sink: None,
            debounce: config.debounce(),
            retry_delay: config.retry_delay(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // Producers run outside the lock, so a poisoned map is still consistent
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, key: &str, status: SaveStatus) {
        if let Some(sink) = &self.sink {
            sink.status(key, &status);
        }
    }

    /// Schedule with the configured debounce delay
    pub fn schedule(&self, key: &str, producer: Producer) {
        self.schedule_persist(key, producer, self.debounce);
    }

    /// Run `producer` for `key` after `delay` without further scheduling,
    /// superseding any request that has not started yet
    pub fn schedule_persist(&self, key: &str, producer: Producer, delay: Duration) {
        let mut slots = self.lock();
        let next = match slots.remove(key) {
            Some(Slot::InFlight) | Some(Slot::InFlightWithPending { .. }) => {
                Slot::InFlightWithPending { producer }
            }
            Some(Slot::Scheduled { .. }) | None => Slot::Scheduled {
                deadline: self.clock.now() + delay,
                producer,
            },
        };
        slots.insert(key.to_string(), next);
        drop(slots);

        tracing::trace!(key, "Persist scheduled");
        self.emit(key, SaveStatus::Pending);
    }

    pub fn state(&self, key: &str) -> KeyState {
        match self.lock().get(key) {
            None => KeyState::Idle,
            Some(Slot::Scheduled { deadline, .. }) => KeyState::Scheduled {
                deadline: *deadline,
            },
            Some(Slot::InFlight) => KeyState::InFlight,
            Some(Slot::InFlightWithPending { .. }) => KeyState::InFlightWithPending,
        }
    }

    /// Earliest deadline among scheduled keys
    pub fn next_deadline(&self) -> Option<Instant> {
        self.lock()
            .values()
            .filter_map(|slot| match slot {
                Slot::Scheduled { deadline, .. } => Some(*deadline),
                _ => None,
            })
            .min()
    }

    /// Move a scheduled key to in-flight and hand back its producer
    fn start(&self, slots: &mut HashMap<String, Slot>, key: &str) -> Option<Producer> {
        match slots.remove(key) {
            Some(Slot::Scheduled { producer, .. }) => {
                slots.insert(key.to_string(), Slot::InFlight);
                Some(producer)
            }
            Some(other) => {
                slots.insert(key.to_string(), other);
                None
            }
            None => None,
        }
    }

    /// Run a producer outside the lock and settle the key afterwards
    fn execute(&self, key: &str, producer: Producer) -> Result<()> {
        self.emit(key, SaveStatus::Saving);
        // A panicking producer still has to settle its slot
        let result = panic::catch_unwind(AssertUnwindSafe(producer))
            .unwrap_or_else(|payload| Err(QuireError::IoFailure(panic_message(&*payload))));

        let mut slots = self.lock();
        match slots.remove(key) {
            Some(Slot::InFlightWithPending { producer }) => {
                slots.insert(
                    key.to_string(),
                    Slot::Scheduled {
                        deadline: self.clock.now() + self.retry_delay,
                        producer,
                    },
                );
            }
            Some(Slot::Scheduled { deadline, producer }) => {
                slots.insert(key.to_string(), Slot::Scheduled { deadline, producer });
            }
            Some(Slot::InFlight) | None => {}
        }
        drop(slots);
        self.done.notify_all();

        match &result {
            Ok(()) => self.emit(key, SaveStatus::Saved),
            Err(e) => {
                tracing::warn!(key, error = %e, "Persist failed");
                self.emit(key, SaveStatus::Error(e.to_string()));
            }
        }
        result
    }

    /// Run every persist whose deadline has passed; returns how many ran.
    /// Failures are reported through the status sink only.
    pub fn run_due(&self) -> usize {
        let now = self.clock.now();
        let due: Vec<(String, Producer)> = {
            let mut slots = self.lock();
            let keys: Vec<String> = slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Scheduled { deadline, .. } if *deadline <= now => Some(key.clone()),
                    _ => None,
                })
                .collect();
            keys.into_iter()
                .filter_map(|key| self.start(&mut slots, &key).map(|p| (key, p)))
                .collect()
        };

        let ran = due.len();
        for (key, producer) in due {
            let _ = self.execute(&key, producer);
        }
        ran
    }

    /// Persist `key` now, skipping the delay.
    ///
    /// Waits for a persist that is already running, then runs whatever is
    /// still pending, so the newest request has been attempted on return.
    /// Returns whether anything ran. Producers must not flush their own key.
    pub fn flush_now(&self, key: &str) -> Result<bool> {
        let mut ran = false;
        loop {
            let producer = {
                let mut slots = self.lock();
                loop {
                    let running = match slots.get(key) {
                        None => return Ok(ran),
                        Some(Slot::Scheduled { .. }) => false,
                        Some(Slot::InFlight) | Some(Slot::InFlightWithPending { .. }) => true,
                    };
                    if !running {
                        break;
                    }
                    slots = self.done.wait(slots).unwrap_or_else(|e| e.into_inner());
                }
                self.start(&mut slots, key)
            };

            let Some(producer) = producer else {
                continue;
            };
            ran = true;
            if let Err(e) = self.execute(key, producer) {
                // A newer request may have queued behind the failed one
                if matches!(self.state(key), KeyState::Idle) {
                    return Err(e);
                }
            }
        }
    }

    /// Flush every key with outstanding work. All keys are attempted; the
    /// first failure is returned.
    pub fn flush_all(&self) -> Result<usize> {
        let keys: Vec<String> = self.lock().keys().cloned().collect();
        let mut flushed = 0;
        let mut first_error: Option<QuireError> = None;
        for key in keys {
            match self.flush_now(&key) {
                Ok(true) => flushed += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }

    /// Keys that are scheduled or running
    pub fn active_keys(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests;
