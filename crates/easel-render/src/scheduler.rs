#![forbid(unsafe_code)]

//! The coalescing paint scheduler.
//!
//! A single-slot notifier on a dedicated thread: any number of
//! [`notify_paint`](PaintScheduler::notify_paint) calls arriving before the
//! previous one is serviced collapse into one pending paint. No queue, no
//! duplicate frames.
//!
//! The `painting` flag is flipped under the same mutex the `enabled` gate
//! is checked under, so
//! [`wait_for_paint_completion_and_disable`](PaintScheduler::wait_for_paint_completion_and_disable)
//! cannot race a paint that is about to start: once it holds the mutex and
//! `painting` is clear, no further paint can begin.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{RenderError, Result};

#[derive(Debug, Default)]
struct SchedulerState {
    /// Gate: paints only run while set.
    enabled: bool,
    /// One pending paint, at most.
    pending: bool,
    /// A paint callback is currently executing.
    painting: bool,
    /// The thread should exit.
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SchedulerState>,
    /// Wakes the paint thread (pending work, gate opened, shutdown).
    wake: Condvar,
    /// Signals paint completion to drain waiters.
    idle: Condvar,
}

fn lock_state(shared: &Shared) -> MutexGuard<'_, SchedulerState> {
    shared.state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Throttles and coalesces paint requests onto one dedicated thread.
#[derive(Debug)]
pub struct PaintScheduler {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl PaintScheduler {
    /// Create a scheduler with no thread yet; see [`start`](Self::start).
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            thread: Mutex::new(None),
        }
    }

    /// Spawn the paint thread running `paint` for each serviced request.
    ///
    /// Requests are not serviced until [`enable_painting`](Self::enable_painting).
    pub fn start<F>(&self, paint: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("easel-paint".into())
            .spawn(move || Self::run(&shared, paint))
            .map_err(RenderError::Thread)?;
        *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    fn run<F>(shared: &Shared, mut paint: F)
    where
        F: FnMut(),
    {
        loop {
            let mut state = lock_state(shared);
            loop {
                if state.shutdown {
                    return;
                }
                if state.enabled && state.pending {
                    state.pending = false;
                    state.painting = true;
                    break;
                }
                state = shared
                    .wake
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            drop(state);

            paint();

            let mut state = lock_state(shared);
            state.painting = false;
            drop(state);
            shared.idle.notify_all();
        }
    }

    /// Request a paint. Collapses with any not-yet-serviced request.
    pub fn notify_paint(&self) {
        let mut state = lock_state(&self.shared);
        state.pending = true;
        drop(state);
        self.shared.wake.notify_one();
    }

    /// Open the gate; pending and future requests may now be serviced.
    pub fn enable_painting(&self) {
        let mut state = lock_state(&self.shared);
        state.enabled = true;
        drop(state);
        self.shared.wake.notify_one();
    }

    /// True while the gate is open.
    pub fn is_enabled(&self) -> bool {
        lock_state(&self.shared).enabled
    }

    /// Close the gate and wait for any in-flight paint to finish.
    ///
    /// `None` waits unboundedly. Returns false when the timeout elapsed
    /// with a paint still running; the gate is closed either way, so no
    /// *new* paint can start after this returns.
    pub fn wait_for_paint_completion_and_disable(&self, timeout: Option<Duration>) -> bool {
        let mut state = lock_state(&self.shared);
        state.enabled = false;

        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        while state.painting {
            match deadline {
                None => {
                    state = self
                        .shared
                        .idle
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                        return false;
                    };
                    let (guard, _) = self
                        .shared
                        .idle
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner);
                    state = guard;
                }
            }
        }
        true
    }
}

impl Default for PaintScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PaintScheduler {
    fn drop(&mut self) {
        {
            let mut state = lock_state(&self.shared);
            state.shutdown = true;
        }
        self.shared.wake.notify_all();
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // The paint thread can drop the last owner of this scheduler
            // itself; a thread cannot join itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}
