//! Fixed-interval tick driver
//!
//! A timer thread fires every `tick_interval`. Each firing tries to take the
//! busy flag; if the previous tick still holds it, the firing is dropped
//! rather than queued. Ticks run on the rayon pool.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use super::{Engine, FrameSource, PresentationSink, SymbolDecoder};

/// Non-reentrant gate shared between the timer and the running tick
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag, or `None` when a tick is already running
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Holds the busy flag; releases it when dropped, including during unwinding
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Firing counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunnerStats {
    /// Firings that started a tick
    pub fired: u64,
    /// Firings dropped because a tick was still running
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fired: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> RunnerStats {
        RunnerStats {
            fired: self.fired.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Drives an [`Engine`] from a timer thread
pub struct TickRunner<S, D, P> {
    engine: Arc<Mutex<Engine<S, D, P>>>,
    busy: BusyFlag,
    counters: Arc<Counters>,
    interval: Duration,
}

impl<S, D, P> Clone for TickRunner<S, D, P> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            busy: self.busy.clone(),
            counters: Arc::clone(&self.counters),
            interval: self.interval,
        }
    }
}

impl<S, D, P> TickRunner<S, D, P>
where
    S: FrameSource + Send + 'static,
    D: SymbolDecoder + Send + 'static,
    P: PresentationSink + Send + 'static,
{
    /// Wrap an engine, firing at its configured tick interval
    pub fn new(engine: Engine<S, D, P>) -> Self {
        let interval = engine.config().tick_interval();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            busy: BusyFlag::new(),
            counters: Arc::default(),
            interval,
        }
    }

    /// Shared handle to the engine, for inspection between ticks
    pub fn engine(&self) -> Arc<Mutex<Engine<S, D, P>>> {
        Arc::clone(&self.engine)
    }

    pub fn busy_flag(&self) -> &BusyFlag {
        &self.busy
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> RunnerStats {
        self.counters.snapshot()
    }

    /// Dispatch one tick unless the previous one is still running.
    ///
    /// Returns whether a tick was dispatched.
    pub fn fire(&self) -> bool {
        let Some(guard) = self.busy.try_acquire() else {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        self.counters.fired.fetch_add(1, Ordering::Relaxed);

        let engine = Arc::clone(&self.engine);
        rayon::spawn(move || {
            let _guard = guard;
            run_tick(&engine);
        });
        true
    }

    /// Start the timer thread
    pub fn start(self) -> std::io::Result<RunnerHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let counters = Arc::clone(&self.counters);
        let interval = self.interval;
        let thread = thread::Builder::new()
            .name("gtin-tick".into())
            .spawn(move || {
                loop {
                    self.fire();
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        info!("tick runner started at {} ms", interval.as_millis());
        Ok(RunnerHandle {
            stop_tx,
            thread,
            counters,
        })
    }
}

fn run_tick<S, D, P>(engine: &Mutex<Engine<S, D, P>>)
where
    S: FrameSource,
    D: SymbolDecoder,
    P: PresentationSink,
{
    let mut engine = match engine.lock() {
        Ok(engine) => engine,
        Err(poisoned) => {
            warn!("engine lock poisoned by an earlier tick; continuing");
            poisoned.into_inner()
        }
    };
    if panic::catch_unwind(AssertUnwindSafe(|| engine.tick())).is_err() {
        error!("tick panicked; skipping frame");
    }
}

/// Running timer; stop it to join the thread
pub struct RunnerHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl RunnerHandle {
    pub fn stats(&self) -> RunnerStats {
        self.counters.snapshot()
    }

    /// Stop firing and wait for the timer thread. A tick already dispatched
    /// may still be finishing on the rayon pool.
    pub fn stop(self) -> RunnerStats {
        // the receiver only disappears if the thread already exited
        let _ = self.stop_tx.send(());
        if self.thread.join().is_err() {
            error!("tick timer thread panicked");
        }
        let stats = self.counters.snapshot();
        info!("tick runner stopped: {} fired, {} skipped", stats.fired, stats.skipped);
        stats
    }
}
