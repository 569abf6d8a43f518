//! Output device sessions.
//!
//! The rodio output stream is not `Send`, so each session runs on a
//! dedicated thread that owns the stream for its whole life: open the
//! device, connect a sink, feed it the mix source, wait for the drain (or
//! a forced stop), release the device. The engine only ever holds the
//! thread handle and two flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{error, warn};
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use super::source::MixSource;
use super::table::StreamTable;
use crate::constants::FRAME_SAMPLES;

const OPEN_RETRIES: u32 = 5;
const OPEN_RETRY_MS: u64 = 100;
const POLL_MS: u64 = 10;

/// Where the output device currently is in its lifecycle. Mirrors the
/// session thread's progress; status displays read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePhase {
    Closed,
    Opening,
    Active,
    Draining,
}

impl std::fmt::Display for DevicePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Active => "active",
            Self::Draining => "draining",
        };
        f.write_str(label)
    }
}

/// State captured at session spawn time.
struct SessionShared {
    table: Arc<Mutex<StreamTable>>,
    gain: Arc<Mutex<f32>>,
    phase: Arc<Mutex<DevicePhase>>,
    finished: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

/// Handle to one open stretch of the output device.
pub(crate) struct OutputSession {
    finished: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl OutputSession {
    pub(crate) fn spawn(
        table: Arc<Mutex<StreamTable>>,
        gain: Arc<Mutex<f32>>,
        phase: Arc<Mutex<DevicePhase>>,
    ) -> Self {
        let finished = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let shared = SessionShared {
            table,
            gain,
            phase,
            finished: Arc::clone(&finished),
            stop: Arc::clone(&stop),
        };
        let handle = thread::spawn(move || run_session(shared));
        Self {
            finished,
            stop,
            handle: Some(handle),
        }
    }

    /// Whether the session is still consuming the table. A finished session
    /// never becomes active again; the engine replaces it.
    pub(crate) fn is_active(&self) -> bool {
        !self.finished.load(Ordering::SeqCst)
    }

    /// Signal teardown and wait for the thread to release the device.
    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("output session thread panicked during join");
            }
        }
    }
}

/// Keeps the published phase in sync with session-thread lifetime.
struct PhaseGuard {
    phase: Arc<Mutex<DevicePhase>>,
}

impl PhaseGuard {
    fn new(phase: Arc<Mutex<DevicePhase>>) -> Self {
        set_phase(&phase, DevicePhase::Opening);
        Self { phase }
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        set_phase(&self.phase, DevicePhase::Closed);
    }
}

fn set_phase(phase: &Arc<Mutex<DevicePhase>>, value: DevicePhase) {
    if let Ok(mut guard) = phase.lock() {
        *guard = value;
    }
}

fn run_session(shared: SessionShared) {
    let _phase = PhaseGuard::new(Arc::clone(&shared.phase));

    let Some(stream) = open_output_stream_with_retry(&shared.stop) else {
        // No device: discard pending clips. The next submission retries
        // from scratch.
        shared.finished.store(true, Ordering::SeqCst);
        let dropped = match shared.table.lock() {
            Ok(mut table) => {
                let owners = table.pending_owners();
                table.clear();
                owners
            }
            Err(_) => 0,
        };
        if dropped > 0 {
            warn!(
                "continuing without audio; dropped pending clips for {} owner(s)",
                dropped
            );
        }
        return;
    };

    let sink = Sink::connect_new(stream.mixer());
    sink.append(MixSource::new(
        Arc::clone(&shared.table),
        Arc::clone(&shared.gain),
        Arc::clone(&shared.finished),
        FRAME_SAMPLES,
    ));
    set_phase(&shared.phase, DevicePhase::Active);

    let mut draining = false;
    loop {
        if shared.stop.load(Ordering::SeqCst) {
            sink.clear();
            break;
        }
        if shared.finished.load(Ordering::SeqCst) {
            if !draining {
                draining = true;
                set_phase(&shared.phase, DevicePhase::Draining);
            }
            if sink.empty() {
                break;
            }
        }
        thread::sleep(Duration::from_millis(POLL_MS));
    }
    shared.finished.store(true, Ordering::SeqCst);
}

/// Open the default output stream with bounded retry behavior.
fn open_output_stream_with_retry(stop: &AtomicBool) -> Option<OutputStream> {
    for attempt in 1..=OPEN_RETRIES {
        if stop.load(Ordering::SeqCst) {
            return None;
        }
        match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => return Some(stream),
            Err(err) => {
                if attempt == OPEN_RETRIES {
                    error!(
                        "failed to open default output stream after {} attempts: {}",
                        OPEN_RETRIES, err
                    );
                    return None;
                }
                warn!(
                    "open_default_stream attempt {}/{} failed: {}",
                    attempt, OPEN_RETRIES, err
                );
                thread::sleep(Duration::from_millis(OPEN_RETRY_MS));
            }
        }
    }
    None
}
