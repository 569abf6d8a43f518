//! The mixing engine.
//!
//! `Mixer` accepts owner-tagged WAV clips from any number of threads,
//! queues them FIFO per owner, and plays the averaged mix of all owners'
//! head buffers through a lazily-opened output device session. Cancelling
//! an owner drops only what that owner has not yet played; other owners
//! are untouched.

mod session;
mod source;
mod table;

pub use session::DevicePhase;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::audio::{decode, resample};
use crate::constants::DEFAULT_VOLUME_PERCENT;
use crate::error::MixerError;
use session::OutputSession;
use table::StreamTable;

const IDLE_POLL_MS: u64 = 10;

/// Owner-tagged notification mixer. One value per process is typical;
/// share it by `Arc` and call it from any thread.
pub struct Mixer {
    table: Arc<Mutex<StreamTable>>,
    gain: Arc<Mutex<f32>>,
    phase: Arc<Mutex<DevicePhase>>,
    session: Mutex<Option<OutputSession>>,
    closed: AtomicBool,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(StreamTable::new())),
            gain: Arc::new(Mutex::new(DEFAULT_VOLUME_PERCENT as f32 / 100.0)),
            phase: Arc::new(Mutex::new(DevicePhase::Closed)),
            session: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue a WAV clip for playback under `owner`.
    ///
    /// The payload must be a mono 16-bit PCM WAV at any sample rate;
    /// foreign rates are converted to the canonical rate on the way in.
    /// Clips too short to convert are dropped silently. Payloads the
    /// decoder rejects fail with a format error. After `shutdown` every
    /// submission is ignored.
    pub fn submit(&self, owner: &str, clip: &[u8]) -> Result<(), MixerError> {
        if self.closed.load(Ordering::SeqCst) {
            debug!("ignoring clip for {}: mixer is shut down", owner);
            return Ok(());
        }

        let decoded = decode::decode_wav(clip)?;
        let samples = match resample::to_canonical_rate(decoded.samples, decoded.sample_rate) {
            Ok(samples) => samples,
            Err(err) => {
                debug!("dropping clip for {}: {}", owner, err);
                return Ok(());
            }
        };

        {
            let mut table = self.table.lock().unwrap();
            table.push(owner, samples);
        }
        self.ensure_session();
        Ok(())
    }

    /// Drop everything `owner` has queued but not yet played. Unknown
    /// owners are a no-op.
    pub fn cancel(&self, owner: &str) {
        let dropped = self.table.lock().unwrap().evict(owner);
        if dropped > 0 {
            debug!("cancelled {} pending buffer(s) for {}", dropped, owner);
        }
    }

    /// Set playback volume as a percent, 0..=100.
    pub fn set_volume(&self, percent: u8) -> Result<(), MixerError> {
        if percent > 100 {
            return Err(MixerError::InvalidArgument(format!(
                "volume {} outside 0..=100",
                percent
            )));
        }
        *self.gain.lock().unwrap() = percent as f32 / 100.0;
        Ok(())
    }

    /// Current volume as a percent.
    pub fn volume(&self) -> u8 {
        (*self.gain.lock().unwrap() * 100.0).round() as u8
    }

    /// Number of owners with audio waiting to play.
    pub fn pending_owners(&self) -> usize {
        self.table.lock().unwrap().pending_owners()
    }

    /// Current device lifecycle phase, for status displays.
    pub fn device_phase(&self) -> DevicePhase {
        *self.phase.lock().unwrap()
    }

    /// Discard pending audio and release the device. Idempotent, and
    /// terminal: the engine never opens another session afterwards.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut session) = self.session.lock().unwrap().take() {
            session.stop();
        }
        self.table.lock().unwrap().clear();
    }

    /// Block until queued audio has fully played and the device closed, or
    /// until `timeout` passes. Returns whether the engine went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let device_closed = *self.phase.lock().unwrap() == DevicePhase::Closed;
            if device_closed && self.table.lock().unwrap().is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(IDLE_POLL_MS));
        }
    }

    /// Open a session if none is consuming the table. A session that has
    /// signalled completion is joined and replaced; an active one is left
    /// alone.
    fn ensure_session(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut slot = self.session.lock().unwrap();
        if let Some(session) = slot.as_mut() {
            if session.is_active() {
                return;
            }
            session.stop();
        }
        *slot = Some(OutputSession::spawn(
            Arc::clone(&self.table),
            Arc::clone(&self.gain),
            Arc::clone(&self.phase),
        ));
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mixer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::io::Cursor;

    fn mono_wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for sample in samples {
                writer.write_sample(*sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn volume_defaults_to_half() {
        let mixer = Mixer::new();
        assert_eq!(mixer.volume(), 50);
    }

    #[test]
    fn volume_round_trips_through_percent() {
        let mixer = Mixer::new();
        mixer.set_volume(0).unwrap();
        assert_eq!(mixer.volume(), 0);
        mixer.set_volume(100).unwrap();
        assert_eq!(mixer.volume(), 100);
        mixer.set_volume(37).unwrap();
        assert_eq!(mixer.volume(), 37);
    }

    #[test]
    fn out_of_range_volume_is_rejected_and_ignored() {
        let mixer = Mixer::new();
        mixer.set_volume(80).unwrap();
        let err = mixer.set_volume(101).unwrap_err();
        assert!(matches!(err, MixerError::InvalidArgument(_)));
        assert_eq!(mixer.volume(), 80);
    }

    #[test]
    fn cancelling_an_unknown_owner_is_silent() {
        let mixer = Mixer::new();
        mixer.cancel("nobody");
        mixer.cancel("nobody");
    }

    #[test]
    fn undecodable_payloads_fail_without_touching_the_device() {
        let mixer = Mixer::new();
        let err = mixer.submit("1", b"junk").unwrap_err();
        assert!(matches!(err, MixerError::Format(_)));
        assert_eq!(mixer.device_phase(), DevicePhase::Closed);
        assert_eq!(mixer.pending_owners(), 0);
    }

    #[test]
    fn stereo_payloads_are_format_errors() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for sample in [1_i16, 1, 2, 2] {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }

        let mixer = Mixer::new();
        let err = mixer.submit("1", &cursor.into_inner()).unwrap_err();
        assert!(matches!(err, MixerError::Format(_)));
    }

    #[test]
    fn shutdown_is_idempotent_and_terminal() {
        let mixer = Mixer::new();
        mixer.shutdown();
        mixer.shutdown();

        let clip = mono_wav(16000, &[1000; 256]);
        mixer.submit("1", &clip).unwrap();
        assert_eq!(mixer.pending_owners(), 0);
        assert_eq!(mixer.device_phase(), DevicePhase::Closed);
    }

    #[test]
    fn submissions_after_shutdown_swallow_bad_payloads_too() {
        let mixer = Mixer::new();
        mixer.shutdown();
        // Terminal engines ignore payloads before decoding them.
        mixer.submit("1", b"junk").unwrap();
    }

    #[test]
    fn idle_engine_reports_idle_immediately() {
        let mixer = Mixer::new();
        assert!(mixer.wait_idle(Duration::from_millis(50)));
    }
}
