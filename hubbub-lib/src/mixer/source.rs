//! The pull side of the engine: a rodio source that stages one mixed frame
//! at a time from the stream table.
//!
//! Each refill captures the per-owner head chunks under the table lock,
//! releases the lock, then averages, applies gain and clamps outside the
//! critical section. Observing an empty table marks the session finished
//! while the lock is still held, so a clip submitted concurrently either
//! lands before the check (and gets mixed) or finds the finished flag set
//! and starts a fresh session.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::source::{SeekError, Source};

use super::table::StreamTable;
use crate::constants::CANONICAL_SAMPLE_RATE;

/// Mono source over the shared stream table, emitting canonical-rate
/// samples until the table drains.
pub(crate) struct MixSource {
    table: Arc<Mutex<StreamTable>>,
    gain: Arc<Mutex<f32>>,
    finished: Arc<AtomicBool>,
    frame_len: usize,
    staged: VecDeque<f32>,
}

impl MixSource {
    pub(crate) fn new(
        table: Arc<Mutex<StreamTable>>,
        gain: Arc<Mutex<f32>>,
        finished: Arc<AtomicBool>,
        frame_len: usize,
    ) -> Self {
        Self {
            table,
            gain,
            finished,
            frame_len,
            staged: VecDeque::new(),
        }
    }

    fn refill(&mut self) {
        let chunks = {
            let mut table = match self.table.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    // Poisoned table: a producer panicked mid-update. End
                    // the session rather than unwind into the driver.
                    self.finished.store(true, Ordering::SeqCst);
                    return;
                }
            };
            if table.is_empty() {
                self.finished.store(true, Ordering::SeqCst);
                return;
            }
            table.capture_frame(self.frame_len)
        };

        let gain = match self.gain.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        for sample in mix_chunks(&chunks, gain) {
            self.staged.push_back(sample as f32 / 32768.0);
        }
    }
}

/// Average the captured chunks pointwise, then scale by `gain` and clamp
/// to the 16-bit range. Division happens before the gain multiply so a
/// full-amplitude pileup cannot overflow.
pub(crate) fn mix_chunks(chunks: &[Vec<i16>], gain: f32) -> Vec<i16> {
    let count = chunks.len() as i64;
    let frame_len = chunks.first().map_or(0, |chunk| chunk.len());
    let mut frame = Vec::with_capacity(frame_len);
    for index in 0..frame_len {
        let sum: i64 = chunks.iter().map(|chunk| chunk[index] as i64).sum();
        let scaled = (sum / count) as f32 * gain;
        frame.push(scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16);
    }
    frame
}

impl Iterator for MixSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(sample) = self.staged.pop_front() {
            return Some(sample);
        }
        if self.finished.load(Ordering::SeqCst) {
            return None;
        }
        self.refill();
        self.staged.pop_front()
    }
}

impl Source for MixSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        CANONICAL_SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }

    fn try_seek(&mut self, _pos: Duration) -> Result<(), SeekError> {
        Err(SeekError::NotSupported {
            underlying_source: "MixSource",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_table() -> Arc<Mutex<StreamTable>> {
        Arc::new(Mutex::new(StreamTable::new()))
    }

    fn source_over(
        table: &Arc<Mutex<StreamTable>>,
        gain: f32,
        frame_len: usize,
    ) -> (MixSource, Arc<AtomicBool>) {
        let finished = Arc::new(AtomicBool::new(false));
        let source = MixSource::new(
            Arc::clone(table),
            Arc::new(Mutex::new(gain)),
            Arc::clone(&finished),
            frame_len,
        );
        (source, finished)
    }

    fn pull_frame(source: &mut MixSource, frame_len: usize) -> Vec<i16> {
        (0..frame_len)
            .map_while(|_| source.next())
            .map(|sample| (sample * 32768.0).round() as i16)
            .collect()
    }

    #[test]
    fn averages_two_owners_then_plays_the_longer_one_alone() {
        let table = shared_table();
        {
            let mut guard = table.lock().unwrap();
            guard.push("1", vec![1000; 100]);
            guard.push("2", vec![2000; 200]);
        }
        let (mut source, finished) = source_over(&table, 1.0, 100);

        let first = pull_frame(&mut source, 100);
        assert_eq!(first, vec![1500; 100]);

        let second = pull_frame(&mut source, 100);
        assert_eq!(second, vec![2000; 100]);

        assert_eq!(source.next(), None);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn continue_frames_are_never_short() {
        let table = shared_table();
        table.lock().unwrap().push("1", vec![123; 30]);
        let (mut source, _) = source_over(&table, 1.0, 100);

        let mut emitted = Vec::new();
        while let Some(sample) = source.next() {
            emitted.push((sample * 32768.0).round() as i16);
        }
        // One full frame: the 30 real samples padded to the frame length.
        assert_eq!(emitted.len(), 100);
        assert_eq!(&emitted[..30], &[123; 30][..]);
        assert_eq!(&emitted[30..], &[0; 70][..]);
    }

    #[test]
    fn empty_table_completes_immediately() {
        let table = shared_table();
        let (mut source, finished) = source_over(&table, 1.0, 100);
        assert_eq!(source.next(), None);
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(source.next(), None);
    }

    #[test]
    fn clip_submitted_mid_stream_is_picked_up() {
        let table = shared_table();
        table.lock().unwrap().push("1", vec![500; 100]);
        let (mut source, finished) = source_over(&table, 1.0, 100);

        let first = pull_frame(&mut source, 100);
        assert_eq!(first, vec![500; 100]);

        table.lock().unwrap().push("1", vec![600; 100]);
        let second = pull_frame(&mut source, 100);
        assert_eq!(second, vec![600; 100]);
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn mixing_averages_before_applying_gain() {
        let chunks = vec![vec![i16::MAX; 4], vec![i16::MAX; 4]];
        let mixed = mix_chunks(&chunks, 1.0);
        assert_eq!(mixed, vec![i16::MAX; 4]);
    }

    #[test]
    fn gain_scales_the_average() {
        let chunks = vec![vec![1000; 3], vec![2000; 3]];
        assert_eq!(mix_chunks(&chunks, 0.5), vec![750; 3]);
        assert_eq!(mix_chunks(&chunks, 0.0), vec![0; 3]);
    }

    #[test]
    fn raising_gain_never_shrinks_magnitudes() {
        let chunks = vec![vec![-1200, 40, 900, i16::MIN], vec![300, -40, 2500, i16::MIN]];
        let low = mix_chunks(&chunks, 0.3);
        let high = mix_chunks(&chunks, 0.8);
        for (quiet, loud) in low.iter().zip(high.iter()) {
            assert!((quiet.unsigned_abs()) <= (loud.unsigned_abs()));
        }
    }
}
