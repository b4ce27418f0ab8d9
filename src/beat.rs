//! Beat detection over rolling bass-energy statistics.
//!
//! A self-calibrating threshold tracker: bass energy of each frame feeds
//! a short rolling window, the acceptance threshold floats at a fixed
//! multiple of the window mean, and accepted peaks maintain a running
//! tempo estimate.

use std::collections::VecDeque;

use crate::analysis::FrequencySnapshot;
use crate::params::BeatConfig;

/// Stateful beat detector, fed once per frame.
pub struct BeatDetector {
    config: BeatConfig,
    energy_history: VecDeque<f32>,
    threshold: f32,
    peaks: VecDeque<u64>,
    bpm: u32,
    beat_interval_ms: f32,
    last_beat_ms: Option<u64>,
}

impl BeatDetector {
    pub fn new(config: BeatConfig) -> Self {
        Self {
            config,
            energy_history: VecDeque::new(),
            threshold: 0.0,
            peaks: VecDeque::new(),
            bpm: 120,
            beat_interval_ms: 500.0,
            last_beat_ms: None,
        }
    }

    /// Feed one frame of frequency data; returns true when this frame
    /// counts as a beat.
    ///
    /// Energy history and threshold update on every call with usable
    /// data; peak/tempo state only updates on acceptance. An empty
    /// snapshot is "no signal" and touches nothing.
    pub fn on_frame(&mut self, snapshot: &FrequencySnapshot, now_ms: u64) -> bool {
        let bass_bins = (snapshot.bin_count() as f32 * self.config.bass_fraction) as usize;
        if bass_bins == 0 {
            return false;
        }

        let bass_energy = snapshot.combined[..bass_bins]
            .iter()
            .map(|&m| m as f32)
            .sum::<f32>()
            / bass_bins as f32;

        self.energy_history.push_back(bass_energy);
        while self.energy_history.len() > self.config.energy_window {
            self.energy_history.pop_front();
        }

        let mean_energy =
            self.energy_history.iter().sum::<f32>() / self.energy_history.len() as f32;
        self.threshold = mean_energy * self.config.threshold_scale;

        // Strictly above threshold, and outside the minimum beat gap
        let gate_open = self
            .last_beat_ms
            .map_or(true, |last| now_ms - last > self.config.min_beat_gap_ms);

        if bass_energy > self.threshold && gate_open {
            self.accept_peak(now_ms);
            return true;
        }
        false
    }

    fn accept_peak(&mut self, now_ms: u64) {
        self.peaks.push_back(now_ms);
        self.last_beat_ms = Some(now_ms);

        while self
            .peaks
            .front()
            .is_some_and(|&t| now_ms - t >= self.config.peak_retention_ms)
        {
            self.peaks.pop_front();
        }

        if self.peaks.len() >= self.config.min_peaks_for_tempo {
            let intervals = self.peaks.len() - 1;
            let span = (self.peaks.back().unwrap() - self.peaks.front().unwrap()) as f32;
            let mean_interval = span / intervals as f32;

            self.bpm = (60_000.0 / mean_interval).round() as u32;
            self.beat_interval_ms = mean_interval;
        }
    }

    /// Current tempo estimate (beats per minute)
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Mean interval between recent beats (milliseconds)
    pub fn beat_interval_ms(&self) -> f32 {
        self.beat_interval_ms
    }

    /// Current acceptance threshold (byte-magnitude units)
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Number of peaks inside the retention window
    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Snapshot whose bass bins all carry the given magnitude
    fn snapshot_with_bass(level: u8) -> FrequencySnapshot {
        FrequencySnapshot {
            combined: vec![level; 100],
            left: vec![0; 100],
            right: vec![0; 100],
            sample_rate_hz: 44100.0,
            fft_size: 200,
        }
    }

    #[test]
    fn test_empty_snapshot_is_no_signal() {
        let mut detector = BeatDetector::new(BeatConfig::default());

        assert!(!detector.on_frame(&FrequencySnapshot::empty(), 100));
        assert_eq!(detector.threshold(), 0.0);
        assert_eq!(detector.peak_count(), 0);
    }

    #[test]
    fn test_constant_energy_never_beats() {
        // With a flat signal the threshold sits 15% above the mean, so the
        // strict comparison can never pass.
        let mut detector = BeatDetector::new(BeatConfig::default());
        let snapshot = snapshot_with_bass(100);

        for frame in 0..120 {
            assert!(!detector.on_frame(&snapshot, frame * 16));
        }
        assert!((detector.threshold() - 115.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_energy_boundary_excluded() {
        // Threshold 0 and energy 0: equality must not fire a beat.
        let mut detector = BeatDetector::new(BeatConfig::default());
        let snapshot = snapshot_with_bass(0);

        for frame in 0..60 {
            assert!(!detector.on_frame(&snapshot, frame * 16));
        }
    }

    #[test]
    fn test_spike_over_quiet_floor_beats() {
        let mut detector = BeatDetector::new(BeatConfig::default());
        let quiet = snapshot_with_bass(10);
        let spike = snapshot_with_bass(255);

        for frame in 0..30 {
            assert!(!detector.on_frame(&quiet, frame * 16));
        }
        assert!(detector.on_frame(&spike, 500));
        assert_eq!(detector.peak_count(), 1);
    }

    #[test]
    fn test_minimum_beat_gap() {
        let mut detector = BeatDetector::new(BeatConfig::default());
        let quiet = snapshot_with_bass(10);
        let spike = snapshot_with_bass(255);

        for frame in 0..30 {
            detector.on_frame(&quiet, frame * 10);
        }
        assert!(detector.on_frame(&spike, 400));
        // 100 ms later: still above threshold but inside the 200 ms gap
        assert!(!detector.on_frame(&spike, 500));
        // 250 ms after the first beat the gate has reopened
        assert!(detector.on_frame(&spike, 650));
    }

    #[test]
    fn test_tempo_converges_on_regular_peaks() {
        // Spikes every 500 ms over a quiet floor: 120 BPM.
        let mut detector = BeatDetector::new(BeatConfig::default());
        let quiet = snapshot_with_bass(10);
        let spike = snapshot_with_bass(255);

        let mut beats = 0;
        for step in 1..=40 {
            let now = step * 100;
            let fired = if now % 500 == 0 {
                detector.on_frame(&spike, now)
            } else {
                detector.on_frame(&quiet, now)
            };
            if fired {
                beats += 1;
            }
        }

        assert!(beats >= 3, "expected at least 3 beats, got {}", beats);
        assert_eq!(detector.bpm(), 120);
        assert!((detector.beat_interval_ms() - 500.0).abs() < 0.01);
    }

    #[test]
    fn test_peak_retention_window() {
        let mut detector = BeatDetector::new(BeatConfig::default());
        let quiet = snapshot_with_bass(10);
        let spike = snapshot_with_bass(255);

        for frame in 0..30 {
            detector.on_frame(&quiet, frame * 10);
        }
        assert!(detector.on_frame(&spike, 1000));
        assert!(detector.on_frame(&spike, 2000));
        assert_eq!(detector.peak_count(), 2);

        // 11 s later both old peaks fall outside the retention window
        assert!(detector.on_frame(&spike, 13_000));
        assert_eq!(detector.peak_count(), 1);
    }
}
