//! Spectrum analysis: stereo sample blocks to byte-magnitude snapshots.
//!
//! Converts windows of raw audio into the per-frame frequency data the
//! core consumes: one combined and two side-channel magnitude arrays of
//! 8-bit values, with decibel scaling and temporal smoothing so byte
//! levels stay comparable across sources.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::params::AnalyzerConfig;

/// One frame of frequency-domain data.
///
/// Magnitudes are 0-255 per bin. `combined` drives beat detection and the
/// band scan; `left`/`right` feed the stereo balance term. An empty
/// snapshot (before the first analysis pass) carries zero bins.
#[derive(Debug, Clone, Default)]
pub struct FrequencySnapshot {
    pub combined: Vec<u8>,
    pub left: Vec<u8>,
    pub right: Vec<u8>,
    pub sample_rate_hz: f32,
    pub fft_size: usize,
}

impl FrequencySnapshot {
    /// Snapshot representing "no data yet"
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bin_count(&self) -> usize {
        self.combined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }

    /// Frequency resolution of one bin (Hz); 0 for an empty snapshot
    pub fn hz_per_bin(&self) -> f32 {
        if self.fft_size == 0 {
            0.0
        } else {
            self.sample_rate_hz / self.fft_size as f32
        }
    }
}

/// FFT analysis of a single channel with temporal smoothing.
struct ChannelAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    /// Smoothed linear magnitudes, one per output bin
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl ChannelAnalyzer {
    fn new(config: &AnalyzerConfig, planner: &mut FftPlanner<f32>) -> Self {
        Self {
            fft: planner.plan_fft_forward(config.fft_size),
            fft_size: config.fft_size,
            smoothing: config.smoothing,
            min_db: config.min_db,
            max_db: config.max_db,
            smoothed: vec![0.0; config.bin_count()],
            scratch: vec![Complex::new(0.0, 0.0); config.fft_size],
        }
    }

    /// Analyze exactly one window of samples into byte magnitudes.
    fn analyze(&mut self, samples: &[f32]) -> Vec<u8> {
        debug_assert_eq!(samples.len(), self.fft_size);

        for (i, sample) in samples.iter().enumerate() {
            let window = hann_window(i, self.fft_size);
            self.scratch[i] = Complex::new(sample * window, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let smoothing = self.smoothing;
        let min_db = self.min_db;
        let db_range = self.max_db - self.min_db;
        let norm = self.fft_size as f32;

        self.smoothed
            .iter_mut()
            .zip(self.scratch.iter())
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() / norm;
                *smoothed = smoothing * *smoothed + (1.0 - smoothing) * magnitude;

                let db = 20.0 * smoothed.log10();
                let scaled = (db - min_db) / db_range * 255.0;
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

/// Stereo spectrum analyzer producing complete snapshots.
///
/// Mirrors the channel arrangement of the audio graph: a combined (mono
/// mix) analysis plus independent left/right analyses, each with its own
/// smoothing state.
pub struct SpectrumAnalyzer {
    combined: ChannelAnalyzer,
    left: ChannelAnalyzer,
    right: ChannelAnalyzer,
    mono: Vec<f32>,
    sample_rate_hz: f32,
    fft_size: usize,
}

impl SpectrumAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            combined: ChannelAnalyzer::new(config, &mut planner),
            left: ChannelAnalyzer::new(config, &mut planner),
            right: ChannelAnalyzer::new(config, &mut planner),
            mono: vec![0.0; config.fft_size],
            sample_rate_hz: config.sample_rate_hz as f32,
            fft_size: config.fft_size,
        }
    }

    /// Analyze one window of stereo samples (both slices one window long).
    pub fn analyze(&mut self, left: &[f32], right: &[f32]) -> FrequencySnapshot {
        for (mono, (l, r)) in self.mono.iter_mut().zip(left.iter().zip(right.iter())) {
            *mono = (l + r) * 0.5;
        }

        FrequencySnapshot {
            combined: self.combined.analyze(&self.mono),
            left: self.left.analyze(left),
            right: self.right.analyze(right),
            sample_rate_hz: self.sample_rate_hz,
            fft_size: self.fft_size,
        }
    }
}

/// Hann window function for FFT analysis
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AnalyzerConfig {
        AnalyzerConfig {
            sample_rate_hz: 44100,
            fft_size: 1024,
            ..Default::default()
        }
    }

    #[test]
    fn test_hann_window() {
        let size = 1024;

        // Hann window should be 0 at edges, 1 at center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = FrequencySnapshot::empty();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.bin_count(), 0);
        assert_eq!(snapshot.hz_per_bin(), 0.0);
    }

    #[test]
    fn test_silence_produces_zero_magnitudes() {
        let config = test_config();
        let mut analyzer = SpectrumAnalyzer::new(&config);

        let silence = vec![0.0; config.fft_size];
        let snapshot = analyzer.analyze(&silence, &silence);

        assert_eq!(snapshot.bin_count(), config.bin_count());
        assert!(snapshot.combined.iter().all(|&m| m == 0));
        assert!(snapshot.left.iter().all(|&m| m == 0));
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let config = test_config();
        let mut analyzer = SpectrumAnalyzer::new(&config);

        // Full-scale sine exactly on bin 100
        let target_bin = 100;
        let freq = target_bin as f32 * config.hz_per_bin();
        let samples: Vec<f32> = (0..config.fft_size)
            .map(|i| (2.0 * PI * freq * i as f32 / config.sample_rate_hz as f32).sin())
            .collect();

        let snapshot = analyzer.analyze(&samples, &samples);

        let peak = snapshot.combined[target_bin];
        assert!(peak > 200, "expected strong magnitude at bin, got {}", peak);
        assert!(snapshot.combined[target_bin + 200] < peak);
    }

    #[test]
    fn test_snapshot_carries_rate_and_window() {
        let config = test_config();
        let mut analyzer = SpectrumAnalyzer::new(&config);

        let silence = vec![0.0; config.fft_size];
        let snapshot = analyzer.analyze(&silence, &silence);

        assert_eq!(snapshot.fft_size, 1024);
        assert!((snapshot.hz_per_bin() - config.hz_per_bin()).abs() < 1e-6);
    }
}
