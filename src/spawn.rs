//! Frame spawn planning: spawn credit, band scan, 3D placement.
//!
//! Each frame the planner decides whether the per-band scan runs (spawn
//! credit and amplitude gates, beat gating in bpm mode) and where each
//! qualifying band's node lands under the active layout policy.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::analysis::FrequencySnapshot;
use crate::beat::BeatDetector;
use crate::field::Node;
use crate::journey::JourneyState;
use crate::params::{Settings, SpawnConfig, VisualizerMode};

/// Uniform random placement offsets, injectable so layout tests can pin
/// jitter to zero.
pub trait JitterSource {
    /// Uniform sample over [-range/2, range/2)
    fn offset(&mut self, range: f32) -> f32;
}

/// Entropy-seeded jitter used in production
pub struct RandomJitter(StdRng);

impl RandomJitter {
    pub fn new() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl Default for RandomJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterSource for RandomJitter {
    fn offset(&mut self, range: f32) -> f32 {
        self.0.gen_range(-0.5..0.5) * range
    }
}

/// Jitter source that always yields zero (deterministic placement)
pub struct ZeroJitter;

impl JitterSource for ZeroJitter {
    fn offset(&mut self, _range: f32) -> f32 {
        0.0
    }
}

/// Outcome of one planning pass
pub struct SpawnPlan {
    /// Nodes to add to the field this frame, one per qualifying band
    pub nodes: Vec<Node>,
    /// Whether the beat detector fired (bpm mode only)
    pub beat: bool,
    /// Mean normalized amplitude of the combined channel
    pub avg_amplitude: f32,
    /// Readout frequency of a band whose mean exactly equals the frame mean
    pub dominant_hz: Option<f32>,
}

impl SpawnPlan {
    fn quiet() -> Self {
        Self {
            nodes: Vec::new(),
            beat: false,
            avg_amplitude: 0.0,
            dominant_hz: None,
        }
    }
}

/// Per-frame spawn decision maker
pub struct SpawnPlanner {
    config: SpawnConfig,
    counter: f32,
    jitter: Box<dyn JitterSource>,
}

impl SpawnPlanner {
    pub fn new(config: SpawnConfig) -> Self {
        Self::with_jitter(config, Box::new(RandomJitter::new()))
    }

    pub fn with_jitter(config: SpawnConfig, jitter: Box<dyn JitterSource>) -> Self {
        Self {
            config,
            counter: 0.0,
            jitter,
        }
    }

    /// Accumulated spawn credit (fractional)
    pub fn counter(&self) -> f32 {
        self.counter
    }

    /// Drop accumulated spawn credit
    pub fn reset(&mut self) {
        self.counter = 0.0;
    }

    /// Plan this frame's node creations.
    ///
    /// Inactive playback leaves all state untouched. In bpm mode the beat
    /// detector runs first and a beatless frame plans nothing further.
    /// Spawn credit accrues on every eligible frame; the band scan runs
    /// once when at least one whole credit is available and the frame is
    /// loud enough, consuming the whole part of the credit.
    pub fn plan(
        &mut self,
        snapshot: &FrequencySnapshot,
        settings: &Settings,
        journey: &JourneyState,
        beat: &mut BeatDetector,
        active: bool,
        now_ms: u64,
    ) -> SpawnPlan {
        if !active {
            return SpawnPlan::quiet();
        }

        let mut plan = SpawnPlan::quiet();
        if settings.mode == VisualizerMode::Bpm {
            plan.beat = beat.on_frame(snapshot, now_ms);
            if !plan.beat {
                return plan;
            }
        }

        self.counter += settings.spawn_rate;

        plan.avg_amplitude = mean_normalized(&snapshot.combined);
        if self.counter < 1.0 || plan.avg_amplitude <= self.config.min_amplitude {
            return plan;
        }
        self.counter -= self.counter.floor();

        let band_size = snapshot.bin_count() / self.config.bands;
        if band_size == 0 {
            return plan;
        }

        let stereo_balance =
            mean_normalized(&snapshot.right) - mean_normalized(&snapshot.left);
        let stereo_x = stereo_balance * settings.spread;

        for band in 0..self.config.bands {
            let start = band * band_size;
            let end = start + band_size;
            let bins = &snapshot.combined[start..end];

            let band_avg = mean_normalized(bins);
            if band_avg <= self.config.band_gate {
                continue;
            }
            let peak = bins.iter().copied().max().unwrap_or(0);

            let angle = band as f32 / self.config.bands as f32 * TAU;
            let radius = band_avg * settings.spread;
            let position = self.place(angle, radius, stereo_x, band_avg, settings, journey);

            plan.nodes.push(Node::new(position, band_avg, peak, settings));

            // Exact equality, not closeness: the readout only moves when one
            // band's mean coincides with the frame mean.
            if band_avg == plan.avg_amplitude {
                plan.dominant_hz = Some((start + end) as f32 / 2.0 * snapshot.hz_per_bin());
            }
        }

        plan
    }

    fn place(
        &mut self,
        angle: f32,
        radius: f32,
        stereo_x: f32,
        band_avg: f32,
        settings: &Settings,
        journey: &JourneyState,
    ) -> Vec3 {
        let x = stereo_x
            + angle.cos() * radius * self.config.radial_x_scale
            + self.jitter.offset(self.config.jitter_xz);
        let y = self.jitter.offset(settings.spread * band_avg);

        let z = match settings.mode {
            VisualizerMode::Journey => {
                journey.spawn_z()
                    + angle.sin() * radius * self.config.journey_z_scale
                    + self.jitter.offset(self.config.journey_jitter_z)
            }
            _ => angle.sin() * radius + self.jitter.offset(self.config.jitter_xz),
        };

        Vec3::new(x, y, z)
    }
}

/// Mean of byte magnitudes normalized to [0, 1]; 0 for empty input
fn mean_normalized(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().map(|&m| m as f32).sum::<f32>() / bins.len() as f32 / 255.0
}
