//! Session controller: owns all core state and advances it one frame at
//! a time.
//!
//! The driver calls `tick` once per rendering callback with the current
//! clock and frequency snapshot; nothing in here schedules frames or
//! touches GPU resources.

use log::info;

use crate::analysis::FrequencySnapshot;
use crate::beat::BeatDetector;
use crate::field::NodeField;
use crate::journey::JourneyState;
use crate::params::{
    BeatConfig, JourneyConfig, Settings, SpawnConfig, VisualizerMode,
};
use crate::spawn::SpawnPlanner;

/// Per-frame summary for the stats surface
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub spawned: usize,
    pub expired: usize,
    pub beat: bool,
    pub bpm: u32,
    pub node_count: usize,
    pub avg_amplitude: f32,
    pub dominant_hz: Option<f32>,
}

/// All mutable visualizer state behind one explicit context.
pub struct Visualizer {
    pub settings: Settings,
    pub beat: BeatDetector,
    pub planner: SpawnPlanner,
    pub field: NodeField,
    pub journey: JourneyState,
}

impl Visualizer {
    pub fn new(settings: Settings) -> Self {
        let spawn_config = SpawnConfig::default();
        Self {
            settings,
            beat: BeatDetector::new(BeatConfig::default()),
            field: NodeField::new(spawn_config.max_nodes),
            planner: SpawnPlanner::new(spawn_config),
            journey: JourneyState::new(&JourneyConfig::default()),
        }
    }

    /// Advance the whole visualizer by one frame.
    ///
    /// Order matches the frame loop this models: spawn pass (reading the
    /// pre-advance journey position), node decay/eviction and adjacency
    /// rebuild, then journey travel.
    pub fn tick(&mut self, now_ms: u64, snapshot: &FrequencySnapshot, active: bool) -> FrameResult {
        let plan = self.planner.plan(
            snapshot,
            &self.settings,
            &self.journey,
            &mut self.beat,
            active,
            now_ms,
        );

        let spawned = plan.nodes.len();
        for node in plan.nodes {
            self.field.spawn(node);
        }

        let expired = self.field.advance();

        if self.settings.mode == VisualizerMode::Journey && active {
            self.journey.advance();
        }

        FrameResult {
            spawned,
            expired,
            beat: plan.beat,
            bpm: self.beat.bpm(),
            node_count: self.field.len(),
            avg_amplitude: plan.avg_amplitude,
            dominant_hz: plan.dominant_hz,
        }
    }

    /// Clear nodes, connections, spawn credit and journey position.
    /// Beat-detector state is session-lived and survives.
    pub fn reset(&mut self) {
        self.field.clear();
        self.planner.reset();
        self.journey.reset();
    }

    /// Switch layout mode; always performs a full reset
    pub fn set_mode(&mut self, mode: VisualizerMode) {
        info!("Mode: {}", mode.label());
        self.settings.mode = mode;
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat loud spectrum: every band spawns
    fn loud_snapshot() -> FrequencySnapshot {
        FrequencySnapshot {
            combined: vec![200; 80],
            left: vec![0; 80],
            right: vec![0; 80],
            sample_rate_hz: 44100.0,
            fft_size: 160,
        }
    }

    fn visualizer() -> Visualizer {
        Visualizer::new(Settings::default())
    }

    #[test]
    fn test_tick_spawns_and_counts() {
        let mut viz = visualizer();

        let result = viz.tick(16, &loud_snapshot(), true);
        assert_eq!(result.spawned, 8);
        assert_eq!(result.node_count, 8);
        assert_eq!(result.expired, 0);
        assert_eq!(viz.field.connections().len(), 7);
    }

    #[test]
    fn test_inactive_tick_only_decays() {
        let mut viz = visualizer();
        viz.tick(16, &loud_snapshot(), true);

        let life_before: f32 = viz.field.nodes().next().unwrap().life;
        let result = viz.tick(32, &loud_snapshot(), false);

        assert_eq!(result.spawned, 0);
        assert!(viz.field.nodes().next().unwrap().life < life_before);
    }

    #[test]
    fn test_population_stays_bounded() {
        let mut viz = visualizer();
        viz.settings.spawn_rate = 10.0;
        viz.settings.set_lifetime(5.0);

        for frame in 0..800 {
            let result = viz.tick(frame * 16, &loud_snapshot(), true);
            assert!(result.node_count <= 5000);
        }
    }

    #[test]
    fn test_journey_advances_only_when_active() {
        let mut viz = visualizer();
        viz.set_mode(VisualizerMode::Journey);

        viz.tick(16, &loud_snapshot(), false);
        assert_eq!(viz.journey.position(), 0.0);

        viz.tick(32, &loud_snapshot(), true);
        assert!(viz.journey.position() > 0.0);
    }

    #[test]
    fn test_spawn_reads_pre_advance_journey_position() {
        use crate::spawn::{SpawnPlanner, ZeroJitter};

        let mut viz = visualizer();
        viz.planner = SpawnPlanner::with_jitter(SpawnConfig::default(), Box::new(ZeroJitter));
        viz.set_mode(VisualizerMode::Journey);

        // First active tick: nodes placed relative to position 0, not the
        // post-advance position 0.5
        let result = viz.tick(16, &loud_snapshot(), true);
        assert!(result.spawned > 0);

        let max_z = viz
            .field
            .nodes()
            .map(|n| n.position.z)
            .fold(f32::MIN, f32::max);
        let radius = (200.0 / 255.0) * viz.settings.spread;
        let expected = 10.0 + radius * 0.3; // spawn_distance + peak angular term
        assert!((max_z - expected).abs() < 1e-3);
        assert!((viz.journey.position() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_reset_completeness() {
        let mut viz = visualizer();
        viz.settings.mode = VisualizerMode::Journey;
        viz.settings.spawn_rate = 0.7;

        for frame in 0..20 {
            viz.tick(frame * 16, &loud_snapshot(), true);
        }
        assert!(!viz.field.is_empty());
        assert!(viz.journey.position() > 0.0);

        viz.reset();
        assert!(viz.field.is_empty());
        assert!(viz.field.connections().is_empty());
        assert_eq!(viz.planner.counter(), 0.0);
        assert_eq!(viz.journey.position(), 0.0);
    }

    #[test]
    fn test_mode_change_resets() {
        let mut viz = visualizer();
        viz.tick(16, &loud_snapshot(), true);
        assert!(!viz.field.is_empty());

        viz.set_mode(VisualizerMode::Bpm);
        assert!(viz.field.is_empty());
        assert_eq!(viz.planner.counter(), 0.0);
    }

    #[test]
    fn test_lifetime_change_affects_only_new_nodes() {
        let mut viz = visualizer();
        viz.settings.set_lifetime(1.0);
        viz.tick(16, &loud_snapshot(), true);

        let old_decay = viz.field.nodes().next().unwrap().decay;

        viz.settings.set_lifetime(5.0);
        viz.tick(32, &loud_snapshot(), true);

        let decays: Vec<f32> = viz.field.nodes().map(|n| n.decay).collect();
        assert_eq!(decays.len(), 16);
        // First batch keeps its creation-time decay
        assert!(decays[..8].iter().all(|&d| (d - old_decay).abs() < 1e-9));
        // Second batch decays five times slower
        assert!(decays[8..].iter().all(|&d| (d - old_decay / 5.0).abs() < 1e-7));
    }
}
