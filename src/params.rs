//! Parameter definitions with documented semantics.
//!
//! All tuning constants live here with:
//! - Units (seconds, Hz, world units, per-frame amounts)
//! - Documented ranges and meanings
//! - Default values matching the reference behavior of the system

/// Spawning/layout policy for the node field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizerMode {
    /// Spawn every frame, nodes arranged around the origin
    Classic,

    /// Spawn only on detected beats, classic placement
    Bpm,

    /// Spawn ahead of a continuously advancing travel position
    Journey,
}

impl VisualizerMode {
    /// Cycle to the next mode (keyboard mode switching)
    pub fn next(self) -> Self {
        match self {
            Self::Classic => Self::Bpm,
            Self::Bpm => Self::Journey,
            Self::Journey => Self::Classic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Bpm => "bpm",
            Self::Journey => "journey",
        }
    }
}

/// Node lifetime bounds (seconds)
pub const LIFETIME_RANGE_S: (f32, f32) = (0.5, 5.0);

/// Live-tunable visualizer settings.
///
/// Every field may change mid-session; `lifetime_s` only affects nodes
/// created after the change because decay is frozen at creation time.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Visual node scale (dimensionless, passed through to node creation)
    pub node_size: f32,

    /// Spawn credit accrued per frame (nodes per frame, fractional)
    pub spawn_rate: f32,

    /// Placement radius scale (world units)
    pub spread: f32,

    /// Orbit auto-rotation speed for classic/bpm camera (dimensionless)
    pub camera_speed: f32,

    /// Node lifetime in seconds, clamped to [0.5, 5.0]
    pub lifetime_s: f32,

    /// Active spawning/layout policy
    pub mode: VisualizerMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_size: 1.0,
            spawn_rate: 1.0,
            spread: 50.0,
            camera_speed: 0.0,
            lifetime_s: 2.0,
            mode: VisualizerMode::Classic,
        }
    }
}

impl Settings {
    /// Set the node lifetime, clamping to the supported range
    pub fn set_lifetime(&mut self, lifetime_s: f32) {
        self.lifetime_s = lifetime_s.clamp(LIFETIME_RANGE_S.0, LIFETIME_RANGE_S.1);
    }

    /// Per-frame life decrement for a node created now (60 fps tick)
    pub fn decay_per_frame(&self) -> f32 {
        let lifetime = self.lifetime_s.clamp(LIFETIME_RANGE_S.0, LIFETIME_RANGE_S.1);
        1.0 / (lifetime * 60.0)
    }
}

/// Spectrum analysis configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Audio sample rate (Hz); replaced by the actual device rate at startup
    pub sample_rate_hz: usize,

    /// Analysis window size in samples (must be a power of 2)
    pub fft_size: usize,

    /// Analysis thread update interval (milliseconds)
    pub update_interval_ms: u64,

    /// Temporal smoothing constant applied to magnitudes (0 = none, 1 = frozen)
    pub smoothing: f32,

    /// Decibel floor mapped to byte magnitude 0
    pub min_db: f32,

    /// Decibel ceiling mapped to byte magnitude 255
    pub max_db: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            fft_size: 2048,
            update_interval_ms: 16,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyzerConfig {
    /// Number of magnitude bins per snapshot (half the window size)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Frequency resolution of one bin (Hz)
    pub fn hz_per_bin(&self) -> f32 {
        self.sample_rate_hz as f32 / self.fft_size as f32
    }

    /// Validate configuration (window size must be a power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "Analysis window size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.sample_rate_hz == 0 {
            return Err("Sample rate must be > 0".to_string());
        }
        Ok(())
    }
}

/// Beat detection configuration
#[derive(Debug, Clone)]
pub struct BeatConfig {
    /// Fraction of the spectrum (lowest bins) treated as bass
    pub bass_fraction: f32,

    /// Rolling energy history length in frames (~0.7 s at 60 Hz)
    pub energy_window: usize,

    /// Threshold = mean(history) x this scale
    pub threshold_scale: f32,

    /// Minimum gap between accepted beats (milliseconds, caps tempo at 300 BPM)
    pub min_beat_gap_ms: u64,

    /// Peaks older than this are pruned (milliseconds)
    pub peak_retention_ms: u64,

    /// Minimum retained peaks before the tempo estimate updates
    pub min_peaks_for_tempo: usize,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            bass_fraction: 0.1,
            energy_window: 43,
            threshold_scale: 1.15,
            min_beat_gap_ms: 200,
            peak_retention_ms: 10_000,
            min_peaks_for_tempo: 3,
        }
    }
}

/// Spawn planning configuration
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Number of equal-width spectrum bands scanned per spawn pass
    pub bands: usize,

    /// A band spawns only when its normalized mean energy exceeds this
    pub band_gate: f32,

    /// No spawning below this normalized frame amplitude
    pub min_amplitude: f32,

    /// Hard population cap; oldest nodes evicted beyond this
    pub max_nodes: usize,

    /// Full width of uniform X/Z placement jitter (world units)
    pub jitter_xz: f32,

    /// Full width of uniform Z jitter in journey mode (world units)
    pub journey_jitter_z: f32,

    /// Scale applied to the angular X contribution
    pub radial_x_scale: f32,

    /// Scale applied to the angular Z contribution in journey mode
    pub journey_z_scale: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            bands: 8,
            band_gate: 0.1,
            min_amplitude: 0.05,
            max_nodes: 5000,
            jitter_xz: 5.0,
            journey_jitter_z: 10.0,
            radial_x_scale: 0.5,
            journey_z_scale: 0.3,
        }
    }
}

/// Journey travel configuration
#[derive(Debug, Clone)]
pub struct JourneyConfig {
    /// Travel speed (world units per frame)
    pub speed: f32,

    /// How far ahead of the travel position new nodes are placed (world units)
    pub spawn_distance: f32,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            speed: 0.5,
            spawn_distance: 10.0,
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 75.0,
            near_plane: 0.1,
            far_plane: 1000.0,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifetime_clamping() {
        let mut settings = Settings::default();

        settings.set_lifetime(0.1);
        assert_eq!(settings.lifetime_s, 0.5);

        settings.set_lifetime(10.0);
        assert_eq!(settings.lifetime_s, 5.0);

        settings.set_lifetime(3.0);
        assert_eq!(settings.lifetime_s, 3.0);
    }

    #[test]
    fn test_decay_per_frame() {
        let mut settings = Settings::default();

        // 2 second lifetime at 60 fps
        assert!((settings.decay_per_frame() - 1.0 / 120.0).abs() < 1e-7);

        // Out-of-range lifetime is clamped before the decay computation
        settings.lifetime_s = 100.0;
        assert!((settings.decay_per_frame() - 1.0 / 300.0).abs() < 1e-7);
    }

    #[test]
    fn test_analyzer_config_bins() {
        let config = AnalyzerConfig::default();

        // 2048-sample window => 1024 bins at ~21.5 Hz each
        assert_eq!(config.bin_count(), 1024);
        assert!((config.hz_per_bin() - 21.533203).abs() < 0.001);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_analyzer_config_rejects_bad_window() {
        let config = AnalyzerConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_cycle() {
        let mode = VisualizerMode::Classic;
        assert_eq!(mode.next(), VisualizerMode::Bpm);
        assert_eq!(mode.next().next(), VisualizerMode::Journey);
        assert_eq!(mode.next().next().next(), VisualizerMode::Classic);
    }
}
