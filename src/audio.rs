//! Audio I/O: playback/capture streams feeding the spectrum analyzer.
//!
//! One cpal stream (output for the demo composition and WAV playback,
//! input for the microphone) pushes stereo samples into a shared buffer;
//! an analysis thread drains it with 50% overlap and publishes
//! frequency snapshots for the frame loop to pick up.

pub mod sources;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glicol::Engine;
use log::{error, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::analysis::{FrequencySnapshot, SpectrumAnalyzer};
use crate::params::AnalyzerConfig;
use sources::{SourceKind, DEMO_COMPOSITION};

/// Glicol block size (samples per generated block)
const BLOCK_SIZE: usize = 128;

/// Stereo sample buffer shared between the audio callback and the
/// analysis thread. Bounded so a stalled analyzer never grows it.
struct SampleBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    capacity: usize,
}

impl SampleBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            left: Vec::with_capacity(capacity),
            right: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, left: f32, right: f32) {
        self.left.push(left);
        self.right.push(right);
        if self.left.len() > self.capacity {
            let excess = self.left.len() - self.capacity;
            self.left.drain(0..excess);
            self.right.drain(0..excess);
        }
    }
}

/// Audio system managing the active source stream and spectrum analysis
pub struct AudioSystem {
    /// Latest analyzed snapshot (thread-safe)
    latest: Arc<Mutex<FrequencySnapshot>>,

    /// False once a file source has played out
    active: Arc<AtomicBool>,

    paused: Arc<AtomicBool>,

    /// Playback position for file sources (rewound on stop)
    cursor: Option<Arc<AtomicUsize>>,

    /// Audio stream (kept alive)
    _stream: cpal::Stream,

    /// Analysis thread handle
    _analysis_thread: thread::JoinHandle<()>,
}

impl AudioSystem {
    /// Create and start the audio system for the chosen source
    pub fn new(kind: SourceKind, config: AnalyzerConfig) -> Result<Self, String> {
        config
            .validate()
            .map_err(|e| format!("Invalid analyzer config: {}", e))?;

        let buffer = Arc::new(Mutex::new(SampleBuffer::new(config.fft_size * 4)));
        let latest = Arc::new(Mutex::new(FrequencySnapshot::empty()));
        let active = Arc::new(AtomicBool::new(true));
        let paused = Arc::new(AtomicBool::new(false));

        let host = cpal::default_host();
        let (stream, sample_rate, cursor) = match kind {
            SourceKind::Demo => {
                let (stream, rate) = build_demo_stream(&host, &buffer, &paused)?;
                (stream, rate, None)
            }
            SourceKind::File(path) => {
                let (stream, rate, cursor) =
                    build_file_stream(&host, &path, &buffer, &active, &paused)?;
                (stream, rate, Some(cursor))
            }
            SourceKind::Microphone => {
                let (stream, rate) = build_mic_stream(&host, &buffer, &paused)?;
                (stream, rate, None)
            }
        };

        stream
            .play()
            .map_err(|e| format!("Failed to start audio stream: {}", e))?;

        let mut analysis_config = config;
        analysis_config.sample_rate_hz = sample_rate as usize;
        let analysis_thread =
            spawn_analysis_thread(analysis_config, Arc::clone(&buffer), Arc::clone(&latest));

        Ok(Self {
            latest,
            active,
            paused,
            cursor,
            _stream: stream,
            _analysis_thread: analysis_thread,
        })
    }

    /// Latest frequency snapshot (empty until the first analysis pass)
    pub fn snapshot(&self) -> FrequencySnapshot {
        self.latest.lock().unwrap().clone()
    }

    /// Whether the source is currently producing audio
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed) && !self.paused.load(Ordering::Relaxed)
    }

    /// Toggle pause; returns true when now paused
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::Relaxed)
    }

    /// Stop playback: pause, and rewind file sources to the start
    pub fn stop(&self) {
        self.paused.store(true, Ordering::Relaxed);
        if let Some(cursor) = &self.cursor {
            cursor.store(0, Ordering::Relaxed);
            self.active.store(true, Ordering::Relaxed);
        }
    }
}

/// Output stream playing the built-in glicol composition
fn build_demo_stream(
    host: &cpal::Host,
    buffer: &Arc<Mutex<SampleBuffer>>,
    paused: &Arc<AtomicBool>,
) -> Result<(cpal::Stream, u32), String> {
    let device = host
        .default_output_device()
        .ok_or("No audio output device found")?;
    let config = device
        .default_output_config()
        .map_err(|e| format!("Failed to get audio config: {}", e))?;
    let sample_rate = config.sample_rate().0;

    info!(
        "Audio out: {} @ {}Hz (demo composition)",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate
    );

    let mut engine = Engine::<BLOCK_SIZE>::new();
    engine.set_sr(sample_rate as usize);
    engine.update_with_code(DEMO_COMPOSITION);
    engine
        .update()
        .map_err(|e| format!("Demo composition failed to compile: {:?}", e))?;

    let engine = Arc::new(Mutex::new(engine));
    let buffer = Arc::clone(buffer);
    let paused = Arc::clone(paused);

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if paused.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }
                let mut engine = engine.lock().unwrap();
                let mut buffer = buffer.lock().unwrap();

                let frames_needed = data.len() / 2;
                let mut frame_idx = 0;

                // Generate blocks until the whole device buffer is filled
                while frame_idx < frames_needed {
                    let (blocks, _) = engine.next_block(vec![]);
                    let frames_to_copy = (frames_needed - frame_idx).min(BLOCK_SIZE);

                    for i in 0..frames_to_copy {
                        // Safety limiter: hard clip to ±0.5
                        let left = blocks[0][i].clamp(-0.5, 0.5);
                        let right = blocks[1][i].clamp(-0.5, 0.5);

                        let out = (frame_idx + i) * 2;
                        data[out] = left;
                        data[out + 1] = right;
                        buffer.push(left, right);
                    }
                    frame_idx += frames_to_copy;
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| format!("Failed to build audio stream: {}", e))?;

    Ok((stream, sample_rate))
}

/// Output stream playing a decoded WAV file
fn build_file_stream(
    host: &cpal::Host,
    path: &Path,
    buffer: &Arc<Mutex<SampleBuffer>>,
    active: &Arc<AtomicBool>,
    paused: &Arc<AtomicBool>,
) -> Result<(cpal::Stream, u32, Arc<AtomicUsize>), String> {
    let track = sources::load_wav(path)?;

    let device = host
        .default_output_device()
        .ok_or("No audio output device found")?;
    let config = device
        .default_output_config()
        .map_err(|e| format!("Failed to get audio config: {}", e))?;
    let device_rate = config.sample_rate().0;

    if track.sample_rate != device_rate {
        warn!(
            "{}: {}Hz track on a {}Hz device, playback will pitch-shift",
            path.display(),
            track.sample_rate,
            device_rate
        );
    }
    info!(
        "Playing {} ({:.1}s @ {}Hz)",
        path.display(),
        track.frames.len() as f32 / track.sample_rate as f32,
        track.sample_rate
    );

    let frames = Arc::new(track.frames);
    let cursor = Arc::new(AtomicUsize::new(0));

    let frames_cb = Arc::clone(&frames);
    let cursor_cb = Arc::clone(&cursor);
    let buffer = Arc::clone(buffer);
    let active = Arc::clone(active);
    let paused = Arc::clone(paused);

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if paused.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }
                let mut buffer = buffer.lock().unwrap();

                let frames_needed = data.len() / 2;
                for i in 0..frames_needed {
                    let idx = cursor_cb.fetch_add(1, Ordering::Relaxed);
                    let (left, right) = frames_cb
                        .get(idx)
                        .map(|f| (f[0], f[1]))
                        .unwrap_or((0.0, 0.0));

                    data[i * 2] = left;
                    data[i * 2 + 1] = right;
                    buffer.push(left, right);
                }

                if cursor_cb.load(Ordering::Relaxed) >= frames_cb.len() {
                    active.store(false, Ordering::Relaxed);
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| format!("Failed to build audio stream: {}", e))?;

    Ok((stream, device_rate, cursor))
}

/// Input stream capturing the default microphone
fn build_mic_stream(
    host: &cpal::Host,
    buffer: &Arc<Mutex<SampleBuffer>>,
    paused: &Arc<AtomicBool>,
) -> Result<(cpal::Stream, u32), String> {
    let device = host
        .default_input_device()
        .ok_or("No audio input device found")?;
    let config = device
        .default_input_config()
        .map_err(|e| format!("Failed to get input config: {}", e))?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    info!(
        "Capturing: {} @ {}Hz ({} ch)",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate,
        channels
    );

    let buffer = Arc::clone(buffer);
    let paused = Arc::clone(paused);

    let stream = device
        .build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if paused.load(Ordering::Relaxed) {
                    return;
                }
                let mut buffer = buffer.lock().unwrap();
                for frame in data.chunks(channels.max(1)) {
                    let left = frame[0];
                    let right = frame.get(1).copied().unwrap_or(left);
                    buffer.push(left, right);
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| format!("Failed to build input stream: {}", e))?;

    Ok((stream, sample_rate))
}

/// Spawn the spectrum analysis thread
fn spawn_analysis_thread(
    config: AnalyzerConfig,
    buffer: Arc<Mutex<SampleBuffer>>,
    latest: Arc<Mutex<FrequencySnapshot>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut analyzer = SpectrumAnalyzer::new(&config);

        loop {
            thread::sleep(Duration::from_millis(config.update_interval_ms));

            let mut buffer = buffer.lock().unwrap();
            if buffer.left.len() < config.fft_size {
                continue;
            }

            let snapshot = analyzer.analyze(
                &buffer.left[..config.fft_size],
                &buffer.right[..config.fft_size],
            );

            // 50% overlap between successive windows
            buffer.left.drain(0..config.fft_size / 2);
            buffer.right.drain(0..config.fft_size / 2);
            drop(buffer);

            *latest.lock().unwrap() = snapshot;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_buffer_bounded() {
        let mut buffer = SampleBuffer::new(8);

        for i in 0..20 {
            buffer.push(i as f32, -(i as f32));
        }

        assert_eq!(buffer.left.len(), 8);
        assert_eq!(buffer.right.len(), 8);
        // Oldest samples were dropped
        assert_eq!(buffer.left[0], 12.0);
        assert_eq!(buffer.right[0], -12.0);
    }

    #[test]
    fn test_sample_buffer_keeps_channels_in_step() {
        let mut buffer = SampleBuffer::new(4);

        for i in 0..11 {
            buffer.push(i as f32, i as f32 + 100.0);
        }

        assert_eq!(buffer.left.len(), buffer.right.len());
        for (l, r) in buffer.left.iter().zip(buffer.right.iter()) {
            assert_eq!(r - l, 100.0);
        }
    }
}
