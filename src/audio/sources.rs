//! Audio source material: demo composition and WAV decoding.

use std::path::{Path, PathBuf};

/// Which audio source drives the session
#[derive(Debug, Clone)]
pub enum SourceKind {
    /// Built-in procedural composition (default)
    Demo,

    /// Decode and play a WAV file
    File(PathBuf),

    /// Capture the default input device
    Microphone,
}

/// Glicol composition for the built-in demo source.
///
/// A slow acid-ish bass line with enough low-end punch to exercise beat
/// detection.
pub const DEMO_COMPOSITION: &str = r#"
~gate: speed 1.6 >> seq 48 _48 _~n 36
~n: choose 36 36 36 60 0 0 0
~amp: ~gate >> envperc 0.002 0.15
~pit: ~gate >> mul 130.81
~bass: saw ~pit >> mul ~amp >> lpf ~cut 4.0 >> mul 0.12
~cut: sin 0.13 >> mul 1100 >> add 1300
o: ~bass >> plate 0.08
"#;

/// Fully decoded stereo track
#[derive(Debug)]
pub struct LoadedTrack {
    /// Interleaved-as-pairs stereo frames in [-1, 1]
    pub frames: Vec<[f32; 2]>,
    pub sample_rate: u32,
}

/// Decode a WAV file into stereo float frames.
///
/// Mono input is duplicated to both channels; extra channels beyond the
/// first two are dropped.
pub fn load_wav(path: &Path) -> Result<LoadedTrack, String> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| format!("Failed to decode {}: {}", path.display(), e))?,
        hound::SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<_, _>>()
                .map_err(|e| format!("Failed to decode {}: {}", path.display(), e))?
        }
    };

    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(format!("{}: zero-channel WAV", path.display()));
    }

    let frames = match channels {
        1 => samples.iter().map(|&s| [s, s]).collect(),
        _ => samples
            .chunks(channels)
            .map(|frame| {
                let left = frame[0];
                let right = frame.get(1).copied().unwrap_or(left);
                [left, right]
            })
            .collect(),
    };

    Ok(LoadedTrack {
        frames,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..(100 * channels as usize) {
            writer.write_sample((i % 1000) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_stereo_wav() {
        let path = std::env::temp_dir().join("cosmos_test_stereo.wav");
        write_test_wav(&path, 2);

        let track = load_wav(&path).unwrap();
        assert_eq!(track.sample_rate, 44100);
        assert_eq!(track.frames.len(), 100);
        // 16-bit samples normalized to [-1, 1]
        assert!(track.frames.iter().all(|f| f[0].abs() <= 1.0));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_mono_wav_duplicates_channels() {
        let path = std::env::temp_dir().join("cosmos_test_mono.wav");
        write_test_wav(&path, 1);

        let track = load_wav(&path).unwrap();
        assert_eq!(track.frames.len(), 100);
        assert!(track.frames.iter().all(|f| f[0] == f[1]));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = load_wav(Path::new("/nonexistent/cosmos.wav")).unwrap_err();
        assert!(err.contains("Failed to open"));
    }
}
