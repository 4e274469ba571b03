//! Sound interface (§6 external collaborator for C7's arm/disarm feedback).
//!
//! `play(path)` is asynchronous — the call returns immediately — and
//! failure is silent, per spec.md §6: a missing sound file or an unplayable
//! output device must never interrupt arm/disarm.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// `play(path) -> ()` (spec.md §6). Implementations must not block the
/// caller and must not propagate errors.
pub trait Sound: Send + Sync {
    fn play(&self, path: &str);
}

/// Plays a WAV file on a dedicated thread per call (cpal output streams
/// aren't `Send`, so each play gets its own, mirroring the teacher-adjacent
/// pattern in `0xPD33-sonori/src/sound_player.rs` of moving playback off the
/// caller's thread rather than holding a persistent stream).
#[derive(Default)]
pub struct WavSound;

impl Sound for WavSound {
    fn play(&self, path: &str) {
        let path = path.to_string();
        std::thread::spawn(move || {
            if let Err(err) = play_wav_blocking(&path) {
                crate::verbose!("sound playback failed for {path}: {err}");
            }
        });
    }
}

fn play_wav_blocking(path: &str) -> anyhow::Result<()> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max))
                .collect::<Result<_, _>>()?
        }
    };

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("no default output device"))?;
    let config = device.default_output_config()?;
    let out_channels = config.channels() as usize;
    let src_channels = spec.channels as usize;

    let samples = std::sync::Arc::new(samples);
    let mut pos = 0usize;
    let samples_for_cb = samples.clone();

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(out_channels) {
                let value = samples_for_cb.get(pos).copied().unwrap_or(0.0);
                for (ch, out) in frame.iter_mut().enumerate() {
                    *out = if ch < src_channels || src_channels == 1 {
                        value
                    } else {
                        0.0
                    };
                }
                pos += src_channels.max(1);
            }
        },
        |err| crate::verbose!("sound output stream error: {err}"),
        None,
    )?;
    stream.play()?;

    let duration = samples.len() as f32 / (spec.sample_rate as f32 * src_channels.max(1) as f32);
    std::thread::sleep(std::time::Duration::from_secs_f32(duration + 0.05));
    Ok(())
}

/// No-op sound, wired in when `sounds_enabled` is false or no assets are
/// installed.
#[derive(Default)]
pub struct NoopSound;

impl Sound for NoopSound {
    fn play(&self, _path: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sound_never_panics() {
        let sound = NoopSound;
        sound.play("sfx/on.wav");
    }
}
