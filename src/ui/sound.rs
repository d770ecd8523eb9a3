/// Sound engine: procedural chiptune cues via rodio.
///
/// All cues are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::event::Command;

/// Something worth a sound.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Coin,
    Jump,
    LevelUp,
    Finished,
}

impl Cue {
    /// The cue a stage command deserves, if any.
    pub fn for_command(command: &Command) -> Option<Cue> {
        match command {
            Command::DeactivateCoin(_) => Some(Cue::Coin),
            Command::ShakeCamera { .. } => Some(Cue::LevelUp),
            Command::AnnounceFinished => Some(Cue::Finished),
            _ => None,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Cue;

    pub(super) const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_coin: Arc<Vec<u8>>,
        sfx_jump: Arc<Vec<u8>>,
        sfx_level_up: Arc<Vec<u8>>,
        sfx_finished: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("audio output unavailable: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_coin: Arc::new(make_wav(&gen_coin())),
                sfx_jump: Arc::new(make_wav(&gen_jump())),
                sfx_level_up: Arc::new(make_wav(&gen_level_up())),
                sfx_finished: Arc::new(make_wav(&gen_finished())),
            })
        }

        pub fn play(&self, cue: Cue) {
            let buf = match cue {
                Cue::Coin => &self.sfx_coin,
                Cue::Jump => &self.sfx_jump,
                Cue::LevelUp => &self.sfx_level_up,
                Cue::Finished => &self.sfx_finished,
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// A run of notes, each `(freq, seconds)`, with the given harmonic
    /// weights (`[fundamental, 2nd, 3rd, ...]`) and a per-note decay.
    fn gen_notes(notes: &[(f32, f32)], harmonics: &[f32], decay: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in notes {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * decay;
                let wave: f32 = harmonics
                    .iter()
                    .enumerate()
                    .map(|(h, w)| (t * freq * (h + 1) as f32 * TAU).sin() * w)
                    .sum();
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Coin: bright two-note ping B5→E6
    pub(super) fn gen_coin() -> Vec<f32> {
        gen_notes(&[(988.0, 0.05), (1319.0, 0.12)], &[0.7, 0.0, 0.3], 1.0, 0.25)
    }

    /// Jump: short rising square-ish chirp
    fn gen_jump() -> Vec<f32> {
        let duration = 0.09;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 300.0 + t * 500.0;
                phase += freq / SAMPLE_RATE as f32;
                let wave = if (phase * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                wave * (1.0 - t) * 0.12
            })
            .collect()
    }

    /// Level up: ascending C5→E5→G5→C6 arpeggio
    fn gen_level_up() -> Vec<f32> {
        let notes = [(523.0, 0.08), (659.0, 0.08), (784.0, 0.08), (1047.0, 0.2)];
        gen_notes(&notes, &[0.6, 0.3, 0.1], 0.4, 0.3)
    }

    /// Finished: slower fanfare that lands on a held chord root
    fn gen_finished() -> Vec<f32> {
        let notes = [
            (523.0, 0.12),
            (523.0, 0.12),
            (784.0, 0.12),
            (1047.0, 0.18),
            (988.0, 0.12),
            (1047.0, 0.5),
        ];
        gen_notes(&notes, &[0.6, 0.3, 0.1], 0.3, 0.3)
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: Cue) {}
}
