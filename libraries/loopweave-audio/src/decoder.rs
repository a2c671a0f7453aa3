/// Clip decoder implementation using Symphonia
use crate::error::{AudioError, Result};
use loopweave_core::{AudioBuffer, AudioFormat};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Whole-file clip decoder
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV
///
/// Clips are short and decoded once at track-load time, so the decoder
/// reads the whole stream into memory as interleaved stereo f32.
#[derive(Debug, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Whether the file extension names a supported container
    pub fn supports_format(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "mp3" | "flac" | "ogg" | "oga" | "wav"
                )
            })
    }

    /// Decode the whole file at `path`
    pub fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        if !path.exists() {
            return Err(AudioError::FileNotFound(path.display().to_string()));
        }
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Symphonia(format!("Failed to probe file: {}", e)))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| AudioError::DecodeError("No audio tracks found".to_string()))?;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::Symphonia(format!("Error reading packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => append_stereo(decoded, &mut samples),
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping corrupt packet");
                }
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            }
        }

        if samples.is_empty() {
            return Err(AudioError::DecodeError(format!(
                "{} contains no audio",
                path.display()
            )));
        }

        tracing::debug!(
            path = %path.display(),
            frames = samples.len() / 2,
            sample_rate,
            "Decoded clip"
        );
        Ok(AudioBuffer::new(samples, AudioFormat::stereo(sample_rate)))
    }
}

/// Append a decoded packet as interleaved stereo f32
///
/// Signed integers use symmetric scaling (divide by 2^(N-1)).
fn append_stereo(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => downmix(&buf, out, |s| s.clamp(-1.0, 1.0)),
        AudioBufferRef::F64(buf) => downmix(&buf, out, |s| (s as f32).clamp(-1.0, 1.0)),
        AudioBufferRef::S32(buf) => downmix(&buf, out, |s| s as f32 / 2_147_483_648.0),
        AudioBufferRef::S24(buf) => downmix(&buf, out, |s| s.inner() as f32 / 8_388_608.0),
        AudioBufferRef::S16(buf) => downmix(&buf, out, |s| f32::from(s) / 32_768.0),
        AudioBufferRef::S8(buf) => downmix(&buf, out, |s| f32::from(s) / 128.0),
        AudioBufferRef::U32(buf) => {
            downmix(&buf, out, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0)
        }
        AudioBufferRef::U24(buf) => {
            downmix(&buf, out, |s| (s.inner() as f32 / 16_777_215.0) * 2.0 - 1.0)
        }
        AudioBufferRef::U16(buf) => {
            downmix(&buf, out, |s| (f32::from(s) / f32::from(u16::MAX)) * 2.0 - 1.0)
        }
        AudioBufferRef::U8(buf) => {
            downmix(&buf, out, |s| (f32::from(s) / f32::from(u8::MAX)) * 2.0 - 1.0)
        }
    }
}

/// Mix any channel layout down to stereo
///
/// Mono is duplicated. Beyond two channels the third and later channels are
/// folded in at -3 dB (ITU-R BS.775 style): odd extra channels go to both
/// sides as a centre, paired surrounds go to their own side.
fn downmix<T, F>(buf: &symphonia::core::audio::AudioBuffer<T>, out: &mut Vec<f32>, normalize: F)
where
    T: symphonia::core::sample::Sample + Copy,
    F: Fn(T) -> f32,
{
    const SIDE_MIX: f32 = 0.707;

    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    out.reserve(frames * 2);

    match channels {
        0 => out.resize(out.len() + frames * 2, 0.0),
        1 => {
            for &s in buf.chan(0) {
                let s = normalize(s);
                out.push(s);
                out.push(s);
            }
        }
        _ => {
            let left = buf.chan(0);
            let right = buf.chan(1);
            for i in 0..frames {
                let mut l = normalize(left[i]);
                let mut r = normalize(right[i]);
                match channels {
                    2 => {}
                    3 => {
                        let c = normalize(buf.chan(2)[i]) * SIDE_MIX;
                        l += c;
                        r += c;
                    }
                    4 => {
                        l += normalize(buf.chan(2)[i]) * SIDE_MIX;
                        r += normalize(buf.chan(3)[i]) * SIDE_MIX;
                    }
                    _ => {
                        // L, R, C, [LFE], SL, SR
                        let c = normalize(buf.chan(2)[i]) * SIDE_MIX;
                        let (sl, sr) = if channels == 5 {
                            (buf.chan(3)[i], buf.chan(4)[i])
                        } else {
                            (buf.chan(4)[i], buf.chan(5)[i])
                        };
                        l += c + normalize(sl) * SIDE_MIX;
                        r += c + normalize(sr) * SIDE_MIX;
                    }
                }
                out.push(l.clamp(-1.0, 1.0));
                out.push(r.clamp(-1.0, 1.0));
            }
        }
    }
}
