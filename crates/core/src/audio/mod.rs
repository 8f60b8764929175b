use std::io::{Cursor, ErrorKind};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::{BarTakeError, Result};

/// Decoded audio, reduced to its first channel. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    sample_rate: u32,
    channels: usize,
    samples: Vec<f32>,
    duration_seconds: f64,
}

impl Track {
    /// Builds a mono track from raw samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::with_channels(samples, sample_rate, 1)
    }

    /// Generates a metronome track: `clicks` evenly spaced 10 ms bursts
    /// over `duration_seconds` of silence.
    pub fn click_track(duration_seconds: f64, sample_rate: u32, clicks: usize) -> Result<Self> {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(BarTakeError::InvalidArgument(
                "click track length must be positive and finite",
            ));
        }
        if clicks == 0 {
            return Err(BarTakeError::InvalidArgument("click track needs at least one click"));
        }

        let len = (duration_seconds * f64::from(sample_rate)).round() as usize;
        let spacing = (len / clicks).max(1);
        let burst = (sample_rate as usize / 100).max(1);
        let samples = (0..len)
            .map(|i| {
                let offset = i % spacing;
                if offset >= burst {
                    return 0.0;
                }
                let level = 1.0 - offset as f32 / burst as f32;
                if offset % 2 == 0 {
                    level
                } else {
                    -level
                }
            })
            .collect();
        Self::from_samples(samples, sample_rate)
    }

    fn with_channels(samples: Vec<f32>, sample_rate: u32, channels: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(BarTakeError::InvalidArgument("sample rate must be positive"));
        }
        let duration_seconds = samples.len() as f64 / sample_rate as f64;
        Ok(Self {
            sample_rate,
            channels,
            samples,
            duration_seconds,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the source material. Only channel 0 is kept.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Amplitudes of channel 0, each in `[-1, 1]`.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }
}

/// Turns uploaded file bytes into a [`Track`].
pub trait Decoder {
    fn decode(&self, bytes: &[u8]) -> Result<Track>;
}

/// [`Decoder`] backed by symphonia's default format and codec registries.
#[derive(Debug, Default, Clone)]
pub struct SymphoniaDecoder {
    extension: Option<String>,
}

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Passes a file extension to the format probe as a hint.
    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: Some(extension.into()),
        }
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Track> {
        if bytes.is_empty() {
            return Err(BarTakeError::Decode("file is empty".to_string()));
        }

        let cursor = Cursor::new(bytes.to_vec());
        let source = MediaSourceStream::new(Box::new(cursor), Default::default());
        let mut hint = Hint::new();
        if let Some(extension) = &self.extension {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| BarTakeError::Decode("no audio track found".to_string()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| BarTakeError::Decode("unknown sample rate".to_string()))?;
        let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref err)) if err.kind() == ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels = spec.channels.count().max(1);
                    let mut interleaved =
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    interleaved.copy_interleaved_ref(decoded);
                    samples.extend(interleaved.samples().iter().step_by(channels).copied());
                }
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::warn!(reason, "skipping undecodable packet");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if samples.is_empty() {
            return Err(BarTakeError::Decode("no audio frames decoded".to_string()));
        }

        let track = Track::with_channels(samples, sample_rate, channels)?;
        tracing::debug!(
            sample_rate,
            channels,
            duration = track.duration_seconds(),
            "decoded track"
        );
        Ok(track)
    }
}
