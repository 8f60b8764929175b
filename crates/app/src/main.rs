mod host;

use std::path::{Path, PathBuf};

use bartake_core::{
    polyline, segment, summarize, AppConfig, BarTakeError, Decoder, Segment, Session,
    SessionState, SymphoniaDecoder, Track, WaveformColumn,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::host::SimulatedHost;

fn main() -> bartake_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            input,
            width,
            segments,
            config,
        } => run_inspect(&input, width, segments, config.as_deref()),
        Commands::Rehearse {
            input,
            length,
            take,
            fps,
            config,
        } => run_rehearse(input.as_deref(), length, take, fps, config.as_deref()),
    }
}

#[derive(Debug, Serialize)]
struct InspectReport {
    duration_seconds: f64,
    sample_rate: u32,
    channels: usize,
    segments: Vec<Segment>,
    waveform: Vec<WaveformColumn>,
    stroke: Vec<(f32, f32)>,
}

impl InspectReport {
    fn new(track: &Track, config: &AppConfig) -> bartake_core::Result<Self> {
        let waveform = summarize(track.samples(), config.session.waveform_width);
        Ok(Self {
            duration_seconds: track.duration_seconds(),
            sample_rate: track.sample_rate(),
            channels: track.channels(),
            segments: segment(track.duration_seconds(), config.session.segment_count)?,
            stroke: polyline(&waveform, config.session.waveform_height),
            waveform,
        })
    }
}

fn run_inspect(
    input: &Path,
    width: Option<usize>,
    segments: Option<usize>,
    config: Option<&Path>,
) -> bartake_core::Result<()> {
    let mut config = load_config(config)?;
    if let Some(width) = width {
        config.session.waveform_width = width;
    }
    if let Some(segments) = segments {
        config.session.segment_count = segments;
    }
    config.validate()?;

    tracing::info!(?input, "inspecting track");
    let bytes = std::fs::read(input)?;
    let track = decoder_for(input).decode(&bytes)?;

    let report = InspectReport::new(&track, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_rehearse(
    input: Option<&Path>,
    length: f64,
    take: Option<f64>,
    fps: Option<u32>,
    config: Option<&Path>,
) -> bartake_core::Result<()> {
    let mut config = load_config(config)?;
    if let Some(fps) = fps {
        config.recording.fps = fps;
    }
    config.validate()?;

    let mut host = SimulatedHost::new(&config);
    let mut session = match input {
        Some(input) => {
            let bytes = std::fs::read(input)?;
            let mut session = Session::new(&config, host.collaborators(decoder_for(input)));
            session.load_track(&bytes)?;
            session
        }
        None => {
            let track = Track::click_track(
                length,
                config.audio.sample_rate,
                config.session.segment_count,
            )?;
            let mut session = Session::new(&config, host.collaborators(SymphoniaDecoder::new()));
            session.install_track(track)?;
            session
        }
    };

    let duration = session
        .track()
        .map(Track::duration_seconds)
        .ok_or_else(|| BarTakeError::msg("no track after loading"))?;
    let take_seconds = take_seconds(take, duration)?;
    tracing::info!(duration, take_seconds, "starting rehearsal");

    session.start_recording()?;
    host.run_while(&mut session, SessionState::Recording, take_seconds)?;
    session.stop()?;
    if let Some(artifact) = session.artifact() {
        tracing::info!(
            duration = artifact.duration_seconds(),
            chunks = artifact.chunks().len(),
            mime_type = artifact.mime_type(),
            "take ready"
        );
    }

    session.start_playback()?;
    let limit = duration.max(take_seconds) + host.frame_seconds();
    host.run_while(&mut session, SessionState::Playback, limit)?;
    session.stop()?;

    tracing::info!(
        state = ?session.state(),
        live_streams = host.camera_streams_live(),
        "rehearsal finished"
    );
    Ok(())
}

/// Resolves the requested take length, defaulting to the song length.
fn take_seconds(take: Option<f64>, duration: f64) -> bartake_core::Result<f64> {
    match take {
        None => Ok(duration),
        Some(take) if take.is_finite() && take >= 0.0 => Ok(take),
        Some(_) => Err(BarTakeError::InvalidArgument(
            "take length must be a finite number of seconds",
        )),
    }
}

fn load_config(path: Option<&Path>) -> bartake_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn decoder_for(input: &Path) -> SymphoniaDecoder {
    match input.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => SymphoniaDecoder::with_extension(ext),
        None => SymphoniaDecoder::new(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Record a take against a song, bar by bar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a song and print its segments and waveform summary as JSON.
    Inspect {
        /// Path to the audio file.
        input: PathBuf,
        /// Number of waveform columns to produce.
        #[arg(short, long)]
        width: Option<usize>,
        /// Number of equal segments to divide the song into.
        #[arg(short, long)]
        segments: Option<usize>,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Record and replay a simulated take against a song.
    Rehearse {
        /// Path to the audio file; a click track is generated when omitted.
        input: Option<PathBuf>,
        /// Length in seconds of the generated click track.
        #[arg(short, long, default_value_t = 8.0)]
        length: f64,
        /// Length of the take in seconds; defaults to the song length.
        #[arg(short, long)]
        take: Option<f64>,
        /// Frame rate of the recorded take. The simulated host refreshes
        /// once per captured frame.
        #[arg(short, long)]
        fps: Option<u32>,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_defaults_to_song_length() {
        assert_eq!(take_seconds(None, 12.5).unwrap(), 12.5);
        assert_eq!(take_seconds(Some(3.0), 12.5).unwrap(), 3.0);
    }

    #[test]
    fn unbounded_take_is_rejected() {
        for take in [f64::INFINITY, f64::NAN, -1.0] {
            assert!(matches!(
                take_seconds(Some(take), 12.5),
                Err(BarTakeError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn rehearse_fps_describes_the_take_rate() {
        use clap::CommandFactory;

        let command = Cli::command();
        command.clone().debug_assert();
        let rehearse = command
            .find_subcommand("rehearse")
            .expect("rehearse subcommand");
        let fps = rehearse
            .get_arguments()
            .find(|arg| arg.get_id() == "fps")
            .expect("fps flag");
        let help = fps.get_help().map(ToString::to_string).unwrap_or_default();
        assert!(help.contains("recorded take"));
    }

    #[test]
    fn report_strokes_the_waveform_at_configured_height() {
        let mut config = AppConfig::default();
        config.session.waveform_width = 4;
        config.session.waveform_height = 10.0;
        let track = Track::from_samples(vec![-1.0, 1.0, 0.0, 0.0, 1.0, 1.0, -1.0, -1.0], 8)
            .unwrap();

        let report = InspectReport::new(&track, &config).unwrap();

        assert_eq!(report.waveform.len(), 4);
        assert_eq!(report.stroke.len(), 9);
        assert_eq!(report.stroke[0], (0.0, 5.0));
        assert_eq!(report.stroke[1], (0.0, 0.0));
        assert_eq!(report.stroke[2], (0.0, 10.0));
        assert_eq!(report.segments.len(), 8);
    }
}
