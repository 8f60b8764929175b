//! Core library for bartake: record a camera take against a song and replay
//! the two in lockstep.
//!
//! The song is the master timeline. Decoding yields a [`Track`], which is
//! summarised into [`WaveformColumn`]s and divided into equal [`Segment`]s. A
//! frame-driven [`SyncLoop`] keeps the camera preview or recorded take snapped
//! to the song's position, and [`Session`] decides when capture, recording and
//! playback may run. Everything the host provides (decoding, camera, encoder,
//! media elements, frame callbacks, highlighting) sits behind a trait, with a
//! simulated implementation alongside for tests and the command line demo.

pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod record;
pub mod segment;
pub mod session;
pub mod sync;
pub mod timeline;
pub mod waveform;

pub use audio::{Decoder, SymphoniaDecoder, Track};
pub use capture::{
    CameraAvailability, CaptureConstraints, CaptureProvider, DeviceStream, SyntheticCamera,
};
pub use config::{AppConfig, AudioConfig, SessionConfig};
pub use error::{BarTakeError, Result};
pub use record::{
    MemoryRecorder, RecordedArtifact, Recorder, RecordingHandle, RecordingSettings,
};
pub use segment::{active_segment, segment, Segment};
pub use session::{Collaborators, Session, SessionState, Transition};
pub use sync::{FrameQueue, FrameScheduler, FrameToken, HighlightSink, SyncLoop, TickReport};
pub use timeline::{
    AudioOutput, ClockedTimeline, MediaKind, MediaSource, MediaTimeline, PlaybackClock,
    VideoSurface,
};
pub use waveform::{polyline, summarize, WaveformColumn};
