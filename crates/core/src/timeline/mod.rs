use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{DeviceStream, RecordedArtifact, Track};

/// Identifies which of the two synchronised timelines raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// The audio track; authoritative for synchronisation.
    Master,
    /// The camera preview or recorded take that follows the master.
    Slave,
}

/// Anything with a seekable, pausable playback position in seconds.
pub trait MediaTimeline {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn position(&self) -> f64;
    fn is_playing(&self) -> bool;
}

/// The audio engine that plays the loaded song.
pub trait AudioOutput: MediaTimeline {
    /// Replaces the playing material. Playback is paused and rewound.
    fn load(&mut self, track: &Track);
}

/// The video element showing either the live capture or a finished take.
pub trait VideoSurface: MediaTimeline {
    fn attach_stream(&mut self, stream: &DeviceStream);
    fn attach_artifact(&mut self, artifact: &RecordedArtifact);
    fn detach(&mut self);
}

/// Seekable clock that only moves when told to.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn seek(&mut self, seconds: f64) {
        self.time_seconds = seconds.max(0.0);
    }

    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }
}

/// What a [`ClockedTimeline`] is currently presenting.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    Empty,
    Track,
    /// A live device stream has no end.
    Stream(u64),
    Artifact(u64),
}

/// A [`MediaTimeline`] whose position is driven by explicit
/// [`advance`](Self::advance) calls from the host's frame loop.
#[derive(Debug, Clone)]
pub struct ClockedTimeline {
    clock: PlaybackClock,
    duration: Option<f64>,
    source: MediaSource,
    playing: bool,
    ended: bool,
}

impl Default for ClockedTimeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockedTimeline {
    pub fn new() -> Self {
        Self {
            clock: PlaybackClock::default(),
            duration: None,
            source: MediaSource::Empty,
            playing: false,
            ended: false,
        }
    }

    /// Creates a timeline presenting finite media of the given length.
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: Some(duration.max(0.0)),
            source: MediaSource::Track,
            ..Self::new()
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    /// Moves the clock forward by `delta` seconds if playing. Reaching the
    /// duration stops playback and latches the ended flag.
    pub fn advance(&mut self, delta: f64) {
        if !self.playing {
            return;
        }
        self.clock.advance(delta);
        if let Some(duration) = self.duration {
            if self.clock.time_seconds >= duration {
                self.clock.seek(duration);
                self.playing = false;
                self.ended = true;
            }
        }
    }

    /// Returns `true` once playback ran into the end of the media. Cleared by
    /// any seek, play or source change.
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Consumes the ended flag, so a host reports each end exactly once.
    pub fn take_ended(&mut self) -> bool {
        std::mem::take(&mut self.ended)
    }

    fn replace_source(&mut self, source: MediaSource, duration: Option<f64>) {
        self.source = source;
        self.duration = duration.map(|d| d.max(0.0));
        self.playing = false;
        self.ended = false;
        self.clock.reset();
    }
}

impl MediaTimeline for ClockedTimeline {
    fn play(&mut self) {
        if self.source == MediaSource::Empty {
            return;
        }
        self.ended = false;
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        let target = match self.duration {
            Some(duration) => seconds.min(duration),
            None => seconds,
        };
        self.clock.seek(target);
        self.ended = false;
    }

    fn position(&self) -> f64 {
        self.clock.time_seconds
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

impl AudioOutput for ClockedTimeline {
    fn load(&mut self, track: &Track) {
        self.replace_source(MediaSource::Track, Some(track.duration_seconds()));
    }
}

impl VideoSurface for ClockedTimeline {
    fn attach_stream(&mut self, stream: &DeviceStream) {
        self.replace_source(MediaSource::Stream(stream.id()), None);
    }

    fn attach_artifact(&mut self, artifact: &RecordedArtifact) {
        self.replace_source(
            MediaSource::Artifact(artifact.id()),
            Some(artifact.duration_seconds()),
        );
    }

    fn detach(&mut self) {
        self.replace_source(MediaSource::Empty, None);
    }
}

impl<T: MediaTimeline> MediaTimeline for Rc<RefCell<T>> {
    fn play(&mut self) {
        self.borrow_mut().play();
    }

    fn pause(&mut self) {
        self.borrow_mut().pause();
    }

    fn seek(&mut self, seconds: f64) {
        self.borrow_mut().seek(seconds);
    }

    fn position(&self) -> f64 {
        self.borrow().position()
    }

    fn is_playing(&self) -> bool {
        self.borrow().is_playing()
    }
}

impl<T: AudioOutput> AudioOutput for Rc<RefCell<T>> {
    fn load(&mut self, track: &Track) {
        self.borrow_mut().load(track);
    }
}

impl<T: VideoSurface> VideoSurface for Rc<RefCell<T>> {
    fn attach_stream(&mut self, stream: &DeviceStream) {
        self.borrow_mut().attach_stream(stream);
    }

    fn attach_artifact(&mut self, artifact: &RecordedArtifact) {
        self.borrow_mut().attach_artifact(artifact);
    }

    fn detach(&mut self) {
        self.borrow_mut().detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_never_goes_negative() {
        let mut clock = PlaybackClock::default();
        clock.advance(1.5);
        clock.advance(-4.0);
        assert_eq!(clock.time_seconds, 0.0);
        clock.seek(3.0);
        clock.reset();
        assert_eq!(clock.time_seconds, 0.0);
    }

    #[test]
    fn advances_only_while_playing() {
        let mut timeline = ClockedTimeline::with_duration(10.0);
        timeline.advance(1.0);
        assert_eq!(timeline.position(), 0.0);

        timeline.play();
        timeline.advance(1.0);
        timeline.advance(0.5);
        assert_eq!(timeline.position(), 1.5);
    }

    #[test]
    fn reaching_the_end_stops_and_latches() {
        let mut timeline = ClockedTimeline::with_duration(2.0);
        timeline.play();
        timeline.advance(5.0);

        assert_eq!(timeline.position(), 2.0);
        assert!(!timeline.is_playing());
        assert!(timeline.take_ended());
        assert!(!timeline.has_ended());

        timeline.seek(0.0);
        timeline.play();
        assert!(timeline.is_playing());
    }

    #[test]
    fn live_stream_never_ends() {
        let stream = DeviceStream::new(7, "test camera", Default::default());
        let mut timeline = ClockedTimeline::new();
        timeline.attach_stream(&stream);
        timeline.play();
        timeline.advance(10_000.0);

        assert_eq!(timeline.source(), &MediaSource::Stream(7));
        assert!(timeline.is_playing());
        assert!(!timeline.has_ended());
    }

    #[test]
    fn empty_timeline_refuses_to_play() {
        let mut timeline = ClockedTimeline::new();
        timeline.play();
        assert!(!timeline.is_playing());
    }

    #[test]
    fn loading_a_track_rewinds() {
        let mut timeline = ClockedTimeline::new();
        let track = Track::from_samples(vec![0.0; 300], 100).unwrap();
        timeline.load(&track);
        timeline.play();
        timeline.advance(1.0);
        timeline.load(&track);

        assert_eq!(timeline.position(), 0.0);
        assert!(!timeline.is_playing());
        assert_eq!(timeline.duration(), Some(3.0));
    }

    #[test]
    fn shared_handle_forwards_to_inner_timeline() {
        let shared = Rc::new(RefCell::new(ClockedTimeline::with_duration(4.0)));
        let mut handle = shared.clone();
        handle.play();
        shared.borrow_mut().advance(1.0);
        assert_eq!(handle.position(), 1.0);
        handle.seek(3.0);
        assert_eq!(shared.borrow().position(), 3.0);
    }
}
