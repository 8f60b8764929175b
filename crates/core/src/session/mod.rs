use serde::{Deserialize, Serialize};

use crate::{
    segment, summarize, AppConfig, AudioOutput, BarTakeError, CaptureConstraints,
    CaptureProvider, Decoder, DeviceStream, FrameScheduler, FrameToken, HighlightSink, MediaKind,
    MediaTimeline, RecordedArtifact, Recorder, RecordingHandle, Result, Segment, SessionConfig,
    SyncLoop, TickReport, Track, VideoSurface, WaveformColumn,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No track loaded.
    Idle,
    /// Track loaded, nothing running.
    Ready,
    /// Camera live and recording, song playing, loop active.
    Recording,
    /// A finished take exists, nothing running.
    RecordedReady,
    /// Take and song replaying together, loop active.
    Playback,
}

impl SessionState {
    /// States in which the sync loop is allowed to tick.
    pub fn allows_sync(self) -> bool {
        matches!(self, Self::Recording | Self::Playback)
    }
}

/// Outcome of a request to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The request was acted upon.
    Applied,
    /// The request is not valid in the current state; nothing happened.
    Ignored,
}

/// Host services the session drives.
pub struct Collaborators {
    pub decoder: Box<dyn Decoder>,
    pub capture: Box<dyn CaptureProvider>,
    pub recorder: Box<dyn Recorder>,
    pub audio: Box<dyn AudioOutput>,
    pub video: Box<dyn VideoSurface>,
    pub scheduler: Box<dyn FrameScheduler>,
    pub highlight: Box<dyn HighlightSink>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Owns every collaborator and is the only place that drives them. Requests
/// that are invalid in the current state report [`Transition::Ignored`].
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    constraints: CaptureConstraints,
    deps: Collaborators,
    state: SessionState,
    track: Option<Track>,
    waveform: Vec<WaveformColumn>,
    sync: SyncLoop,
    stream: Option<DeviceStream>,
    recording: Option<RecordingHandle>,
    artifact: Option<RecordedArtifact>,
}

impl Session {
    pub fn new(config: &AppConfig, deps: Collaborators) -> Self {
        Self {
            config: config.session.clone(),
            constraints: config.capture,
            deps,
            state: SessionState::Idle,
            track: None,
            waveform: Vec::new(),
            sync: SyncLoop::default(),
            stream: None,
            recording: None,
            artifact: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn segments(&self) -> &[Segment] {
        self.sync.segments()
    }

    pub fn waveform(&self) -> &[WaveformColumn] {
        &self.waveform
    }

    pub fn artifact(&self) -> Option<&RecordedArtifact> {
        self.artifact.as_ref()
    }

    pub fn highlighted_segment(&self) -> Option<usize> {
        self.sync.highlighted()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_playing()
    }

    /// Decodes `bytes` and makes the result the current track. A decode
    /// failure leaves the session exactly as it was.
    pub fn load_track(&mut self, bytes: &[u8]) -> Result<&Track> {
        let track = self.deps.decoder.decode(bytes).map_err(|err| {
            tracing::warn!(%err, "track failed to decode");
            err
        })?;
        self.install_track(track)
    }

    /// Makes an already decoded track current, from any state.
    pub fn install_track(&mut self, track: Track) -> Result<&Track> {
        let segments = segment(track.duration_seconds(), self.config.segment_count)?;
        let waveform = summarize(track.samples(), self.config.waveform_width);

        self.release_all();
        self.deps.audio.load(&track);
        self.sync.set_segments(segments);
        self.waveform = waveform;

        tracing::info!(
            duration = track.duration_seconds(),
            sample_rate = track.sample_rate(),
            segments = self.config.segment_count,
            "track loaded"
        );
        self.transition(SessionState::Ready);
        Ok(self.track.insert(track))
    }

    pub fn start_recording(&mut self) -> Result<Transition> {
        if self.state != SessionState::Ready {
            return Ok(self.ignore("start recording"));
        }

        let stream = self.deps.capture.acquire(&self.constraints).map_err(|err| {
            tracing::warn!(%err, "camera acquisition failed");
            err
        })?;
        let handle = match self.deps.recorder.start(&stream) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(%err, "recorder refused to start");
                self.deps.capture.release(stream);
                return Err(err);
            }
        };

        self.deps.video.attach_stream(&stream);
        self.deps.video.play();
        self.deps.audio.seek(0.0);
        self.deps.audio.play();
        self.sync.start(&mut *self.deps.scheduler);
        self.stream = Some(stream);
        self.recording = Some(handle);

        Ok(self.transition(SessionState::Recording))
    }

    /// Finalises the take. If the recorder fails the session stays in
    /// [`SessionState::Recording`] so the stop can be retried.
    pub fn stop_recording(&mut self) -> Result<Transition> {
        if self.state != SessionState::Recording {
            return Ok(self.ignore("stop recording"));
        }

        let handle = self
            .recording
            .as_ref()
            .ok_or_else(|| BarTakeError::msg("recording state without a recording"))?;
        let artifact = self.deps.recorder.stop(handle).map_err(|err| {
            tracing::warn!(%err, "recording failed to finalise");
            err
        })?;
        self.recording = None;

        if let Some(stream) = self.stream.take() {
            self.deps.capture.release(stream);
        }
        self.sync.cancel();
        self.deps.audio.pause();
        self.deps.audio.seek(0.0);
        self.deps.video.pause();
        self.deps.video.attach_artifact(&artifact);

        tracing::info!(
            duration = artifact.duration_seconds(),
            bytes = artifact.size_bytes(),
            "take recorded"
        );
        self.artifact = Some(artifact);

        Ok(self.transition(SessionState::RecordedReady))
    }

    pub fn start_playback(&mut self) -> Result<Transition> {
        if self.state != SessionState::RecordedReady {
            return Ok(self.ignore("start playback"));
        }

        let artifact = self
            .artifact
            .as_ref()
            .ok_or_else(|| BarTakeError::msg("recorded state without a take"))?;
        self.deps.video.attach_artifact(artifact);
        self.deps.audio.seek(0.0);
        self.deps.video.seek(0.0);
        self.deps.audio.play();
        self.deps.video.play();
        self.sync.start(&mut *self.deps.scheduler);

        Ok(self.transition(SessionState::Playback))
    }

    /// Stops playback and rewinds both timelines.
    pub fn stop_playback(&mut self) -> Result<Transition> {
        if self.state != SessionState::Playback {
            return Ok(self.ignore("stop playback"));
        }

        self.halt_media();
        self.deps.audio.seek(0.0);
        self.deps.video.seek(0.0);

        Ok(self.transition(SessionState::RecordedReady))
    }

    /// Single stop control: ends whichever of recording or playback is running.
    pub fn stop(&mut self) -> Result<Transition> {
        match self.state {
            SessionState::Recording => self.stop_recording(),
            SessionState::Playback => self.stop_playback(),
            _ => Ok(self.ignore("stop")),
        }
    }

    /// Throws the finished take away so a new one can be recorded.
    pub fn discard_take(&mut self) -> Result<Transition> {
        if self.state != SessionState::RecordedReady {
            return Ok(self.ignore("discard take"));
        }

        self.artifact = None;
        self.deps.video.detach();
        self.deps.audio.seek(0.0);

        Ok(self.transition(SessionState::Ready))
    }

    /// Natural end of either timeline. Whichever side ended, both stop and the
    /// loop is cancelled. A take stays open until it is stopped explicitly.
    pub fn on_media_ended(&mut self, kind: MediaKind) -> Transition {
        match self.state {
            SessionState::Playback => {
                tracing::info!(?kind, "media ended during playback");
                self.halt_media();
                self.transition(SessionState::RecordedReady)
            }
            SessionState::Recording => {
                tracing::info!(?kind, "media ended during recording");
                self.halt_media();
                Transition::Applied
            }
            _ => self.ignore("media ended"),
        }
    }

    /// Runs one scheduled frame of the sync loop. Frames from a cancelled
    /// generation, or arriving in a state without a running loop, do nothing.
    pub fn tick(&mut self, token: FrameToken) -> Option<TickReport> {
        if !self.state.allows_sync() {
            return None;
        }

        let Collaborators {
            audio,
            video,
            scheduler,
            highlight,
            ..
        } = &mut self.deps;
        self.sync.tick(
            token,
            &**audio,
            &mut **video,
            &mut **highlight,
            &mut **scheduler,
        )
    }

    fn halt_media(&mut self) {
        self.sync.cancel();
        self.deps.audio.pause();
        self.deps.video.pause();
    }

    fn release_all(&mut self) {
        self.sync.cancel();
        if let Some(handle) = self.recording.take() {
            self.deps.recorder.discard(handle);
        }
        if let Some(stream) = self.stream.take() {
            self.deps.capture.release(stream);
        }
        self.deps.audio.pause();
        self.deps.video.pause();
        self.deps.video.detach();
        self.artifact = None;
    }

    fn transition(&mut self, next: SessionState) -> Transition {
        let previous = std::mem::replace(&mut self.state, next);
        tracing::info!(from = ?previous, to = ?next, "session transition");
        Transition::Applied
    }

    fn ignore(&self, request: &'static str) -> Transition {
        tracing::debug!(request, state = ?self.state, "request ignored");
        Transition::Ignored
    }
}
