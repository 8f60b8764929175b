use std::{cell::RefCell, rc::Rc};

use bartake_core::{
    AppConfig, BarTakeError, ClockedTimeline, Collaborators, Decoder, FrameQueue, MediaKind,
    MemoryRecorder, Result, Session, SessionState, SyntheticCamera,
};

pub struct SimulatedHost {
    camera: Rc<RefCell<SyntheticCamera>>,
    recorder: Rc<RefCell<MemoryRecorder>>,
    audio: Rc<RefCell<ClockedTimeline>>,
    video: Rc<RefCell<ClockedTimeline>>,
    queue: Rc<RefCell<FrameQueue>>,
    frame_seconds: f64,
    frames_run: u64,
}

impl SimulatedHost {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            camera: Rc::new(RefCell::new(SyntheticCamera::default())),
            recorder: Rc::new(RefCell::new(MemoryRecorder::new(config.recording.clone()))),
            audio: Rc::new(RefCell::new(ClockedTimeline::new())),
            video: Rc::new(RefCell::new(ClockedTimeline::new())),
            queue: Rc::new(RefCell::new(FrameQueue::new())),
            frame_seconds: 1.0 / config.recording.fps.max(1) as f64,
            frames_run: 0,
        }
    }

    pub fn frame_seconds(&self) -> f64 {
        self.frame_seconds
    }

    pub fn collaborators(&self, decoder: impl Decoder + 'static) -> Collaborators {
        let mut shown = None;
        Collaborators {
            decoder: Box::new(decoder),
            capture: Box::new(self.camera.clone()),
            recorder: Box::new(self.recorder.clone()),
            audio: Box::new(self.audio.clone()),
            video: Box::new(self.video.clone()),
            scheduler: Box::new(self.queue.clone()),
            highlight: Box::new(move |index: usize| {
                if shown.replace(index) != Some(index) {
                    tracing::info!(segment = index, "bar highlighted");
                }
            }),
        }
    }

    /// Runs one display refresh: media clocks advance, the camera emits a
    /// frame while recording, ends are reported, then due ticks run.
    pub fn frame(&mut self, session: &mut Session) {
        self.frames_run += 1;
        self.audio.borrow_mut().advance(self.frame_seconds);
        self.video.borrow_mut().advance(self.frame_seconds);

        if session.state() == SessionState::Recording {
            let chunk = format!("frame-{}", self.frames_run).into_bytes();
            self.recorder.borrow_mut().push_chunk(chunk);
        }

        let audio_ended = self.audio.borrow_mut().take_ended();
        if audio_ended {
            session.on_media_ended(MediaKind::Master);
        }
        let video_ended = self.video.borrow_mut().take_ended();
        if video_ended {
            session.on_media_ended(MediaKind::Slave);
        }

        let due = self.queue.borrow_mut().take_due();
        for token in due {
            if let Some(report) = session.tick(token) {
                tracing::trace!(position = report.position, "synced");
            }
        }
    }

    /// Runs frames until `seconds` of host time have passed or the session
    /// leaves `state`.
    pub fn run_while(
        &mut self,
        session: &mut Session,
        state: SessionState,
        seconds: f64,
    ) -> Result<()> {
        if !seconds.is_finite() {
            return Err(BarTakeError::InvalidArgument(
                "simulated run must cover a finite span",
            ));
        }
        let frames = (seconds.max(0.0) / self.frame_seconds).ceil() as u64;
        for _ in 0..frames {
            if session.state() != state {
                break;
            }
            self.frame(session);
        }
        Ok(())
    }

    pub fn camera_streams_live(&self) -> usize {
        self.camera.borrow().live_streams()
    }
}
