use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{BarTakeError, DeviceStream, Result};

/// Configuration options for the recording subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub mime_type: String,
    pub fps: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            mime_type: "video/webm".to_string(),
            fps: 60,
        }
    }
}

/// Token for a recording in progress.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordingHandle {
    id: u64,
}

impl RecordingHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A finished take, ready to be replayed on a [`VideoSurface`](crate::VideoSurface).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedArtifact {
    id: u64,
    mime_type: String,
    chunks: Vec<Vec<u8>>,
    duration_seconds: f64,
}

impl RecordedArtifact {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn size_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }
}

/// Encoder that turns a capture stream into a [`RecordedArtifact`].
pub trait Recorder {
    fn start(&mut self, stream: &DeviceStream) -> Result<RecordingHandle>;

    /// Finalises the recording. On failure the recording stays active so the
    /// call can be retried with the same handle.
    fn stop(&mut self, handle: &RecordingHandle) -> Result<RecordedArtifact>;

    /// Drops a recording without producing an artifact.
    fn discard(&mut self, handle: RecordingHandle);
}

#[derive(Debug)]
struct ActiveRecording {
    id: u64,
    stream_id: u64,
    chunks: Vec<Vec<u8>>,
}

/// [`Recorder`] that buffers encoded chunks in memory. The take's duration is
/// derived from the chunk count, one chunk per frame.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    settings: RecordingSettings,
    next_id: u64,
    active: Option<ActiveRecording>,
    fail_next_stop: bool,
}

impl MemoryRecorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            next_id: 1,
            active: None,
            fail_next_stop: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Appends one encoded chunk to the active recording. Empty chunks and
    /// chunks arriving while idle are ignored.
    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        if let Some(active) = self.active.as_mut() {
            active.chunks.push(chunk);
        }
    }

    /// Makes the next [`Recorder::stop`] call fail once.
    pub fn fail_next_stop(&mut self) {
        self.fail_next_stop = true;
    }
}

impl Recorder for MemoryRecorder {
    fn start(&mut self, stream: &DeviceStream) -> Result<RecordingHandle> {
        if let Some(active) = &self.active {
            return Err(BarTakeError::Recording(format!(
                "recorder is busy with stream {}",
                active.stream_id
            )));
        }
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.active = Some(ActiveRecording {
            id,
            stream_id: stream.id(),
            chunks: Vec::new(),
        });
        Ok(RecordingHandle { id })
    }

    fn stop(&mut self, handle: &RecordingHandle) -> Result<RecordedArtifact> {
        if std::mem::take(&mut self.fail_next_stop) {
            return Err(BarTakeError::Recording(
                "encoder failed to flush".to_string(),
            ));
        }
        let active = match self.active.take() {
            Some(active) if active.id == handle.id => active,
            other => {
                self.active = other;
                return Err(BarTakeError::Recording(format!(
                    "recording {} is not active",
                    handle.id
                )));
            }
        };

        let fps = self.settings.fps.max(1) as f64;
        Ok(RecordedArtifact {
            id: active.id,
            mime_type: self.settings.mime_type.clone(),
            duration_seconds: active.chunks.len() as f64 / fps,
            chunks: active.chunks,
        })
    }

    fn discard(&mut self, handle: RecordingHandle) {
        if self.active.as_ref().map(|a| a.id) == Some(handle.id) {
            self.active = None;
        }
    }
}

impl<T: Recorder> Recorder for Rc<RefCell<T>> {
    fn start(&mut self, stream: &DeviceStream) -> Result<RecordingHandle> {
        self.borrow_mut().start(stream)
    }

    fn stop(&mut self, handle: &RecordingHandle) -> Result<RecordedArtifact> {
        self.borrow_mut().stop(handle)
    }

    fn discard(&mut self, handle: RecordingHandle) {
        self.borrow_mut().discard(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CaptureConstraints;

    fn stream() -> DeviceStream {
        DeviceStream::new(3, "test camera", CaptureConstraints::default())
    }

    #[test]
    fn collects_chunks_into_artifact() {
        let mut recorder = MemoryRecorder::new(RecordingSettings {
            mime_type: "video/webm".to_string(),
            fps: 4,
        });
        let handle = recorder.start(&stream()).unwrap();
        assert!(recorder.is_recording());

        for _ in 0..8 {
            recorder.push_chunk(vec![1, 2, 3]);
        }
        recorder.push_chunk(Vec::new());

        let artifact = recorder.stop(&handle).unwrap();
        assert_eq!(artifact.chunks().len(), 8);
        assert_eq!(artifact.size_bytes(), 24);
        assert_eq!(artifact.duration_seconds(), 2.0);
        assert_eq!(artifact.mime_type(), "video/webm");
        assert!(!recorder.is_recording());
    }

    #[test]
    fn refuses_to_start_twice() {
        let mut recorder = MemoryRecorder::default();
        let _handle = recorder.start(&stream()).unwrap();
        assert!(matches!(
            recorder.start(&stream()),
            Err(BarTakeError::Recording(_))
        ));
    }

    #[test]
    fn failed_stop_can_be_retried() {
        let mut recorder = MemoryRecorder::default();
        let handle = recorder.start(&stream()).unwrap();
        recorder.push_chunk(vec![9]);
        recorder.fail_next_stop();

        assert!(recorder.stop(&handle).is_err());
        assert!(recorder.is_recording());

        let artifact = recorder.stop(&handle).unwrap();
        assert_eq!(artifact.chunks(), &[vec![9]]);
    }

    #[test]
    fn discard_drops_the_take() {
        let mut recorder = MemoryRecorder::default();
        let handle = recorder.start(&stream()).unwrap();
        recorder.discard(handle);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn chunks_while_idle_are_ignored() {
        let mut recorder = MemoryRecorder::default();
        recorder.push_chunk(vec![1]);
        let handle = recorder.start(&stream()).unwrap();
        let artifact = recorder.stop(&handle).unwrap();
        assert!(artifact.chunks().is_empty());
    }
}
