use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{BarTakeError, Result};

/// Which media kinds are requested from the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConstraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: false,
        }
    }
}

/// A live, acquired capture stream. It must be handed back to
/// [`CaptureProvider::release`] to stop the device.
#[derive(Debug, PartialEq)]
pub struct DeviceStream {
    id: u64,
    label: String,
    constraints: CaptureConstraints,
}

impl DeviceStream {
    pub fn new(id: u64, label: impl Into<String>, constraints: CaptureConstraints) -> Self {
        Self {
            id,
            label: label.into(),
            constraints,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn constraints(&self) -> CaptureConstraints {
        self.constraints
    }
}

pub trait CaptureProvider {
    /// Requests a device matching `constraints`. Fails with
    /// [`BarTakeError::PermissionDenied`] or [`BarTakeError::DeviceUnavailable`].
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<DeviceStream>;

    /// Stops every track of the stream.
    fn release(&mut self, stream: DeviceStream);
}

/// How a [`SyntheticCamera`] answers the next acquisition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAvailability {
    Granted,
    Denied,
    Missing,
}

/// In-process camera that hands out numbered streams and tracks which are
/// still live.
#[derive(Debug)]
pub struct SyntheticCamera {
    availability: CameraAvailability,
    next_id: u64,
    acquisitions: usize,
    live: Vec<u64>,
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(CameraAvailability::Granted)
    }
}

impl SyntheticCamera {
    pub fn new(availability: CameraAvailability) -> Self {
        Self {
            availability,
            next_id: 1,
            acquisitions: 0,
            live: Vec::new(),
        }
    }

    pub fn set_availability(&mut self, availability: CameraAvailability) {
        self.availability = availability;
    }

    /// Number of successful acquisitions so far.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions
    }

    /// Number of streams acquired and not yet released.
    pub fn live_streams(&self) -> usize {
        self.live.len()
    }
}

impl CaptureProvider for SyntheticCamera {
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<DeviceStream> {
        if !constraints.video && !constraints.audio {
            return Err(BarTakeError::InvalidArgument(
                "capture needs at least one of video or audio",
            ));
        }
        match self.availability {
            CameraAvailability::Denied => Err(BarTakeError::PermissionDenied(
                "camera access was refused".to_string(),
            )),
            CameraAvailability::Missing => Err(BarTakeError::DeviceUnavailable(
                "no camera is connected".to_string(),
            )),
            CameraAvailability::Granted => {
                let id = self.next_id;
                self.next_id += 1;
                self.acquisitions += 1;
                self.live.push(id);
                Ok(DeviceStream::new(id, format!("synthetic camera #{id}"), *constraints))
            }
        }
    }

    fn release(&mut self, stream: DeviceStream) {
        match self.live.iter().position(|&id| id == stream.id()) {
            Some(slot) => {
                self.live.swap_remove(slot);
            }
            None => tracing::warn!(stream = stream.id(), "released a stream that was not live"),
        }
    }
}

impl<T: CaptureProvider> CaptureProvider for Rc<RefCell<T>> {
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<DeviceStream> {
        self.borrow_mut().acquire(constraints)
    }

    fn release(&mut self, stream: DeviceStream) {
        self.borrow_mut().release(stream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_and_releases_streams() {
        let mut camera = SyntheticCamera::default();
        let first = camera.acquire(&CaptureConstraints::default()).unwrap();
        let second = camera.acquire(&CaptureConstraints::default()).unwrap();

        assert_ne!(first.id(), second.id());
        assert!(first.constraints().video);
        assert_eq!(camera.live_streams(), 2);

        camera.release(first);
        camera.release(second);
        assert_eq!(camera.live_streams(), 0);
        assert_eq!(camera.acquisitions(), 2);
    }

    #[test]
    fn reports_denied_and_missing_devices() {
        let mut camera = SyntheticCamera::new(CameraAvailability::Denied);
        assert!(matches!(
            camera.acquire(&CaptureConstraints::default()),
            Err(BarTakeError::PermissionDenied(_))
        ));

        camera.set_availability(CameraAvailability::Missing);
        assert!(matches!(
            camera.acquire(&CaptureConstraints::default()),
            Err(BarTakeError::DeviceUnavailable(_))
        ));
        assert_eq!(camera.acquisitions(), 0);
    }

    #[test]
    fn rejects_empty_constraints() {
        let mut camera = SyntheticCamera::default();
        let constraints = CaptureConstraints {
            video: false,
            audio: false,
        };
        assert!(camera.acquire(&constraints).is_err());
    }
}
