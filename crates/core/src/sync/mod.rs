use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::{active_segment, MediaTimeline, Segment};

/// Identifies the loop generation that scheduled a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken {
    generation: u64,
}

impl FrameToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The host's per-display-refresh callback primitive.
pub trait FrameScheduler {
    /// Arranges for `token` to be handed back to the loop on the next frame.
    fn schedule_next(&mut self, token: FrameToken);
}

/// Receives the active segment on every live tick that falls inside one.
/// Implementations must tolerate the same index arriving repeatedly.
pub trait HighlightSink {
    fn on_segment_changed(&mut self, index: usize);
}

impl<F: FnMut(usize)> HighlightSink for F {
    fn on_segment_changed(&mut self, index: usize) {
        self(index)
    }
}

/// [`FrameScheduler`] that queues tokens until the host drains them.
#[derive(Debug, Default)]
pub struct FrameQueue {
    pending: VecDeque<FrameToken>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every token due on this frame.
    pub fn take_due(&mut self) -> Vec<FrameToken> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl FrameScheduler for FrameQueue {
    fn schedule_next(&mut self, token: FrameToken) {
        self.pending.push_back(token);
    }
}

impl<T: FrameScheduler> FrameScheduler for Rc<RefCell<T>> {
    fn schedule_next(&mut self, token: FrameToken) {
        self.borrow_mut().schedule_next(token);
    }
}

/// What a live tick observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Master position the slave was snapped to.
    pub position: f64,
    /// Highlighted segment after the tick, if any has been highlighted yet.
    pub segment: Option<usize>,
    /// `true` when this tick changed the highlighted segment.
    pub segment_changed: bool,
}

/// Cancellable per-frame task. Every start or cancel bumps the generation,
/// so a frame queued before cancellation can never mutate anything.
#[derive(Debug, Default)]
pub struct SyncLoop {
    segments: Vec<Segment>,
    generation: u64,
    playing: bool,
    highlighted: Option<usize>,
}

impl SyncLoop {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            ..Self::default()
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Replaces the segment table. Cancels any running loop first.
    pub fn set_segments(&mut self, segments: Vec<Segment>) {
        self.cancel();
        self.segments = segments;
        self.highlighted = None;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Starts a new generation and schedules its first frame. Any earlier
    /// generation is invalidated.
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.generation += 1;
        self.playing = true;
        self.highlighted = None;
        tracing::debug!(generation = self.generation, "sync loop started");
        scheduler.schedule_next(self.token());
    }

    /// Stops rescheduling. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if self.playing {
            tracing::debug!(generation = self.generation, "sync loop cancelled");
        }
        self.playing = false;
        self.generation += 1;
    }

    fn token(&self) -> FrameToken {
        FrameToken {
            generation: self.generation,
        }
    }

    /// Returns `true` if a tick carrying `token` would run.
    pub fn accepts(&self, token: FrameToken) -> bool {
        self.playing && token.generation == self.generation
    }

    /// Runs one frame. Stale or cancelled tokens return `None` without touching
    /// the timelines, the sink or the scheduler.
    pub fn tick<M, S, H, F>(
        &mut self,
        token: FrameToken,
        master: &M,
        slave: &mut S,
        highlight: &mut H,
        scheduler: &mut F,
    ) -> Option<TickReport>
    where
        M: MediaTimeline + ?Sized,
        S: MediaTimeline + ?Sized,
        H: HighlightSink + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        if !self.accepts(token) {
            tracing::trace!(
                stale = token.generation,
                current = self.generation,
                "dropping stale frame"
            );
            return None;
        }

        let position = master.position();
        slave.seek(position);
        scheduler.schedule_next(self.token());

        let mut segment_changed = false;
        if let Some(index) = active_segment(&self.segments, position) {
            if self.highlighted != Some(index) {
                self.highlighted = Some(index);
                segment_changed = true;
                tracing::debug!(segment = index, position, "segment changed");
            }
            highlight.on_segment_changed(index);
        }

        Some(TickReport {
            position,
            segment: self.highlighted,
            segment_changed,
        })
    }
}
