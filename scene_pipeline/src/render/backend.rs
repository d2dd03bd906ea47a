/// Render backend seam.
///
/// The render stage owns exactly one backend and calls it only from its own
/// thread. GPU command submission lives behind this trait.

use std::sync::{Arc, Mutex};
use crate::error::Result;
use crate::pipeline_err;
use super::draw_list::FrameDrawLists;

/// Consumer of the prepared frames
pub trait RenderBackend: Send {
    /// One-time setup, run on the render thread before any frame
    fn init(&mut self) -> Result<()>;

    /// Consume one frame; the draw lists must not be mutated
    fn submit(&mut self, frame: &FrameDrawLists) -> Result<()>;

    /// Release backend resources; called once when the render stage exits
    fn shutdown(&mut self) {}
}

#[derive(Debug, Default)]
struct Recording {
    initialized: bool,
    shut_down: bool,
    frames: Vec<FrameDrawLists>,
}

/// Headless backend keeping every frame it receives.
///
/// Clones share the same recording, so a caller can keep one clone and
/// hand the other to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    recording: Arc<Mutex<Recording>>,
    init_failure: Option<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose `init` fails with `message`
    pub fn failing_init(message: impl Into<String>) -> Self {
        Self {
            init_failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Copy of every frame received so far
    pub fn frames(&self) -> Result<Vec<FrameDrawLists>> {
        self.with_recording(|r| r.frames.clone())
    }

    pub fn frame_count(&self) -> Result<usize> {
        self.with_recording(|r| r.frames.len())
    }

    pub fn last_frame(&self) -> Result<Option<FrameDrawLists>> {
        self.with_recording(|r| r.frames.last().cloned())
    }

    pub fn is_initialized(&self) -> Result<bool> {
        self.with_recording(|r| r.initialized)
    }

    pub fn is_shut_down(&self) -> Result<bool> {
        self.with_recording(|r| r.shut_down)
    }

    fn with_recording<R>(&self, f: impl FnOnce(&mut Recording) -> R) -> Result<R> {
        let mut recording = self.recording.lock().map_err(|_| {
            pipeline_err!(BackendError, "pipeline3d::RecordingBackend", "recording lock poisoned")
        })?;
        Ok(f(&mut recording))
    }
}

impl RenderBackend for RecordingBackend {
    fn init(&mut self) -> Result<()> {
        if let Some(message) = &self.init_failure {
            return Err(pipeline_err!(BackendError, "pipeline3d::RecordingBackend", "{}", message));
        }
        self.with_recording(|r| r.initialized = true)
    }

    fn submit(&mut self, frame: &FrameDrawLists) -> Result<()> {
        self.with_recording(|r| r.frames.push(frame.clone()))
    }

    fn shutdown(&mut self) {
        // a poisoned recording is already reported by the accessors
        let _ = self.with_recording(|r| r.shut_down = true);
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
