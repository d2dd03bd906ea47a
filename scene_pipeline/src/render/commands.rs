//! Commands consumed by the render stage

use std::fmt;
use crate::error::Result;
use crate::queue::Promise;
use super::backend::RenderBackend;
use super::draw_list::FrameDrawLists;

/// Closure run on the render stage with exclusive access to the backend
pub type RenderTask = Box<dyn FnOnce(&mut dyn RenderBackend) + Send>;

pub enum RenderCommand {
    /// Initialize the backend and report the outcome
    InitBackend(Promise<Result<()>>),
    /// Submit one prepared frame
    CopyDrawLists(FrameDrawLists),
    Execute(RenderTask),
    Shutdown,
}

impl fmt::Debug for RenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderCommand::InitBackend(_) => write!(f, "InitBackend"),
            RenderCommand::CopyDrawLists(frame) => {
                write!(f, "CopyDrawLists(frame {}, {} lists)", frame.frame, frame.lists.len())
            }
            RenderCommand::Execute(_) => write!(f, "Execute(..)"),
            RenderCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}
