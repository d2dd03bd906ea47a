/// Render stage: sole owner of the RenderBackend.

use crate::pipeline::{CommandHandler, StageControl};
use super::backend::RenderBackend;
use super::commands::RenderCommand;

const LOG_SOURCE: &str = "pipeline3d::RenderStage";

pub(crate) struct RenderStage {
    backend: Box<dyn RenderBackend>,
    /// Returned one per consumed frame, unblocking the logic side
    frame_tokens: flume::Receiver<()>,
    initialized: bool,
}

impl RenderStage {
    pub(crate) fn new(backend: Box<dyn RenderBackend>, frame_tokens: flume::Receiver<()>) -> Self {
        Self {
            backend,
            frame_tokens,
            initialized: false,
        }
    }
}

impl CommandHandler for RenderStage {
    type Command = RenderCommand;

    fn handle(&mut self, command: RenderCommand) -> StageControl {
        match command {
            RenderCommand::InitBackend(promise) => {
                let result = self.backend.init();
                match &result {
                    Ok(()) => crate::pipeline_info!(LOG_SOURCE, "Render backend initialized"),
                    Err(e) => crate::pipeline_error!(LOG_SOURCE, "Render backend init failed: {}", e),
                }
                self.initialized = result.is_ok();
                promise.fulfill(result);
            }
            RenderCommand::CopyDrawLists(frame) => {
                if !self.initialized {
                    crate::pipeline_error!(LOG_SOURCE,
                        "Frame {} dropped: backend not initialized", frame.frame);
                } else if let Err(e) = self.backend.submit(&frame) {
                    crate::pipeline_error!(LOG_SOURCE, "Frame {} submission failed: {}", frame.frame, e);
                }
                let _ = self.frame_tokens.try_recv();
            }
            RenderCommand::Execute(task) => task(self.backend.as_mut()),
            RenderCommand::Shutdown => return StageControl::Exit,
        }
        StageControl::Continue
    }

    fn on_exit(&mut self) {
        if self.initialized {
            self.backend.shutdown();
            self.initialized = false;
        }
    }
}
