/// Pipeline scheduler.
///
/// Owns the prepare and render stage threads and the logic-side
/// SceneProxy. The calling thread is the logic stage.
///
/// # Lifecycle
///
/// ```ignore
/// let mut pipeline = Pipeline::launch(PipelineConfig::default(), RecordingBackend::new())?;
/// let camera = pipeline.scene().create_camera()?;
/// pipeline.scene().set_camera_info(camera, projection)?;
/// pipeline.scene().prepare_draw_lists()?;
/// pipeline.shutdown()?;
/// ```

use std::any::Any;
use std::sync::Arc;
use std::fmt;
use std::thread::JoinHandle;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline_err;
use crate::queue::{self, CommandSender};
use crate::render::{RenderBackend, RenderCommand, RenderStage};
use crate::scene::{PrepareCommand, PrepareStage, SceneMirror, SceneProxy};
use super::stage::{spawn_stage, StageReport, StageStatistics};

const LOG_SOURCE: &str = "pipeline3d::Pipeline";

/// Stage threads owned by a Pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Prepare,
    Render,
}

struct StageHandle<C> {
    name: String,
    sender: CommandSender<C>,
    thread: Option<JoinHandle<()>>,
    statistics: Arc<StageStatistics>,
}

impl<C> StageHandle<C> {
    /// Queue `shutdown` and wait for the thread to finish
    fn stop(&mut self, shutdown: C) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // a stage that already exited (panic) has dropped its receiver
        let _ = self.sender.enqueue(shutdown);
        thread.join().map_err(|payload| {
            pipeline_err!(StageFailed, LOG_SOURCE,
                "stage '{}' panicked: {}", self.name, panic_message(payload.as_ref()))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The running three-stage pipeline
pub struct Pipeline {
    config: PipelineConfig,
    scene: SceneProxy,
    prepare: StageHandle<PrepareCommand>,
    render: StageHandle<RenderCommand>,
}

impl Pipeline {
    /// Validate `config`, start both stages and initialize the backend on
    /// the render thread.
    ///
    /// Fails with `InitializationFailed` if a thread cannot be spawned or
    /// the backend init fails; the stages are stopped before returning.
    pub fn launch<B: RenderBackend + 'static>(config: PipelineConfig, backend: B) -> Result<Self> {
        config.validate()?;

        let (render_tx, render_rx) = queue::unbounded();
        let (prepare_tx, prepare_rx) = queue::unbounded();
        let (token_tx, token_rx) = flume::bounded(config.max_frames_in_flight);

        let render_statistics = Arc::new(StageStatistics::new());
        let render_thread = spawn_stage(
            &config.render_thread_name,
            RenderStage::new(Box::new(backend), token_rx.clone()),
            render_rx,
            Arc::clone(&render_statistics),
        )?;
        let mut render = StageHandle {
            name: config.render_thread_name.clone(),
            sender: render_tx.clone(),
            thread: Some(render_thread),
            statistics: render_statistics,
        };

        let prepare_statistics = Arc::new(StageStatistics::new());
        let prepare_thread = match spawn_stage(
            &config.prepare_thread_name,
            PrepareStage::new(&config, render_tx),
            prepare_rx,
            Arc::clone(&prepare_statistics),
        ) {
            Ok(thread) => thread,
            Err(e) => {
                let _ = render.stop(RenderCommand::Shutdown);
                return Err(e);
            }
        };
        let prepare = StageHandle {
            name: config.prepare_thread_name.clone(),
            sender: prepare_tx.clone(),
            thread: Some(prepare_thread),
            statistics: prepare_statistics,
        };

        let mut pipeline = Self {
            scene: SceneProxy::new(prepare_tx, token_tx, token_rx),
            config,
            prepare,
            render,
        };

        let init = pipeline
            .render
            .sender
            .enqueue_and_await(RenderCommand::InitBackend)
            .and_then(|result| result);
        if let Err(e) = init {
            let _ = pipeline.shutdown();
            return Err(pipeline_err!(InitializationFailed, LOG_SOURCE,
                "render backend: {}", e));
        }

        crate::pipeline_info!(LOG_SOURCE, "Pipeline launched ({} frames in flight)",
            pipeline.config.max_frames_in_flight);
        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Logic-side entry point for scene mutations
    pub fn scene(&mut self) -> &mut SceneProxy {
        &mut self.scene
    }

    /// Run `task` on the prepare stage, after every command already queued,
    /// and wait for its result
    pub fn execute_on_prepare<R, F>(&self, task: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut SceneMirror) -> R + Send + 'static,
    {
        self.prepare.sender.enqueue_and_await(|promise| {
            PrepareCommand::Execute(Box::new(move |mirror: &mut SceneMirror| {
                promise.fulfill(task(mirror))
            }))
        })
    }

    /// Run `task` on the render stage, after every command already queued,
    /// and wait for its result
    pub fn execute_on_render<R, F>(&self, task: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn RenderBackend) -> R + Send + 'static,
    {
        self.render.sender.enqueue_and_await(|promise| {
            RenderCommand::Execute(Box::new(move |backend: &mut dyn RenderBackend| {
                promise.fulfill(task(backend))
            }))
        })
    }

    /// Wait until every command queued so far has gone through both stages
    pub fn flush(&self) -> Result<()> {
        self.execute_on_prepare(|_| ())?;
        self.execute_on_render(|_| ())
    }

    /// Snapshot of a stage's counters
    pub fn statistics(&self, stage: StageKind) -> StageReport {
        match stage {
            StageKind::Prepare => self.prepare.statistics.report(),
            StageKind::Render => self.render.statistics.report(),
        }
    }

    /// Stop the prepare stage, then the render stage, and join both.
    ///
    /// Frames already requested are submitted before the render stage
    /// exits. Fails with `StageFailed` if either thread panicked.
    pub fn shutdown(&mut self) -> Result<()> {
        let prepare = self.prepare.stop(PrepareCommand::Shutdown);
        let render = self.render.stop(RenderCommand::Shutdown);
        prepare.and(render)
    }

    /// Whether both stage threads are still joinable
    pub fn is_running(&self) -> bool {
        self.prepare.thread.is_some() && self.render.thread.is_some()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            crate::pipeline_error!(LOG_SOURCE, "Shutdown on drop: {}", e);
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("prepare", &self.prepare.name)
            .field("render", &self.render.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
