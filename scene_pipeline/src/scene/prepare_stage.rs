/// Prepare stage: sole owner of the SceneMirror and its scene index.

use crate::config::PipelineConfig;
use crate::pipeline::{CommandHandler, StageControl};
use crate::queue::CommandSender;
use crate::render::RenderCommand;
use super::assembler::DrawListAssembler;
use super::commands::PrepareCommand;
use super::mirror::SceneMirror;

const LOG_SOURCE: &str = "pipeline3d::PrepareStage";

pub(crate) struct PrepareStage {
    mirror: SceneMirror,
    assembler: DrawListAssembler,
    render: CommandSender<RenderCommand>,
}

impl PrepareStage {
    pub(crate) fn new(config: &PipelineConfig, render: CommandSender<RenderCommand>) -> Self {
        Self {
            mirror: SceneMirror::from_config(config),
            assembler: DrawListAssembler::new(config),
            render,
        }
    }
}

impl CommandHandler for PrepareStage {
    type Command = PrepareCommand;

    fn handle(&mut self, command: PrepareCommand) -> StageControl {
        match command {
            PrepareCommand::CreateDrawable(key) => self.mirror.create_drawable(key),
            PrepareCommand::CreateCamera(key) => self.mirror.create_camera(key),
            PrepareCommand::CreatePointLight(key) => self.mirror.create_point_light(key),
            PrepareCommand::Destroy(key) => self.mirror.destroy(key),
            PrepareCommand::SetPosition(key, position) => self.mirror.set_position(key, position),
            PrepareCommand::SetOrientation(key, orientation) => {
                self.mirror.set_orientation(key, orientation)
            }
            PrepareCommand::SetScale(key, scale) => self.mirror.set_scale(key, scale),
            PrepareCommand::SetGeometry { key, submeshes, materials } => {
                self.mirror.set_geometry(key, &submeshes, &materials)
            }
            PrepareCommand::SetPointLight { key, color, range } => {
                self.mirror.set_point_light(key, color, range)
            }
            PrepareCommand::SetCameraInfo { key, projection } => {
                self.mirror.set_camera_info(key, projection)
            }
            PrepareCommand::PrepareDrawLists => {
                let frame = self.assembler.assemble(&mut self.mirror);
                let number = frame.frame;
                if self.render.enqueue(RenderCommand::CopyDrawLists(frame)).is_err() {
                    crate::pipeline_error!(LOG_SOURCE,
                        "Frame {} dropped: render stage is gone", number);
                }
            }
            PrepareCommand::Execute(task) => task(&mut self.mirror),
            PrepareCommand::Shutdown => return StageControl::Exit,
        }
        StageControl::Continue
    }

    fn on_exit(&mut self) {
        crate::pipeline_debug!(LOG_SOURCE,
            "{} frames assembled, {} drawables mirrored",
            self.assembler.next_frame(), self.mirror.drawable_count());
    }
}
