//! Render-side types: draw lists, backend seam and the render stage

mod draw_list;
mod backend;
mod commands;
mod render_stage;

pub use draw_list::{DrawItem, DrawList, FrameDrawLists, InstanceData, PointLightData};
pub use backend::{RecordingBackend, RenderBackend};
pub use commands::{RenderCommand, RenderTask};
pub(crate) use render_stage::RenderStage;
