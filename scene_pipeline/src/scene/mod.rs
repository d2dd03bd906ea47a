//! Prepare-side scene state and draw list assembly

mod records;
mod commands;
mod scene_index;
mod linear_scene_index;
mod mirror;
mod assembler;
mod proxy;
mod prepare_stage;

pub use records::{
    CameraRecord, Drawable, DrawableFlags, DrawableKey, MaterialRef, MeshRecord, MeshRef,
    PointLightRecord, SubMeshInstance, Transform,
};
pub use commands::{PrepareCommand, PrepareTask};
pub use scene_index::{create_scene_index, SceneIndex};
pub use linear_scene_index::LinearSceneIndex;
pub use mirror::SceneMirror;
pub use assembler::{AssemblyReport, DrawListAssembler};
pub use proxy::SceneProxy;
pub(crate) use prepare_stage::PrepareStage;
