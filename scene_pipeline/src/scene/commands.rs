//! Commands consumed by the prepare stage

use std::fmt;
use glam::{Mat4, Quat, Vec3};
use crate::handle::Key;
use super::mirror::SceneMirror;
use super::records::{MaterialRef, SubMeshInstance};

/// Closure run on the prepare stage with exclusive access to the mirror
pub type PrepareTask = Box<dyn FnOnce(&mut SceneMirror) + Send>;

/// One mutation of prepare-owned state, addressed by Key
pub enum PrepareCommand {
    CreateDrawable(Key),
    CreateCamera(Key),
    CreatePointLight(Key),
    Destroy(Key),
    SetPosition(Key, Vec3),
    SetOrientation(Key, Quat),
    SetScale(Key, Vec3),
    SetGeometry {
        key: Key,
        submeshes: Vec<SubMeshInstance>,
        /// Material per submesh; missing entries leave the drawable inactive
        materials: Vec<Option<MaterialRef>>,
    },
    SetPointLight {
        key: Key,
        color: Vec3,
        range: Vec3,
    },
    SetCameraInfo {
        key: Key,
        projection: Mat4,
    },
    /// Update the scene index, cull every active camera and hand the
    /// frame to the render stage
    PrepareDrawLists,
    Execute(PrepareTask),
    Shutdown,
}

impl fmt::Debug for PrepareCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepareCommand::CreateDrawable(key) => write!(f, "CreateDrawable({:?})", key),
            PrepareCommand::CreateCamera(key) => write!(f, "CreateCamera({:?})", key),
            PrepareCommand::CreatePointLight(key) => write!(f, "CreatePointLight({:?})", key),
            PrepareCommand::Destroy(key) => write!(f, "Destroy({:?})", key),
            PrepareCommand::SetPosition(key, v) => write!(f, "SetPosition({:?}, {})", key, v),
            PrepareCommand::SetOrientation(key, q) => write!(f, "SetOrientation({:?}, {})", key, q),
            PrepareCommand::SetScale(key, v) => write!(f, "SetScale({:?}, {})", key, v),
            PrepareCommand::SetGeometry { key, submeshes, .. } => {
                write!(f, "SetGeometry({:?}, {} submeshes)", key, submeshes.len())
            }
            PrepareCommand::SetPointLight { key, .. } => write!(f, "SetPointLight({:?})", key),
            PrepareCommand::SetCameraInfo { key, .. } => write!(f, "SetCameraInfo({:?})", key),
            PrepareCommand::PrepareDrawLists => write!(f, "PrepareDrawLists"),
            PrepareCommand::Execute(_) => write!(f, "Execute(..)"),
            PrepareCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}
