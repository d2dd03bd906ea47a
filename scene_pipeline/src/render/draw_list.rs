/// Per-camera draw lists handed from the prepare stage to the render stage.
///
/// A FrameDrawLists value is a self-contained snapshot: it owns copies of
/// every matrix and reference it needs, so the render stage never reads
/// prepare-owned state.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rdst::RadixKey;
use crate::handle::Key;
use crate::math::AABB;
use crate::scene::{DrawableKey, MaterialRef, MeshRef};

/// Point light as seen by the render stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightData {
    pub light: Key,
    pub position: Vec3,
    pub color: Vec3,
    /// Attenuation terms (constant, linear, quadratic)
    pub range: Vec3,
}

/// One visible drawable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    /// Mesh entity the drawable was derived from
    pub owner: Key,
    pub drawable: DrawableKey,
    pub mesh: MeshRef,
    pub material: MaterialRef,
    /// World matrix
    pub transformation: Mat4,
    pub local_bounds: AABB,
    pub world_bounds: AABB,
}

impl DrawItem {
    /// Batching order: material first, then mesh
    pub fn sort_key(&self) -> u64 {
        ((self.material.0 as u64) << 32) | self.mesh.0 as u64
    }
}

impl RadixKey for DrawItem {
    const LEVELS: usize = 8;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        (self.sort_key() >> (level * 8)) as u8
    }
}

/// Per-instance GPU upload record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub world: Mat4,
    pub mesh: u32,
    pub material: u32,
    pub _padding: [u32; 2],
}

/// Visible content of one camera for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DrawList {
    pub camera: Key,
    pub view: Mat4,
    pub projection: Mat4,
    /// Every active point light (lights are not culled)
    pub lights: Vec<PointLightData>,
    pub drawables: Vec<DrawItem>,
}

impl DrawList {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Whether a drawable derived from `owner` is visible
    pub fn contains_owner(&self, owner: Key) -> bool {
        self.drawables.iter().any(|item| item.owner == owner)
    }

    /// Pack the draw items for instanced upload, in draw order
    pub fn instance_data(&self) -> Vec<InstanceData> {
        self.drawables
            .iter()
            .map(|item| InstanceData {
                world: item.transformation,
                mesh: item.mesh.0,
                material: item.material.0,
                _padding: [0; 2],
            })
            .collect()
    }

    /// `instance_data()` as raw bytes
    pub fn instance_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.instance_data()).to_vec()
    }
}

/// Everything prepared for one frame, one draw list per active camera
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDrawLists {
    /// Monotonic frame counter, starting at 0
    pub frame: u64,
    pub lists: Vec<DrawList>,
}

impl FrameDrawLists {
    /// Draw list of `camera`, if it was active this frame
    pub fn list_for(&self, camera: Key) -> Option<&DrawList> {
        self.lists.iter().find(|list| list.camera == camera)
    }

    /// Total draw items across cameras
    pub fn item_count(&self) -> usize {
        self.lists.iter().map(|list| list.drawables.len()).sum()
    }
}

#[cfg(test)]
#[path = "draw_list_tests.rs"]
mod tests;
