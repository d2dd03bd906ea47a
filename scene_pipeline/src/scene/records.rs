/// Prepare-side scene records.
///
/// Cameras, point lights and meshes are stored in dense vectors indexed by
/// their Key slot; drawables (one per submesh) live in a SlotMap and are
/// addressed by `DrawableKey`, which is also the spatial index key.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};
use slotmap::new_key_type;
use crate::camera::Frustum;
use crate::handle::{Key, ObjectKind};
use crate::math::{compose_transform, AABB};

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key of a derived drawable within the SceneMirror.
    pub struct DrawableKey;
}

// ===== EXTERNAL REFERENCES =====

/// Opaque mesh (vertex data) identifier supplied by the asset layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshRef(pub u32);

/// Opaque material identifier supplied by the asset layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialRef(pub u32);

/// One submesh of a geometry assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubMeshInstance {
    /// `None` marks a submesh whose vertex data failed to load
    pub mesh: Option<MeshRef>,
    /// Local-space bounds
    pub bounding_box: AABB,
}

// ===== TRANSFORM =====

/// Position, orientation and scale of a scene object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// World matrix (T * R * S)
    pub fn matrix(&self) -> Mat4 {
        compose_transform(self.position, self.orientation, self.scale)
    }
}

// ===== RECORDS =====

/// Mirror of a camera
#[derive(Debug, Clone)]
pub struct CameraRecord {
    pub generation: u32,
    pub active: bool,
    pub transform: Transform,
    pub projection: Mat4,
    pub has_moved: bool,
    /// Refreshed by the assembler every frame the camera is active
    pub frustum: Frustum,
}

impl CameraRecord {
    pub(crate) fn new(generation: u32) -> Self {
        Self {
            generation,
            active: true,
            transform: Transform::default(),
            projection: Mat4::IDENTITY,
            has_moved: true,
            frustum: Frustum::from_view_projection(&Mat4::IDENTITY),
        }
    }
}

/// Mirror of a point light
#[derive(Debug, Clone, Copy)]
pub struct PointLightRecord {
    pub generation: u32,
    pub active: bool,
    pub position: Vec3,
    pub color: Vec3,
    /// Attenuation terms (constant, linear, quadratic)
    pub range: Vec3,
}

impl PointLightRecord {
    pub(crate) fn new(generation: u32) -> Self {
        Self {
            generation,
            active: true,
            position: Vec3::ZERO,
            color: Vec3::ONE,
            range: Vec3::new(1.0, 0.0, 0.0),
        }
    }
}

/// Mirror of a logical mesh entity (addressed by a Drawable-kind Key)
#[derive(Debug, Clone, Default)]
pub struct MeshRecord {
    pub generation: u32,
    pub active: bool,
    pub transform: Transform,
    /// Drawables derived from the current geometry, in submesh order
    pub drawables: Vec<DrawableKey>,
}

impl MeshRecord {
    pub(crate) fn new(generation: u32) -> Self {
        Self {
            generation,
            active: true,
            ..Self::default()
        }
    }
}

bitflags! {
    /// Drawable state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DrawableFlags: u8 {
        /// Has both a mesh and a material; only active drawables are indexed
        const ACTIVE         = 1 << 0;
        /// Not yet in the spatial index
        const PENDING_INSERT = 1 << 1;
        /// Transform changed since the last index update
        const HAS_MOVED      = 1 << 2;
    }
}

/// One renderable submesh instance derived from a mesh record
#[derive(Debug, Clone)]
pub struct Drawable {
    pub mesh: Option<MeshRef>,
    pub material: Option<MaterialRef>,
    /// Local-space bounds copied from the submesh
    pub mesh_aabb: AABB,
    /// Copy of the owner's transform
    pub transform: Transform,
    /// World matrix cached at the last index update
    pub transformation: Mat4,
    pub previous_aabb: AABB,
    pub current_aabb: AABB,
    pub flags: DrawableFlags,
    /// Slot of the owning mesh record
    pub owner_slot: u32,
    /// Position in the owner's drawable list
    pub owner_index: u32,
}

impl Drawable {
    pub fn is_active(&self) -> bool {
        self.flags.contains(DrawableFlags::ACTIVE)
    }

    /// Recompute the world matrix and world AABB from the transform copy
    pub(crate) fn refresh_world_bounds(&mut self) {
        self.transformation = self.transform.matrix();
        self.current_aabb = self.mesh_aabb.transformed(&self.transformation);
    }
}

/// Key of the mesh record owning a drawable
pub(crate) fn owner_key(slot: u32, generation: u32) -> Key {
    Key::new(ObjectKind::Drawable, slot, generation)
}
