/// Prepare-side copy of the scene.
///
/// The SceneMirror is rebuilt solely from PrepareCommands and is mutated
/// only by the prepare stage. Cameras, point lights and mesh records are
/// stored by Key slot; each mesh record derives one Drawable per submesh of
/// its current geometry.
///
/// Referencing an unknown or stale Key, or a Key of the wrong kind, is a
/// programmer error and panics.

use slotmap::SlotMap;
use glam::{Mat4, Quat, Vec3};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::handle::{Key, ObjectKind};
use crate::pipeline_err;
use super::records::{
    CameraRecord, Drawable, DrawableFlags, DrawableKey, MaterialRef, MeshRecord,
    PointLightRecord, SubMeshInstance,
};
use super::scene_index::{create_scene_index, SceneIndex};

const LOG_SOURCE: &str = "pipeline3d::SceneMirror";

// ===== RECORD ACCESS =====

/// Common view of the slot-indexed records
trait SlotRecord {
    fn generation(&self) -> u32;
    fn is_active(&self) -> bool;
}

impl SlotRecord for MeshRecord {
    fn generation(&self) -> u32 { self.generation }
    fn is_active(&self) -> bool { self.active }
}

impl SlotRecord for CameraRecord {
    fn generation(&self) -> u32 { self.generation }
    fn is_active(&self) -> bool { self.active }
}

impl SlotRecord for PointLightRecord {
    fn generation(&self) -> u32 { self.generation }
    fn is_active(&self) -> bool { self.active }
}

/// Create the record for `key`, or do nothing if it already exists.
/// Returns true if a record was (re)initialized.
fn create_record<T: SlotRecord>(
    records: &mut Vec<Option<T>>,
    key: Key,
    make: impl FnOnce(u32) -> T,
) -> bool {
    let index = key.slot() as usize;
    if index >= records.len() {
        records.resize_with(index + 1, || None);
    }
    let existing = records[index].as_ref().map(|r| (r.generation(), r.is_active()));
    match existing {
        Some((generation, active)) if generation == key.generation() => {
            assert!(active, "create of destroyed {:?}", key);
            false
        }
        Some((generation, active)) => {
            assert!(
                !active,
                "create of {:?} while generation {} still occupies the slot",
                key, generation
            );
            records[index] = Some(make(key.generation()));
            true
        }
        None => {
            records[index] = Some(make(key.generation()));
            true
        }
    }
}

fn live_record<T: SlotRecord>(records: &[Option<T>], key: Key) -> Option<&T> {
    records
        .get(key.slot() as usize)
        .and_then(|r| r.as_ref())
        .filter(|r| r.generation() == key.generation() && r.is_active())
}

fn live_record_mut<T: SlotRecord>(records: &mut [Option<T>], key: Key) -> &mut T {
    match records.get_mut(key.slot() as usize).and_then(|r| r.as_mut()) {
        Some(record) if record.generation() == key.generation() && record.is_active() => record,
        Some(record) => panic!(
            "{:?} is stale (slot holds generation {}, active: {})",
            key, record.generation(), record.is_active()
        ),
        None => panic!("{:?} is unknown to the scene mirror", key),
    }
}

fn expect_kind(key: Key, kind: ObjectKind, operation: &str) {
    assert!(
        key.kind() == kind,
        "{} expects a {:?} key, got {:?}",
        operation, kind, key
    );
}

// ===== SCENE MIRROR =====

/// Single-writer scene state owned by the prepare stage
pub struct SceneMirror {
    pub(super) meshes: Vec<Option<MeshRecord>>,
    pub(super) cameras: Vec<Option<CameraRecord>>,
    pub(super) lights: Vec<Option<PointLightRecord>>,
    pub(super) drawables: SlotMap<DrawableKey, Drawable>,
    /// Drawables flagged pending-insert or has-moved, in flag order
    pub(super) dirty: Vec<DrawableKey>,
    pub(super) index: Box<dyn SceneIndex>,
}

impl SceneMirror {
    /// Create an empty mirror over `index`
    pub fn new(index: Box<dyn SceneIndex>) -> Self {
        Self {
            meshes: Vec::new(),
            cameras: Vec::new(),
            lights: Vec::new(),
            drawables: SlotMap::with_key(),
            dirty: Vec::new(),
            index,
        }
    }

    /// Create an empty mirror with the index selected by `config`
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(create_scene_index(config))
    }

    // ===== CREATION / DESTRUCTION =====

    /// Start mirroring a mesh entity. Idempotent for a Key already created.
    pub fn create_drawable(&mut self, key: Key) {
        expect_kind(key, ObjectKind::Drawable, "create_drawable");
        create_record(&mut self.meshes, key, MeshRecord::new);
    }

    /// Start mirroring a camera. Idempotent for a Key already created.
    pub fn create_camera(&mut self, key: Key) {
        expect_kind(key, ObjectKind::Camera, "create_camera");
        create_record(&mut self.cameras, key, CameraRecord::new);
    }

    /// Start mirroring a point light. Idempotent for a Key already created.
    pub fn create_point_light(&mut self, key: Key) {
        expect_kind(key, ObjectKind::PointLight, "create_point_light");
        create_record(&mut self.lights, key, PointLightRecord::new);
    }

    /// Mark the record inactive and drop a mesh entity's drawables from
    /// the scene index
    pub fn destroy(&mut self, key: Key) {
        match key.kind() {
            ObjectKind::Drawable => {
                let mesh = live_record_mut(&mut self.meshes, key);
                mesh.active = false;
                let old = std::mem::take(&mut mesh.drawables);
                self.release_drawables(old);
            }
            ObjectKind::Camera => live_record_mut(&mut self.cameras, key).active = false,
            ObjectKind::PointLight => live_record_mut(&mut self.lights, key).active = false,
        }
    }

    // ===== TRANSFORMS =====

    pub fn set_position(&mut self, key: Key, position: Vec3) {
        match key.kind() {
            ObjectKind::Drawable => {
                live_record_mut(&mut self.meshes, key).transform.position = position;
                self.propagate_transform(key);
            }
            ObjectKind::Camera => {
                let camera = live_record_mut(&mut self.cameras, key);
                camera.transform.position = position;
                camera.has_moved = true;
            }
            ObjectKind::PointLight => live_record_mut(&mut self.lights, key).position = position,
        }
    }

    /// Point lights have no orientation; the value is ignored for them.
    pub fn set_orientation(&mut self, key: Key, orientation: Quat) {
        match key.kind() {
            ObjectKind::Drawable => {
                live_record_mut(&mut self.meshes, key).transform.orientation = orientation;
                self.propagate_transform(key);
            }
            ObjectKind::Camera => {
                let camera = live_record_mut(&mut self.cameras, key);
                camera.transform.orientation = orientation;
                camera.has_moved = true;
            }
            ObjectKind::PointLight => {
                live_record_mut(&mut self.lights, key);
                crate::pipeline_trace!(LOG_SOURCE, "Orientation ignored for point light {:?}", key);
            }
        }
    }

    /// Point lights have no scale; the value is ignored for them.
    pub fn set_scale(&mut self, key: Key, scale: Vec3) {
        match key.kind() {
            ObjectKind::Drawable => {
                live_record_mut(&mut self.meshes, key).transform.scale = scale;
                self.propagate_transform(key);
            }
            ObjectKind::Camera => {
                let camera = live_record_mut(&mut self.cameras, key);
                camera.transform.scale = scale;
                camera.has_moved = true;
            }
            ObjectKind::PointLight => {
                live_record_mut(&mut self.lights, key);
                crate::pipeline_trace!(LOG_SOURCE, "Scale ignored for point light {:?}", key);
            }
        }
    }

    // ===== GEOMETRY / LIGHT / CAMERA =====

    /// Replace a mesh entity's drawables with one per submesh.
    ///
    /// A submesh without vertex data, without a material, or with an
    /// invalid bounding box yields an inactive drawable that never enters
    /// the scene index.
    pub fn set_geometry(
        &mut self,
        key: Key,
        submeshes: &[SubMeshInstance],
        materials: &[Option<MaterialRef>],
    ) {
        expect_kind(key, ObjectKind::Drawable, "set_geometry");
        let mesh = live_record_mut(&mut self.meshes, key);
        let old = std::mem::take(&mut mesh.drawables);
        let transform = mesh.transform;
        self.release_drawables(old);

        let transformation = transform.matrix();
        let mut created = Vec::with_capacity(submeshes.len());
        for (i, submesh) in submeshes.iter().enumerate() {
            let material = materials.get(i).copied().flatten();
            let usable = submesh.mesh.is_some() && material.is_some() && submesh.bounding_box.is_valid();
            if !usable {
                crate::pipeline_warn!(LOG_SOURCE,
                    "Submesh {} of {:?} is missing its mesh, material or bounds; drawable left inactive",
                    i, key);
            }
            let world = submesh.bounding_box.transformed(&transformation);
            let drawable = Drawable {
                mesh: submesh.mesh,
                material,
                mesh_aabb: submesh.bounding_box,
                transform,
                transformation,
                previous_aabb: world,
                current_aabb: world,
                flags: if usable {
                    DrawableFlags::ACTIVE | DrawableFlags::PENDING_INSERT
                } else {
                    DrawableFlags::empty()
                },
                owner_slot: key.slot(),
                owner_index: i as u32,
            };
            let drawable_key = self.drawables.insert(drawable);
            if usable {
                self.dirty.push(drawable_key);
            }
            created.push(drawable_key);
        }
        live_record_mut(&mut self.meshes, key).drawables = created;
    }

    pub fn set_point_light(&mut self, key: Key, color: Vec3, range: Vec3) {
        expect_kind(key, ObjectKind::PointLight, "set_point_light");
        let light = live_record_mut(&mut self.lights, key);
        light.color = color;
        light.range = range;
    }

    pub fn set_camera_info(&mut self, key: Key, projection: Mat4) {
        expect_kind(key, ObjectKind::Camera, "set_camera_info");
        let camera = live_record_mut(&mut self.cameras, key);
        camera.projection = projection;
        camera.has_moved = true;
    }

    // ===== ACCESSORS =====

    /// Live mesh record for `key`
    pub fn mesh(&self, key: Key) -> Option<&MeshRecord> {
        if key.kind() != ObjectKind::Drawable {
            return None;
        }
        live_record(&self.meshes, key)
    }

    /// Live camera record for `key`
    pub fn camera(&self, key: Key) -> Option<&CameraRecord> {
        if key.kind() != ObjectKind::Camera {
            return None;
        }
        live_record(&self.cameras, key)
    }

    /// Live point light record for `key`
    pub fn point_light(&self, key: Key) -> Option<&PointLightRecord> {
        if key.kind() != ObjectKind::PointLight {
            return None;
        }
        live_record(&self.lights, key)
    }

    pub fn drawable(&self, key: DrawableKey) -> Option<&Drawable> {
        self.drawables.get(key)
    }

    /// Drawables derived from a mesh entity, in submesh order
    pub fn drawables_of(&self, key: Key) -> &[DrawableKey] {
        self.mesh(key).map(|m| m.drawables.as_slice()).unwrap_or(&[])
    }

    /// Number of derived drawables (active or not)
    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    /// Drawables waiting for the next index update
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Keys of the active cameras, in slot order
    pub fn active_cameras(&self) -> Vec<Key> {
        self.cameras
            .iter()
            .enumerate()
            .filter_map(|(slot, r)| r.as_ref().filter(|c| c.active).map(|c| (slot, c)))
            .map(|(slot, c)| Key::new(ObjectKind::Camera, slot as u32, c.generation))
            .collect()
    }

    /// Active point lights, in slot order
    pub fn active_point_lights(&self) -> impl Iterator<Item = &PointLightRecord> {
        self.lights.iter().flatten().filter(|l| l.active)
    }

    pub fn scene_index(&self) -> &dyn SceneIndex {
        self.index.as_ref()
    }

    /// Check the scene index structure and its agreement with the drawables
    pub fn check_integrity(&self) -> Result<()> {
        self.index.check_integrity()?;

        let indexed = self
            .drawables
            .values()
            .filter(|d| d.is_active() && !d.flags.contains(DrawableFlags::PENDING_INSERT))
            .count();
        if indexed != self.index.len() {
            return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                "{} drawables should be indexed, index holds {}", indexed, self.index.len()));
        }

        for (key, drawable) in &self.drawables {
            let owner = self.meshes.get(drawable.owner_slot as usize).and_then(|m| m.as_ref());
            let back = owner.and_then(|m| m.drawables.get(drawable.owner_index as usize));
            if back != Some(&key) {
                return Err(pipeline_err!(IntegrityViolation, LOG_SOURCE,
                    "{:?} is not listed by its owner at index {}", key, drawable.owner_index));
            }
        }
        Ok(())
    }

    // ===== INTERNALS =====

    /// Copy a mesh entity's transform to its drawables and flag them moved
    fn propagate_transform(&mut self, key: Key) {
        let Some(mesh) = live_record(&self.meshes, key) else {
            return;
        };
        for &drawable_key in &mesh.drawables {
            let Some(drawable) = self.drawables.get_mut(drawable_key) else {
                continue;
            };
            drawable.transform = mesh.transform;
            if !drawable.is_active() {
                continue;
            }
            // a pending insert already picks up the new transform
            if drawable
                .flags
                .intersects(DrawableFlags::PENDING_INSERT | DrawableFlags::HAS_MOVED)
            {
                continue;
            }
            drawable.flags.insert(DrawableFlags::HAS_MOVED);
            self.dirty.push(drawable_key);
        }
    }

    fn release_drawables(&mut self, keys: Vec<DrawableKey>) {
        for key in keys {
            if let Some(drawable) = self.drawables.remove(key) {
                if drawable.is_active() && !drawable.flags.contains(DrawableFlags::PENDING_INSERT) {
                    self.index.remove(key);
                }
            }
        }
    }

    /// Take the drawables flagged since the last index update
    pub(super) fn take_dirty(&mut self) -> Vec<DrawableKey> {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
