/// Spatial acceleration structures for drawable culling.
///
/// A SceneIndex indexes drawables by their world-space AABB for frustum
/// culling. The SceneMirror owns exactly one and only the prepare stage
/// touches it.

use crate::camera::Frustum;
use crate::config::{PipelineConfig, SceneIndexKind};
use crate::error::Result;
use crate::math::AABB;
use crate::octree::LooseOctree;
use super::linear_scene_index::LinearSceneIndex;
use super::records::DrawableKey;

/// Trait for spatial indexing of drawables.
///
/// Used by the DrawListAssembler (placement and frustum queries) and by the
/// SceneMirror (removal on destroy / re-geometry).
pub trait SceneIndex: Send + Sync {
    /// Insert a drawable with its world-space AABB.
    fn insert(&mut self, key: DrawableKey, world_aabb: &AABB);

    /// Remove a drawable. Returns false if it was not indexed.
    fn remove(&mut self, key: DrawableKey) -> bool;

    /// Update a drawable's world-space AABB after a transform change.
    fn update(&mut self, key: DrawableKey, world_aabb: &AABB);

    /// Query all drawables whose world AABB intersects the frustum.
    /// Results are appended to `results`.
    fn query_frustum(&self, frustum: &Frustum, results: &mut Vec<DrawableKey>);

    /// Remove all drawables from the index.
    fn clear(&mut self);

    /// Number of indexed drawables
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release structure no longer needed by the current content.
    /// Returns the number of reclaimed levels.
    fn shrink(&mut self) -> usize;

    /// Structural self-check
    fn check_integrity(&self) -> Result<()>;
}

impl SceneIndex for LooseOctree<DrawableKey> {
    fn insert(&mut self, key: DrawableKey, world_aabb: &AABB) {
        LooseOctree::insert(self, key, *world_aabb);
    }

    fn remove(&mut self, key: DrawableKey) -> bool {
        LooseOctree::remove(self, &key)
    }

    fn update(&mut self, key: DrawableKey, world_aabb: &AABB) {
        self.move_object(&key, *world_aabb);
    }

    fn query_frustum(&self, frustum: &Frustum, results: &mut Vec<DrawableKey>) {
        LooseOctree::query_frustum(self, frustum, results);
    }

    fn clear(&mut self) {
        LooseOctree::clear(self);
    }

    fn len(&self) -> usize {
        LooseOctree::len(self)
    }

    fn shrink(&mut self) -> usize {
        LooseOctree::shrink(self)
    }

    fn check_integrity(&self) -> Result<()> {
        LooseOctree::check_integrity(self)
    }
}

/// Build the index selected by `config.scene_index`
pub fn create_scene_index(config: &PipelineConfig) -> Box<dyn SceneIndex> {
    match config.scene_index {
        SceneIndexKind::LooseOctree => Box::new(LooseOctree::<DrawableKey>::new(config.octree)),
        SceneIndexKind::Linear => Box::new(LinearSceneIndex::new()),
    }
}
