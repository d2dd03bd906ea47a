/// Brute-force scene index: every entry is tested against the frustum.
///
/// Used when octree culling is switched off, and as a reference when
/// checking the octree's query results.

use rustc_hash::FxHashMap;
use crate::camera::Frustum;
use crate::error::Result;
use crate::math::AABB;
use crate::pipeline_err;
use super::records::DrawableKey;
use super::scene_index::SceneIndex;

/// Flat list of (key, world AABB) with O(1) removal
#[derive(Debug, Default)]
pub struct LinearSceneIndex {
    entries: Vec<(DrawableKey, AABB)>,
    positions: FxHashMap<DrawableKey, usize>,
}

impl LinearSceneIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// World AABB recorded for `key`
    pub fn aabb_of(&self, key: DrawableKey) -> Option<AABB> {
        self.positions.get(&key).map(|&pos| self.entries[pos].1)
    }
}

impl SceneIndex for LinearSceneIndex {
    fn insert(&mut self, key: DrawableKey, world_aabb: &AABB) {
        assert!(!self.positions.contains_key(&key), "{:?} is already indexed", key);
        self.positions.insert(key, self.entries.len());
        self.entries.push((key, *world_aabb));
    }

    fn remove(&mut self, key: DrawableKey) -> bool {
        let Some(pos) = self.positions.remove(&key) else {
            return false;
        };
        self.entries.swap_remove(pos);
        if let Some(&(moved, _)) = self.entries.get(pos) {
            self.positions.insert(moved, pos);
        }
        true
    }

    fn update(&mut self, key: DrawableKey, world_aabb: &AABB) {
        let pos = *self.positions.get(&key).unwrap_or_else(|| panic!("{:?} is not indexed", key));
        self.entries[pos].1 = *world_aabb;
    }

    fn query_frustum(&self, frustum: &Frustum, results: &mut Vec<DrawableKey>) {
        results.extend(
            self.entries
                .iter()
                .filter(|(_, aabb)| frustum.intersects_aabb(aabb))
                .map(|(key, _)| *key),
        );
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn shrink(&mut self) -> usize {
        0
    }

    fn check_integrity(&self) -> Result<()> {
        if self.entries.len() != self.positions.len() {
            return Err(pipeline_err!(IntegrityViolation, "pipeline3d::LinearSceneIndex",
                "{} entries but {} positions", self.entries.len(), self.positions.len()));
        }
        for (pos, (key, _)) in self.entries.iter().enumerate() {
            if self.positions.get(key) != Some(&pos) {
                return Err(pipeline_err!(IntegrityViolation, "pipeline3d::LinearSceneIndex",
                    "{:?} stored at {} but mapped elsewhere", key, pos));
            }
        }
        Ok(())
    }
}
