/// Per-frame draw list assembly.
///
/// Runs on the prepare stage when a PrepareDrawLists command is drained:
/// 1. Flush pending inserts and moves into the scene index
/// 2. Optionally contract the index
/// 3. For every active camera, refresh its frustum and cull
///
/// The result reflects the mirror exactly as of the triggering command.

use rdst::RadixSort;
use crate::camera::Frustum;
use crate::config::PipelineConfig;
use crate::handle::{Key, ObjectKind};
use crate::math::view_matrix;
use crate::render::{DrawItem, DrawList, FrameDrawLists, PointLightData};
use super::mirror::SceneMirror;
use super::records::{owner_key, DrawableFlags, DrawableKey};

const LOG_SOURCE: &str = "pipeline3d::DrawListAssembler";

/// Counters of the last assembly pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub inserted: usize,
    pub moved: usize,
    pub contracted_levels: usize,
    pub cameras: usize,
    pub visible: usize,
}

/// Builds one FrameDrawLists per PrepareDrawLists command
#[derive(Debug)]
pub struct DrawListAssembler {
    next_frame: u64,
    sort_draw_items: bool,
    contract_root: bool,
    /// Reused query buffer
    visible: Vec<DrawableKey>,
    last_report: AssemblyReport,
}

impl DrawListAssembler {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            next_frame: 0,
            sort_draw_items: config.sort_draw_items,
            contract_root: config.contract_root_each_frame,
            visible: Vec::new(),
            last_report: AssemblyReport::default(),
        }
    }

    /// Frame number the next assembly will carry
    pub fn next_frame(&self) -> u64 {
        self.next_frame
    }

    pub fn last_report(&self) -> AssemblyReport {
        self.last_report
    }

    /// Update the scene index and cull every active camera
    pub fn assemble(&mut self, mirror: &mut SceneMirror) -> FrameDrawLists {
        let mut report = AssemblyReport::default();
        self.update_scene_index(mirror, &mut report);
        if self.contract_root {
            report.contracted_levels = mirror.index.shrink();
        }

        let lights: Vec<PointLightData> = mirror
            .lights
            .iter()
            .enumerate()
            .filter_map(|(slot, light)| light.as_ref().filter(|l| l.active).map(|l| (slot, l)))
            .map(|(slot, light)| PointLightData {
                light: Key::new(ObjectKind::PointLight, slot as u32, light.generation),
                position: light.position,
                color: light.color,
                range: light.range,
            })
            .collect();

        let mut lists = Vec::new();
        for slot in 0..mirror.cameras.len() {
            let Some(camera) = mirror.cameras[slot].as_mut().filter(|c| c.active) else {
                continue;
            };
            let transform = camera.transform;
            let view = view_matrix(transform.position, transform.orientation, transform.scale);
            camera.frustum = Frustum::from_camera(&camera.projection, &view);
            camera.has_moved = false;
            let camera_key = Key::new(ObjectKind::Camera, slot as u32, camera.generation);
            let projection = camera.projection;
            let frustum = camera.frustum;

            self.visible.clear();
            mirror.index.query_frustum(&frustum, &mut self.visible);

            let mut drawables = Vec::with_capacity(self.visible.len());
            for &key in &self.visible {
                let Some(drawable) = mirror.drawables.get(key) else {
                    continue;
                };
                let (Some(mesh), Some(material)) = (drawable.mesh, drawable.material) else {
                    continue;
                };
                let owner_generation = mirror.meshes[drawable.owner_slot as usize]
                    .as_ref()
                    .map_or(0, |m| m.generation);
                drawables.push(DrawItem {
                    owner: owner_key(drawable.owner_slot, owner_generation),
                    drawable: key,
                    mesh,
                    material,
                    transformation: drawable.transformation,
                    local_bounds: drawable.mesh_aabb,
                    world_bounds: drawable.current_aabb,
                });
            }
            if self.sort_draw_items {
                drawables.radix_sort_unstable();
            }

            report.cameras += 1;
            report.visible += drawables.len();
            lists.push(DrawList {
                camera: camera_key,
                view,
                projection,
                lights: lights.clone(),
                drawables,
            });
        }

        let frame = self.next_frame;
        self.next_frame += 1;
        self.last_report = report;
        crate::pipeline_trace!(LOG_SOURCE,
            "Frame {}: {} inserted, {} moved, {} cameras, {} visible",
            frame, report.inserted, report.moved, report.cameras, report.visible);

        FrameDrawLists { frame, lists }
    }

    /// Insert pending drawables and move the ones flagged has-moved
    fn update_scene_index(&mut self, mirror: &mut SceneMirror, report: &mut AssemblyReport) {
        for key in mirror.take_dirty() {
            let Some(drawable) = mirror.drawables.get_mut(key) else {
                continue;
            };
            let flags = drawable.flags;
            drawable.flags.remove(DrawableFlags::PENDING_INSERT | DrawableFlags::HAS_MOVED);
            if !drawable.is_active() {
                continue;
            }
            if flags.contains(DrawableFlags::PENDING_INSERT) {
                drawable.refresh_world_bounds();
                drawable.previous_aabb = drawable.current_aabb;
                mirror.index.insert(key, &drawable.current_aabb);
                report.inserted += 1;
            } else if flags.contains(DrawableFlags::HAS_MOVED) {
                drawable.previous_aabb = drawable.current_aabb;
                drawable.refresh_world_bounds();
                mirror.index.update(key, &drawable.current_aabb);
                report.moved += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "assembler_tests.rs"]
mod tests;
