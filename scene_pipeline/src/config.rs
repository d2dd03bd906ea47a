//! Pipeline configuration
//!
//! Plain structs with `Default`; `PipelineConfig::validate` is run by
//! `Pipeline::launch` before any thread is spawned.

use crate::error::Result;
use crate::pipeline_err;

/// Loose octree construction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeConfig {
    /// Half extent of the initial root cube, centered on the origin
    pub root_half_extent: f32,
    /// Nodes whose half size would fall below this are never split
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            root_half_extent: 1.0,
            min_node_size: 0.01,
        }
    }
}

impl OctreeConfig {
    /// Check that both sizes are finite and strictly positive
    pub fn validate(&self) -> Result<()> {
        if !self.root_half_extent.is_finite() || self.root_half_extent <= 0.0 {
            return Err(pipeline_err!(InvalidConfig, "pipeline3d::Config",
                "root_half_extent must be finite and > 0 (got {})", self.root_half_extent));
        }
        if !self.min_node_size.is_finite() || self.min_node_size <= 0.0 {
            return Err(pipeline_err!(InvalidConfig, "pipeline3d::Config",
                "min_node_size must be finite and > 0 (got {})", self.min_node_size));
        }
        Ok(())
    }
}

/// Spatial index used by the prepare stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneIndexKind {
    /// Loose octree culling
    #[default]
    LooseOctree,
    /// Every drawable tested against every camera
    Linear,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Octree parameters (ignored with `SceneIndexKind::Linear`)
    pub octree: OctreeConfig,

    /// Which spatial index the prepare stage builds
    pub scene_index: SceneIndexKind,

    /// Run root contraction after every octree update pass
    pub contract_root_each_frame: bool,

    /// Frames prepared but not yet consumed by the render stage
    pub max_frames_in_flight: usize,

    /// Name of the prepare stage thread
    pub prepare_thread_name: String,

    /// Name of the render stage thread
    pub render_thread_name: String,

    /// Order draw items by (material, mesh)
    pub sort_draw_items: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            octree: OctreeConfig::default(),
            scene_index: SceneIndexKind::default(),
            contract_root_each_frame: true,
            max_frames_in_flight: 1,
            prepare_thread_name: "pipeline-prepare".to_string(),
            render_thread_name: "pipeline-render".to_string(),
            sort_draw_items: true,
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the stages cannot run with
    pub fn validate(&self) -> Result<()> {
        self.octree.validate()?;
        if self.max_frames_in_flight == 0 {
            return Err(pipeline_err!(InvalidConfig, "pipeline3d::Config",
                "max_frames_in_flight must be at least 1"));
        }
        if self.prepare_thread_name.is_empty() || self.render_thread_name.is_empty() {
            return Err(pipeline_err!(InvalidConfig, "pipeline3d::Config",
                "stage thread names must not be empty"));
        }
        if self.prepare_thread_name.contains('\0') || self.render_thread_name.contains('\0') {
            return Err(pipeline_err!(InvalidConfig, "pipeline3d::Config",
                "stage thread names must not contain NUL bytes"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
