/*!
# Scene Pipeline

Asynchronous scene preparation for a three-stage renderer
(logic → prepare → render) with a loose octree culling index.

## Architecture

- **SceneProxy**: logic-side handle; allocates Keys and emits prepare commands
- **SceneMirror**: prepare-owned copy of drawables, cameras and point lights
- **LooseOctree**: dynamic spatial index with incremental move and frustum queries
- **DrawListAssembler**: per-camera culling, produces one snapshot per frame
- **RenderBackend**: trait consumed by the render stage
- **Pipeline**: spawns and joins the prepare and render stage threads

Stages never share mutable state; every cross-stage effect travels through
an ordered command queue.
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod math;
pub mod camera;
pub mod utils;
pub mod handle;
pub mod queue;
pub mod octree;
pub mod scene;
pub mod render;
pub mod pipeline;

// Main pipeline3d namespace module
pub mod pipeline3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Pipeline scheduler
    pub use crate::pipeline::{Pipeline, StageKind, StageReport, StageStatistics};

    // Configuration
    pub use crate::config::{OctreeConfig, PipelineConfig, SceneIndexKind};

    // Logging sub-module (types and functions, macros stay at crate root)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger,
            set_logger, reset_logger, set_max_severity,
        };
    }

    // Handles
    pub mod handle {
        pub use crate::handle::*;
    }

    // Spatial index sub-module
    pub mod octree {
        pub use crate::octree::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Render sub-module
    pub mod render {
        pub use crate::render::*;
    }

    // Math sub-module
    pub mod math {
        pub use crate::math::*;
        pub use crate::camera::*;
    }
}

// Re-export math library at crate root
pub use glam;
