//! Pipeline scheduler: stage threads, statistics and the Pipeline itself

mod stage;
mod pipeline;

pub use stage::{run_stage, CommandHandler, StageControl, StageReport, StageStatistics};
pub use pipeline::{Pipeline, StageKind};
