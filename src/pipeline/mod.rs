//! Document analysis pipeline: staged runner and run state.

pub mod runner;
pub mod state;

pub use runner::Pipeline;
pub use state::{AnalysisResult, PipelineStatus, RunState};
