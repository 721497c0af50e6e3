//! Agent pipeline
//!
//! The stage machinery: incremental JSON extraction from streamed model
//! output, parameterized agent tasks, and the orchestrator that runs the
//! fixed stage sequence.

pub mod events;
pub mod extract;
pub mod failure;
pub mod orchestrator;
pub mod stages;
pub mod task;

pub use events::PipelineEvent;
pub use extract::{strip_markdown_fences, ExtractionFailure, JsonStreamExtractor};
pub use failure::StageError;
pub use orchestrator::{PipelineConfig, PipelineOrchestrator};
pub use stages::CourseSummary;
pub use task::{AgentEvent, AgentSpec, AgentTask};
