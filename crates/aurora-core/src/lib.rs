//! Aurora core library
//!
//! A multi-stage pipeline of LLM-backed agents that analyzes a user's chat
//! message (intent classification, question-quality critique, response
//! generation, course recommendation) and streams every stage's partial and
//! final results to the caller as an ordered event sequence.
//!
//! Transport framing (HTTP, SSE lines) is the embedding application's
//! concern; this crate only produces the event stream.

pub mod agent;
pub mod ai;
pub mod constants;

pub use agent::events::PipelineEvent;
pub use agent::orchestrator::{PipelineConfig, PipelineOrchestrator};
pub use agent::task::{AgentEvent, AgentSpec, AgentTask};
pub use ai::backend::CompletionBackend;
pub use ai::client::{CallOptions, LlmClient, LlmClientConfig};
pub use ai::types::{ChatMessage, IntentAnalysis, Role, UserContext};
