//! Pipeline orchestration
//!
//! Runs the fixed stage sequence against one backend and streams
//! [`PipelineEvent`]s to the caller: intent analysis, response generation,
//! question critique (only for work-method consultations), then course
//! recommendation. Stage failures degrade to fallback payloads; the
//! pipeline always runs to `Done` unless the caller drops the receiver.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::events::{stage, PipelineEvent};
use super::failure::StageError;
use super::stages::{self, CourseSummary};
use super::task::{AgentEvent, AgentSpec, AgentTask};
use crate::ai::backend::CompletionBackend;
use crate::ai::types::{ChatMessage, IntentAnalysis, UserContext};

/// Pipeline-wide settings.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Pause after each progress label and partial result. Zero by default;
    /// interactive frontends set this to pace their rendering.
    pub progress_step_delay: Duration,
    /// Courses the recommendation stage may draw from.
    pub course_catalog: Vec<CourseSummary>,
}

/// Drives the full stage sequence for one request at a time.
pub struct PipelineOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    config: PipelineConfig,
}

enum StageOutcome {
    Completed(Value),
    /// The stage's event stream ended without a terminal event.
    NoResult,
    /// The caller dropped the receiver; stop without further events.
    CallerGone,
}

impl PipelineOrchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    /// Run the pipeline. Events arrive in stage order; the stream always
    /// ends with [`PipelineEvent::Done`]. Dropping the receiver cancels
    /// the run at the next event boundary.
    pub fn run(self, context: UserContext) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            self.run_inner(context, tx).await;
        });

        rx
    }

    async fn run_inner(self, context: UserContext, tx: mpsc::UnboundedSender<PipelineEvent>) {
        info!("pipeline run started");
        if !emit(&tx, PipelineEvent::started(stage::PIPELINE)) {
            return;
        }

        // Intent analysis feeds every downstream stage.
        let Some(raw_intent) = self
            .run_stage(
                stages::INTENT_ANALYSIS,
                stages::intent_messages(&context),
                stage::INTENT_ANALYSIS,
                &tx,
            )
            .await
        else {
            return;
        };
        let intent = IntentAnalysis::from_value(&raw_intent);
        debug!(
            "intent resolved: {} (confidence {})",
            intent.intent, intent.confidence
        );

        if self
            .run_stage(
                stages::AI_RESPONSE,
                stages::response_messages(&context, &intent),
                stage::AI_RESPONSE,
                &tx,
            )
            .await
            .is_none()
        {
            return;
        }

        // Question critique only applies to work-method consultations.
        if intent.is_work_method() {
            if self
                .run_stage(
                    stages::QUESTION_CRITIQUE,
                    stages::critique_messages(&context, &intent),
                    stage::QUESTION_ANALYSIS,
                    &tx,
                )
                .await
                .is_none()
            {
                return;
            }
        } else if !emit(
            &tx,
            PipelineEvent::skipped(stage::QUESTION_ANALYSIS, "非工作方法类咨询"),
        ) {
            return;
        }

        if self
            .run_stage(
                stages::COURSE_RECOMMENDATION,
                stages::recommendation_messages(&context, &intent, &self.config.course_catalog),
                stage::COURSE_RECOMMENDATION,
                &tx,
            )
            .await
            .is_none()
        {
            return;
        }

        if emit(&tx, PipelineEvent::completed(stage::PIPELINE)) {
            let _ = tx.send(PipelineEvent::Done);
        }
        info!("pipeline run finished");
    }

    /// Run one streaming stage and unwrap its outcome. A stage that ends
    /// without any result is a pipeline-level error: downstream stages
    /// depend on it, so the run terminates with an error and `Done`.
    async fn run_stage(
        &self,
        spec: AgentSpec,
        messages: Vec<ChatMessage>,
        stage_name: &'static str,
        tx: &mpsc::UnboundedSender<PipelineEvent>,
    ) -> Option<Value> {
        match self.drive_stage(spec, messages, stage_name, tx).await {
            StageOutcome::Completed(data) => Some(data),
            StageOutcome::CallerGone => None,
            StageOutcome::NoResult => {
                let error = StageError::MissingDependency(stage_name);
                warn!("aborting run: {}", error);
                if emit(
                    tx,
                    PipelineEvent::Error {
                        stage: stage::PIPELINE,
                        message: error.to_string(),
                    },
                ) {
                    let _ = tx.send(PipelineEvent::Done);
                }
                None
            }
        }
    }

    /// Forward one stage's events, re-tagged with the stage name.
    async fn drive_stage(
        &self,
        spec: AgentSpec,
        messages: Vec<ChatMessage>,
        stage_name: &'static str,
        tx: &mpsc::UnboundedSender<PipelineEvent>,
    ) -> StageOutcome {
        if !emit(tx, PipelineEvent::started(stage_name)) {
            return StageOutcome::CallerGone;
        }

        let task = AgentTask::new(spec).with_step_delay(self.config.progress_step_delay);
        let mut events = task.resolve_streaming(Arc::clone(&self.backend), messages);

        let mut outcome = None;
        while let Some(event) = events.recv().await {
            let forwarded = match event {
                AgentEvent::ProgressLabel(label) => {
                    emit(tx, PipelineEvent::progress_message(stage_name, label))
                }
                AgentEvent::Partial(data) => emit(
                    tx,
                    PipelineEvent::Progress {
                        stage: stage_name,
                        data,
                    },
                ),
                AgentEvent::Final(data) => {
                    outcome = Some(data);
                    break;
                }
                AgentEvent::Error { message, fallback } => {
                    warn!("stage {} degraded to fallback: {}", stage_name, message);
                    if !emit(
                        tx,
                        PipelineEvent::Error {
                            stage: stage_name,
                            message,
                        },
                    ) {
                        return StageOutcome::CallerGone;
                    }
                    outcome = Some(fallback);
                    break;
                }
            };
            if !forwarded {
                return StageOutcome::CallerGone;
            }
        }

        let Some(data) = outcome else {
            return StageOutcome::NoResult;
        };
        if !emit(
            tx,
            PipelineEvent::Result {
                stage: stage_name,
                data: data.clone(),
            },
        ) {
            return StageOutcome::CallerGone;
        }
        if !emit(tx, PipelineEvent::completed(stage_name)) {
            return StageOutcome::CallerGone;
        }
        StageOutcome::Completed(data)
    }

    /// One-shot collection strategy analysis from an intent result. Not
    /// part of the fixed pipeline; callers invoke it on demand.
    pub async fn analyze_collection_strategy(&self, intent: &IntentAnalysis) -> Value {
        let task = AgentTask::new(stages::COLLECTION_STRATEGY);
        task.resolve(self.backend.as_ref(), stages::strategy_messages(intent))
            .await
    }

    /// Streaming collection strategy analysis.
    pub fn collection_strategy_stream(
        &self,
        intent: &IntentAnalysis,
    ) -> mpsc::UnboundedReceiver<AgentEvent> {
        let task = AgentTask::new(stages::COLLECTION_STRATEGY)
            .with_step_delay(self.config.progress_step_delay);
        task.resolve_streaming(Arc::clone(&self.backend), stages::strategy_messages(intent))
    }
}

fn emit(tx: &mpsc::UnboundedSender<PipelineEvent>, event: PipelineEvent) -> bool {
    tx.send(event).is_ok()
}
