// SPDX-License-Identifier: MIT

//! Query classification and routing workflow
//!
//! A linear pipeline: classify, run whichever processors the classification
//! asks for, then generate the reply. Progress can be observed through an
//! optional event channel.

pub mod classifier;
pub mod models;
pub mod stages;
pub mod state;
pub mod types;
pub mod validate;

use crate::adk::error::{HubError, WorkflowError};
use crate::adk::model::Content;
use crate::agenthub::registry::ToolRegistry;
use crate::agenthub::store::ContentStore;
use classifier::{ClassifierInput, QueryClassifier};
use models::Models;
use serde::Serialize;
use serde_json::Value;
use stages::{
    CodeGenerator, ContentRetriever, DocumentGenerator, DocumentProcessor, ResponseGenerator,
    Stage, WebSearcher,
};
use state::{keys, Step, WorkflowState};
use std::sync::Arc;
use tokio::sync::mpsc;
use types::{Classification, TargetFormat, TaskStatus};

/// Known artifact ids shown to the classifier
const MAX_KNOWN_FILES: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct WorkflowRequest {
    pub message: String,
    /// Prior chat turns, oldest first
    pub history: Vec<Content>,
    /// Uploaded documents attached to this message
    pub document_ids: Vec<String>,
    /// Skip the classifier and use these flags
    pub preset: Option<Classification>,
}

impl WorkflowRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// What a request produced
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub message: String,
    pub canvas_content: Option<String>,
    pub target_format: Option<TargetFormat>,
    pub file_identifier: Option<String>,
    pub task_status: TaskStatus,
}

impl WorkflowOutcome {
    fn from_state(state: &WorkflowState, message: String) -> Self {
        let status = state.task_status.clone();
        let artifact = status.artifact_generated();
        Self {
            message,
            canvas_content: artifact
                .then(|| state.context.get_str(keys::GENERATED_CONTENT).map(str::to_string))
                .flatten(),
            target_format: artifact
                .then_some(status.classification.target_format)
                .flatten(),
            file_identifier: artifact
                .then(|| status.classification.file_identifier.clone())
                .flatten(),
            task_status: status,
        }
    }
}

/// Progress notifications for streaming clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StageStarted { stage: Step },
    StageCompleted { stage: Step },
    StageFailed { stage: Step, message: String },
    Classified { classification: Classification },
    Answer { outcome: WorkflowOutcome },
    Error { message: String },
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StageStarted { .. } => "stage_started",
            Self::StageCompleted { .. } => "stage_completed",
            Self::StageFailed { .. } => "stage_failed",
            Self::Classified { .. } => "classified",
            Self::Answer { .. } => "answer",
            Self::Error { .. } => "error",
        }
    }
}

pub struct Workflow {
    classifier: QueryClassifier,
    stages: Vec<Box<dyn Stage>>,
    responder: ResponseGenerator,
    content: Arc<ContentStore>,
}

impl Workflow {
    pub fn new(
        models: Models,
        registry: ToolRegistry,
        content: Arc<ContentStore>,
        search_k: usize,
    ) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(ContentRetriever::new(content.clone())),
            Box::new(WebSearcher::new(registry.clone())),
            Box::new(DocumentProcessor::new(registry, search_k)),
            Box::new(CodeGenerator::new(models.code.clone(), content.clone())),
            Box::new(DocumentGenerator::new(
                models.document.clone(),
                content.clone(),
            )),
        ];
        Self {
            classifier: QueryClassifier::new(models.main.clone()),
            stages,
            responder: ResponseGenerator::new(models.main),
            content,
        }
    }

    pub async fn run(&self, request: WorkflowRequest) -> Result<WorkflowOutcome, HubError> {
        self.execute(request, None).await
    }

    /// Run while reporting progress on `events`.
    ///
    /// The final `answer` or `error` event is sent here as well; a closed
    /// receiver does not stop the run.
    pub async fn run_stream(
        &self,
        request: WorkflowRequest,
        events: mpsc::Sender<WorkflowEvent>,
    ) -> Result<WorkflowOutcome, HubError> {
        let result = self.execute(request, Some(&events)).await;
        let last = match &result {
            Ok(outcome) => WorkflowEvent::Answer {
                outcome: outcome.clone(),
            },
            Err(e) => WorkflowEvent::Error {
                message: e.to_string(),
            },
        };
        let _ = events.send(last).await;
        result
    }

    async fn execute(
        &self,
        request: WorkflowRequest,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> Result<WorkflowOutcome, HubError> {
        let emit = |event: WorkflowEvent| async move {
            if let Some(tx) = events {
                if tx.send(event).await.is_err() {
                    log::debug!("Workflow event receiver dropped");
                }
            }
        };

        let query = request.message.trim().to_string();
        if query.is_empty() {
            return Err(WorkflowError::EmptyQuery.into());
        }

        let mut state = WorkflowState::new(query, request.history);
        if !request.document_ids.is_empty() {
            state.context.update(
                keys::DOCUMENT_IDS,
                Value::Array(request.document_ids.into_iter().map(Value::String).collect()),
            );
        }
        let has_attachments = !state.context.get_array(keys::DOCUMENT_IDS).is_empty();

        state.current_step = Step::Classify;
        emit(WorkflowEvent::StageStarted {
            stage: Step::Classify,
        })
        .await;
        let mut classification = match request.preset {
            Some(preset) => {
                log::info!("Using preset classification");
                preset.normalized()
            }
            None => {
                let mut known = self.content.identifiers().await;
                known.truncate(MAX_KNOWN_FILES);
                let input = ClassifierInput {
                    message: &state.query,
                    has_attachments,
                    known_files: &known,
                };
                self.classifier.classify(&input).await
            }
        };
        if has_attachments {
            classification.needs_document_processing = true;
        }
        state.task_status = TaskStatus::new(classification.clone());
        emit(WorkflowEvent::Classified { classification }).await;
        emit(WorkflowEvent::StageCompleted {
            stage: Step::Classify,
        })
        .await;

        for stage in &self.stages {
            if !stage.should_run(&state) {
                continue;
            }
            let step = stage.step();
            state.current_step = step;
            log::info!("Running stage {}", step);
            emit(WorkflowEvent::StageStarted { stage: step }).await;

            match stage.run(&mut state).await {
                Ok(()) => emit(WorkflowEvent::StageCompleted { stage: step }).await,
                Err(e) => {
                    let message = e.to_string();
                    state.record_error(step, message.clone());
                    emit(WorkflowEvent::StageFailed {
                        stage: step,
                        message,
                    })
                    .await;
                }
            }
        }

        let step = self.responder.step();
        state.current_step = step;
        emit(WorkflowEvent::StageStarted { stage: step }).await;
        let reply = match self.responder.respond(&mut state).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Response generation failed: {}", e);
                emit(WorkflowEvent::StageFailed {
                    stage: step,
                    message: e.to_string(),
                })
                .await;
                return Err(e);
            }
        };
        emit(WorkflowEvent::StageCompleted { stage: step }).await;
        state.current_step = Step::End;

        Ok(WorkflowOutcome::from_state(&state, reply))
    }
}
