use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::stage::StageId;

/// Events emitted by the pipeline while a run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StageStarted {
        stage: StageId,
        attempt: u32,
    },
    StageFinished {
        stage: StageId,
        error: Option<String>,
    },
    Routed {
        from: StageId,
        to: Option<StageId>,
        budget: u32,
        retry: bool,
    },
    Completed {
        answer: String,
    },
    Terminated {
        stage: StageId,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for tests and one-shot runs.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    StageStarted,
    StageFinished,
    Routed,
    Completed,
    Terminated,
}

/// Serializable form of a [`ProgressEvent`] for streaming to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: RunEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageId>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<u32>,
}

impl RunEvent {
    fn from_progress(run_id: &str, event: ProgressEvent) -> Self {
        let (kind, stage, message, budget) = match event {
            ProgressEvent::StageStarted { stage, attempt } => (
                RunEventKind::StageStarted,
                Some(stage),
                format!("{} (attempt {})", stage.describe(), attempt),
                None,
            ),
            ProgressEvent::StageFinished { stage, error } => (
                RunEventKind::StageFinished,
                Some(stage),
                error.unwrap_or_else(|| "ok".to_string()),
                None,
            ),
            ProgressEvent::Routed {
                from,
                to,
                budget,
                retry,
            } => {
                let target = to.map_or("end".to_string(), |s| s.to_string());
                let message = if retry {
                    format!("retrying via {} after {} failed", target, from)
                } else {
                    format!("{} -> {}", from, target)
                };
                (RunEventKind::Routed, Some(from), message, Some(budget))
            }
            ProgressEvent::Completed { answer } => {
                (RunEventKind::Completed, None, answer, None)
            }
            ProgressEvent::Terminated { stage, error } => {
                (RunEventKind::Terminated, Some(stage), error, None)
            }
        };

        Self {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            kind,
            stage,
            message,
            budget,
        }
    }
}

/// Publishes run events on a broadcast channel.
pub struct BroadcastProgress {
    run_id: String,
    sender: Arc<broadcast::Sender<RunEvent>>,
}

impl BroadcastProgress {
    pub fn new(run_id: &str, sender: Arc<broadcast::Sender<RunEvent>>) -> Self {
        Self {
            run_id: run_id.to_string(),
            sender,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        // No subscribers is fine.
        let _ = self
            .sender
            .send(RunEvent::from_progress(&self.run_id, event));
    }
}
