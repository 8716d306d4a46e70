//! The retrieval pipeline: stages, routing policy and the orchestrating loop.

pub mod config;
pub mod error;
pub mod progress;
pub mod router;
pub mod runner;
pub mod stage;
pub mod stages;
pub mod state;

pub use config::PipelineConfig;
pub use error::StageError;
pub use progress::{
    BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter, RunEvent, RunEventKind,
};
pub use router::{route, Next, RouteDecision};
pub use runner::{Pipeline, RunReport, StageInvocation, Termination};
pub use stage::StageId;
pub use stages::{fallback_answer, format_block};
pub use state::{PipelineState, StateUpdate, Update};
