//! Research workflow engine for litscout.
//!
//! A typed state machine that takes a query through existing-docs admission
//! control, discovery, extraction, indexing, synthesis and a quality gate
//! that may loop back to discovery.
//!
//! - [`WorkflowEngine`]: runs one request end to end
//! - [`transition`]: pure branch predicates and the transition table
//! - [`QualityGate`]: 25-point checks and the retry bound
//! - [`ProgressReporter`]: invoke-and-swallow progress reporting
//! - [`RequestRegistry`]: concurrent request tracking with TTL eviction
//! - [`Ingestor`]: bulk ingest of local documents into the knowledge store

pub mod engine;
pub mod indexing;
pub mod ingest;
pub mod progress;
pub mod quality;
pub mod registry;
pub mod result;
pub mod state;
pub mod transition;

pub use engine::WorkflowEngine;
pub use indexing::{Indexed, Indexer};
pub use ingest::{INGEST_EXTENSIONS, IngestReport, Ingestor};
pub use progress::ProgressReporter;
pub use quality::{QualityGate, QualityReport};
pub use registry::{RegistrySink, RequestRecord, RequestRegistry, RequestStatus};
pub use result::{ResearchResult, RunStatus};
pub use state::{RunMetadata, Step, WorkflowState};
pub use transition::{Decision, Route};
