//! Audit orchestration and artifact persistence.

pub mod artifacts;
pub mod orchestrator;

pub use artifacts::{ArtifactFile, ArtifactStore, REPORT_EXTENSION};
pub use orchestrator::{AuditOrchestrator, AuditOutcome};
