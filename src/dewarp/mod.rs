//! The dewarping stage: orchestration, output naming, provenance and the run report.

mod identifiers;
mod orchestrator;
mod provenance;
mod report;

pub use identifiers::{output_file_id, unit_file_id};
pub use orchestrator::{ResolvedDevice, SegmentOrchestrator, SegmentOrchestratorBuilder};
pub use provenance::ProvenanceRecorder;
pub use report::{ArtifactKind, ArtifactRecord, RunReport, RunWarning};
