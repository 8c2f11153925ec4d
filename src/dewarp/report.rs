//! Run summary and non-fatal warnings.

use serde::Serialize;
use std::fmt;

/// A condition worth reporting that does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// An accelerator was requested but the run fell back to the CPU.
    DeviceUnavailable { requested_gpu_id: i32, reason: String },
    /// Region mode found no text or table regions on a page.
    EmptyRegionSet { page_id: String },
    /// A region's outline does not overlap the page image.
    EmptyRegion { page_id: String, region_id: String },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::DeviceUnavailable {
                requested_gpu_id,
                reason,
            } => write!(
                f,
                "GPU {requested_gpu_id} requested but unavailable ({reason}); running on CPU"
            ),
            RunWarning::EmptyRegionSet { page_id } => {
                write!(f, "page '{page_id}' contains no text or table regions")
            }
            RunWarning::EmptyRegion { page_id, region_id } => write!(
                f,
                "region '{region_id}' on page '{page_id}' lies outside the page image"
            ),
        }
    }
}

/// What a written or skipped artifact was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Image,
    Page,
}

/// One output file touched (or left alone) by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub file_id: String,
    pub file_grp: String,
    /// Workspace-relative location.
    pub location: String,
    /// False when an existing artifact was kept because `force` was off.
    pub written: bool,
}

/// Summary of one processor run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Effective device id (`-1` for the CPU).
    pub gpu_id: i32,
    pub pages_processed: usize,
    pub artifacts: Vec<ArtifactRecord>,
    pub warnings: Vec<RunWarning>,
}

impl RunReport {
    pub fn images_written(&self) -> usize {
        self.count(ArtifactKind::Image, true)
    }

    pub fn images_skipped(&self) -> usize {
        self.count(ArtifactKind::Image, false)
    }

    pub fn pages_written(&self) -> usize {
        self.count(ArtifactKind::Page, true)
    }

    pub fn pages_skipped(&self) -> usize {
        self.count(ArtifactKind::Page, false)
    }

    fn count(&self, kind: ArtifactKind, written: bool) -> usize {
        self.artifacts
            .iter()
            .filter(|a| a.kind == kind && a.written == written)
            .count()
    }

    pub(crate) fn warn(&mut self, warning: RunWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} page(s) processed on {}; images: {} written, {} skipped; pages: {} written, {} skipped; {} warning(s)",
            self.pages_processed,
            if self.gpu_id < 0 {
                "cpu".to_string()
            } else {
                format!("cuda:{}", self.gpu_id)
            },
            self.images_written(),
            self.images_skipped(),
            self.pages_written(),
            self.pages_skipped(),
            self.warnings.len()
        )
    }
}
