//! Interfaces at the seams of the pipeline.

use crate::core::batch::{InputBatch, ScoreMap};
use crate::core::errors::DewarpError;

/// Image-to-image inference: one prepared batch in, one raw score map out.
///
/// The orchestrator only ever talks to the network through this trait, so a
/// deterministic stand-in can replace the real generator. Implementations
/// take `&self`: the model is shared read-only across all pages of a run.
pub trait InferenceEngine: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Runs the network on a single-item batch.
    fn infer(&self, batch: &InputBatch) -> Result<ScoreMap, DewarpError>;
}
