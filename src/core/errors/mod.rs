//! Error handling for the dewarping pipeline.

mod types;

pub use types::{DewarpError, DewarpResult, ImageProcessError, ProcessingStage};
