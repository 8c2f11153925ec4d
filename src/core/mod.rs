//! The core module of the dewarping pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Tensor and batch types exchanged with the generator
//! - Configuration management
//! - Constants used throughout the pipeline
//! - Error handling
//! - ONNX Runtime integration and device selection
//! - The inference trait the orchestrator is written against

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod traits;

pub use batch::{InputBatch, ScoreMap, Tensor4D};
pub use config::{
    ConfigError, ConfigValidator, DewarpConfig, OperationLevel, OrtExecutionProvider,
    OrtSessionConfig, OutputGroups,
};
pub use constants::*;
pub use errors::{DewarpError, DewarpResult, ImageProcessError, ProcessingStage};
pub use inference::{DeviceSelection, OrtInfer};
pub use traits::InferenceEngine;
