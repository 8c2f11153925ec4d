//! Configuration management for the dewarping pipeline.
//!
//! This module provides the run configuration, validation traits and the
//! ONNX Runtime session settings.

pub mod dewarp;
pub mod errors;
pub mod onnx;

// Re-export commonly used types
pub use dewarp::{DewarpConfig, OperationLevel, OutputGroups};
pub use errors::{ConfigError, ConfigValidator};
pub use onnx::*;
