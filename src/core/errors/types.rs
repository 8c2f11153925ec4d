//! Core error types for the dewarping pipeline.
//!
//! This module defines the crate-wide [`DewarpError`] enum and the
//! [`ProcessingStage`] enum used to tag where a processing failure happened.
//! Non-fatal conditions are not errors; see [`crate::dewarp::RunWarning`].

use thiserror::Error;

/// Errors that can occur during image processing operations.
#[derive(Debug, Error)]
pub enum ImageProcessError {
    /// The crop size is invalid (e.g., zero dimensions).
    #[error("Invalid crop size")]
    InvalidCropSize,
    /// The input image is smaller than the requested crop size.
    #[error(
        "Input image ({image_width}, {image_height}) smaller than the target size ({crop_width}, {crop_height})",
        image_width = image_size.0,
        image_height = image_size.1,
        crop_width = crop_size.0,
        crop_height = crop_size.1
    )]
    ImageTooSmall {
        /// The actual size of the image.
        image_size: (u32, u32),
        /// The requested crop size.
        crop_size: (u32, u32),
    },
    /// The crop coordinates are out of bounds.
    #[error("Crop coordinates are out of bounds")]
    CropOutOfBounds,
    /// A polygon could not be parsed from its textual form.
    #[error("Invalid polygon points: '{0}'")]
    InvalidPoints(String),
}

/// Enum representing different stages of the dewarping pipeline.
///
/// Used to identify which stage an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingStage {
    /// Error occurred while acquiring the page or region image.
    Acquisition,
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred during post-processing of the score map.
    PostProcessing,
    /// Error occurred while recording provenance.
    Provenance,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Acquisition => write!(f, "image acquisition"),
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
            ProcessingStage::Provenance => write!(f, "provenance recording"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Enum representing the errors that can occur in the dewarping pipeline.
///
/// [`DewarpError::ModelLoad`] is the fatal configuration error raised before
/// any page is processed. Everything else aborts the page (and thereby the
/// run) it occurs in; artifacts written for earlier pages remain valid.
#[derive(Error, Debug)]
pub enum DewarpError {
    /// Error occurred while decoding or encoding an image.
    #[error("image codec")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during inference.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor shape operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error reading or writing a page document.
    #[error("xml: {message}")]
    Xml {
        /// What was being read or written.
        message: String,
        /// Underlying parser error, if any.
        #[source]
        source: Option<quick_xml::Error>,
    },

    /// Error from the workspace layer (unknown file, bad group, ...).
    #[error("workspace: {message}")]
    Workspace {
        /// A message describing the workspace error.
        message: String,
    },

    /// Error reading or writing the workspace manifest or a parameter file.
    #[error("manifest")]
    Manifest(#[from] serde_json::Error),

    /// Error loading a model file, with context and suggestions.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load
        model_path: String,
        /// Short reason string
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present)
        suggestion: String,
        /// Underlying source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result alias used throughout the crate.
pub type DewarpResult<T> = Result<T, DewarpError>;

impl From<image::ImageError> for DewarpError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for DewarpError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl From<ImageProcessError> for DewarpError {
    fn from(error: ImageProcessError) -> Self {
        Self::Processing {
            kind: ProcessingStage::Generic,
            context: "Image processing failed".to_string(),
            source: Box::new(error),
        }
    }
}

impl From<quick_xml::Error> for DewarpError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Xml {
            message: "malformed document".to_string(),
            source: Some(error),
        }
    }
}

impl DewarpError {
    /// Creates a configuration error for invalid field values.
    ///
    /// # Arguments
    ///
    /// * `field` - The name of the field with an invalid value
    /// * `expected` - Description of what was expected
    /// * `actual` - Description of what was actually provided
    pub fn invalid_field(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ConfigError {
            message: format!(
                "invalid value for field '{}': expected {}, got {}",
                field.into(),
                expected.into(),
                actual.into()
            ),
        }
    }

    /// Creates the fatal error reported when the generator weights cannot be used.
    pub fn model_not_found(model_path: impl Into<String>) -> Self {
        Self::ModelLoad {
            model_path: model_path.into(),
            reason: "file not found".to_string(),
            suggestion: "; make sure the exported generator exists and `model_path` points at it"
                .to_string(),
            source: None,
        }
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a workspace error.
    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace {
            message: message.into(),
        }
    }

    /// Creates a document error without an underlying parser error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an error raised in a given pipeline stage.
    pub fn processing(
        kind: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Returns true for errors that must abort the run before any page is touched.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, Self::ModelLoad { .. } | Self::ConfigError { .. })
    }
}
