//! Run configuration of the dewarping processor.
//!
//! A [`DewarpConfig`] is built once per run, validated, and then passed by
//! reference to every component. Nothing reads configuration from process
//! globals.

use super::errors::{ConfigError, ConfigValidator};
use crate::core::constants::{CPU_GPU_ID, DEFAULT_TARGET_SIZE, FALLBACK_IMAGE_GRP};
use crate::core::errors::{DewarpError, DewarpResult};
use crate::processors::ResizePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Whether whole pages or individual regions are dewarped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationLevel {
    /// Dewarp the page image as a whole.
    #[default]
    Page,
    /// Dewarp every text and table region separately.
    Region,
}

impl OperationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationLevel::Page => "page",
            OperationLevel::Region => "region",
        }
    }
}

impl std::fmt::Display for OperationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationLevel {
    type Err = DewarpError;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level {
            "page" => Ok(OperationLevel::Page),
            "region" => Ok(OperationLevel::Region),
            other => Err(DewarpError::invalid_field(
                "operation_level",
                "page or region",
                other,
            )),
        }
    }
}

/// Configuration of one dewarping run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DewarpConfig {
    /// Path to the exported generator weights.
    pub model_path: PathBuf,
    /// Accelerator index, or `-1` for the CPU path.
    #[serde(default = "DewarpConfig::default_gpu_id")]
    pub gpu_id: i32,
    /// Page or region processing.
    #[serde(default)]
    pub operation_level: OperationLevel,
    /// Resize/crop policy applied before inference.
    #[serde(default, alias = "imgresize")]
    pub resize_or_crop: ResizePolicy,
    /// Load size of the generator (square side used by resizing policies).
    #[serde(default = "DewarpConfig::default_target_size", alias = "resizeHeight")]
    pub target_height: u32,
    /// Fine size of the generator (square side used by cropping policies).
    #[serde(default = "DewarpConfig::default_target_size", alias = "resizeWidth")]
    pub target_width: u32,
    /// Overwrite existing output files.
    #[serde(default)]
    pub force: bool,
}

impl DewarpConfig {
    /// Creates a configuration with default values for the given model.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            gpu_id: Self::default_gpu_id(),
            operation_level: OperationLevel::default(),
            resize_or_crop: ResizePolicy::default(),
            target_height: Self::default_target_size(),
            target_width: Self::default_target_size(),
            force: false,
        }
    }

    /// Reads a JSON parameter file.
    pub fn from_json_file(path: &Path) -> DewarpResult<Self> {
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        Ok(config)
    }

    pub fn with_gpu_id(mut self, gpu_id: i32) -> Self {
        self.gpu_id = gpu_id;
        self
    }

    pub fn with_operation_level(mut self, level: OperationLevel) -> Self {
        self.operation_level = level;
        self
    }

    pub fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.resize_or_crop = policy;
        self
    }

    pub fn with_target_size(mut self, height: u32, width: u32) -> Self {
        self.target_height = height;
        self.target_width = width;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Whether the run was asked to use an accelerator.
    pub fn wants_accelerator(&self) -> bool {
        self.gpu_id > CPU_GPU_ID
    }

    /// Every parameter of the run as `(name, value)` pairs, in a fixed order.
    ///
    /// This is what the processing-step record lists.
    pub fn parameters(&self) -> Vec<(String, String)> {
        vec![
            (
                "model_path".to_string(),
                self.model_path.display().to_string(),
            ),
            ("gpu_id".to_string(), self.gpu_id.to_string()),
            (
                "operation_level".to_string(),
                self.operation_level.to_string(),
            ),
            (
                "resize_or_crop".to_string(),
                self.resize_or_crop.to_string(),
            ),
            ("target_height".to_string(), self.target_height.to_string()),
            ("target_width".to_string(), self.target_width.to_string()),
            ("force".to_string(), self.force.to_string()),
        ]
    }

    fn default_gpu_id() -> i32 {
        CPU_GPU_ID
    }

    fn default_target_size() -> u32 {
        DEFAULT_TARGET_SIZE
    }
}

impl ConfigValidator for DewarpConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.model_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "model_path".to_string(),
            });
        }

        if self.gpu_id < CPU_GPU_ID {
            return Err(ConfigError::InvalidConfig {
                message: format!("gpu_id must be -1 or a device index, got {}", self.gpu_id),
            });
        }

        if self.resize_or_crop != ResizePolicy::None
            && (self.target_height == 0 || self.target_width == 0)
        {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "target_height and target_width must be positive for '{}'",
                    self.resize_or_crop
                ),
            });
        }

        if self.resize_or_crop.crops()
            && self.resize_or_crop != ResizePolicy::Crop
            && self.target_width > self.target_height
        {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "target_width ({}) cannot exceed target_height ({}) when cropping after a resize",
                    self.target_width, self.target_height
                ),
            });
        }

        Ok(())
    }

    fn get_defaults() -> Self {
        Self::new("latest_net_G.onnx")
    }
}

/// Output file groups of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputGroups {
    /// Group receiving the serialized page documents.
    pub page_grp: String,
    /// Group receiving the dewarped images.
    pub image_grp: String,
}

impl OutputGroups {
    /// Parses `"PAGE_GRP,IMG_GRP"`; a single group falls back to
    /// [`FALLBACK_IMAGE_GRP`] for images.
    pub fn parse(groups: &str) -> DewarpResult<Self> {
        let parts: Vec<&str> = groups.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [page] if !page.is_empty() => {
                tracing::info!(
                    "No output file group for images specified, falling back to '{}'",
                    FALLBACK_IMAGE_GRP
                );
                Ok(Self {
                    page_grp: page.to_string(),
                    image_grp: FALLBACK_IMAGE_GRP.to_string(),
                })
            }
            [page, image] if !page.is_empty() && !image.is_empty() => Ok(Self {
                page_grp: page.to_string(),
                image_grp: image.to_string(),
            }),
            _ => Err(DewarpError::invalid_field(
                "output_file_grp",
                "'PAGE_GRP' or 'PAGE_GRP,IMG_GRP'",
                groups,
            )),
        }
    }
}
