//! pix2pixHD generator used for dewarping.
//!
//! The generator is run from an ONNX export of its global network. The
//! test-time options the original checkpoint was trained with are fixed in
//! [`GeneratorOptions`]; only the resize options in
//! [`crate::core::DewarpConfig`] are configurable.

use crate::core::batch::{InputBatch, ScoreMap};
use crate::core::config::OrtSessionConfig;
use crate::core::errors::{DewarpError, DewarpResult};
use crate::core::inference::{DeviceSelection, OrtInfer};
use crate::core::traits::InferenceEngine;
use std::path::Path;
use tracing::{debug, info};

/// Frozen test-time options of the generator.
///
/// Fields are private and there is no mutable access: every run uses the
/// same single-image, unshuffled, unflipped setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    batch_size: usize,
    n_threads: usize,
    serial_batches: bool,
    no_flip: bool,
    label_nc: usize,
    no_instance: bool,
    n_blocks_global: usize,
    n_local_enhancers: usize,
    n_downsample_global: u32,
}

impl GeneratorOptions {
    /// The options every dewarping run uses.
    pub const fn frozen() -> Self {
        Self {
            batch_size: 1,
            n_threads: 1,
            serial_batches: true,
            no_flip: true,
            label_nc: 0,
            no_instance: true,
            n_blocks_global: 10,
            n_local_enhancers: 2,
            n_downsample_global: 4,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    pub fn serial_batches(&self) -> bool {
        self.serial_batches
    }

    pub fn no_flip(&self) -> bool {
        self.no_flip
    }

    pub fn label_nc(&self) -> usize {
        self.label_nc
    }

    pub fn no_instance(&self) -> bool {
        self.no_instance
    }

    pub fn n_blocks_global(&self) -> usize {
        self.n_blocks_global
    }

    pub fn n_local_enhancers(&self) -> usize {
        self.n_local_enhancers
    }

    /// Input sides must be multiples of this for the global generator.
    pub fn size_base(&self) -> u32 {
        1 << self.n_downsample_global
    }

    /// Input channels: RGB image only, no label map or instance channel.
    pub fn input_channels(&self) -> usize {
        if self.label_nc == 0 { 3 } else { self.label_nc }
    }
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self::frozen()
    }
}

/// The dewarping generator on a resolved device.
#[derive(Debug)]
pub struct Pix2PixHdModel {
    inference: OrtInfer,
    device: DeviceSelection,
    options: GeneratorOptions,
}

impl Pix2PixHdModel {
    /// Loads the generator from `weights`.
    ///
    /// # Errors
    ///
    /// [`DewarpError::ModelLoad`] when the file does not exist or cannot be
    /// opened as a model. Callers treat this as fatal.
    pub fn load(
        weights: &Path,
        device: DeviceSelection,
        options: GeneratorOptions,
    ) -> DewarpResult<Self> {
        Pix2PixHdModelBuilder::new()
            .device(device)
            .options(options)
            .build(weights)
    }

    pub fn device(&self) -> DeviceSelection {
        self.device
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Runs the generator on one prepared batch.
    pub fn forward(&self, batch: &InputBatch) -> DewarpResult<ScoreMap> {
        let (height, width) = batch.spatial_size();
        let base = self.options.size_base() as usize;
        if height % base != 0 || width % base != 0 {
            return Err(DewarpError::invalid_input(format!(
                "generator input {width}x{height} is not a multiple of {base}"
            )));
        }

        let output = self
            .inference
            .infer_4d(batch.tensor())
            .map_err(|e| DewarpError::Inference {
                model_name: self.inference.model_name().to_string(),
                context: format!("forward pass on {width}x{height} input"),
                source: Box::new(e),
            })?;
        debug!(shape = ?output.shape(), "generator output");
        ScoreMap::new(output)
    }
}

impl InferenceEngine for Pix2PixHdModel {
    fn name(&self) -> &str {
        self.inference.model_name()
    }

    fn infer(&self, batch: &InputBatch) -> Result<ScoreMap, DewarpError> {
        self.forward(batch)
    }
}

/// Builder for [`Pix2PixHdModel`].
#[derive(Debug, Default)]
pub struct Pix2PixHdModelBuilder {
    device: Option<DeviceSelection>,
    options: Option<GeneratorOptions>,
    ort_config: Option<OrtSessionConfig>,
    model_name: Option<String>,
}

impl Pix2PixHdModelBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the execution device. Defaults to the CPU.
    pub fn device(mut self, device: DeviceSelection) -> Self {
        self.device = Some(device);
        self
    }

    pub fn options(mut self, options: GeneratorOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Overrides the session configuration derived from the device.
    pub fn with_ort_config(mut self, config: OrtSessionConfig) -> Self {
        self.ort_config = Some(config);
        self
    }

    /// Sets the name used in logs and errors.
    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Builds the model from an ONNX file.
    pub fn build(self, weights: &Path) -> DewarpResult<Pix2PixHdModel> {
        if !weights.is_file() {
            return Err(DewarpError::model_not_found(weights.display().to_string()));
        }

        let device = self.device.unwrap_or(DeviceSelection::Cpu);
        let options = self.options.unwrap_or_default();
        let ort_config = self.ort_config.unwrap_or_else(|| device.session_config());
        let model_name = self.model_name.unwrap_or_else(|| "pix2pixhd_generator".to_string());

        let inference = OrtInfer::from_file(weights, model_name, Some(&ort_config))?;
        info!(
            model = inference.model_name(),
            path = %weights.display(),
            device = %device,
            "loaded dewarping generator"
        );

        Ok(Pix2PixHdModel {
            inference,
            device,
            options,
        })
    }
}
