//! ONNX Runtime integration.
//!
//! [`OrtInfer`] owns one session and runs `[N, C, H, W]` tensors through it.
//! [`DeviceSelection`] decides once per run where that session executes.

mod device;
mod ort_infer_config;

pub use device::DeviceSelection;

use crate::core::Tensor4D;
use crate::core::config::OrtSessionConfig;
use crate::core::errors::DewarpError;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// A loaded ONNX session with a single image input and a single image output.
pub struct OrtInfer {
    session: Mutex<Session>,
    model_name: String,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl OrtInfer {
    /// Loads a session from `model_path`.
    ///
    /// Any failure here is reported as [`DewarpError::ModelLoad`].
    pub fn from_file(
        model_path: &Path,
        model_name: impl Into<String>,
        config: Option<&OrtSessionConfig>,
    ) -> Result<Self, DewarpError> {
        let model_name = model_name.into();
        let load_error = |reason: &str, source: ort::Error| DewarpError::ModelLoad {
            model_path: model_path.display().to_string(),
            reason: reason.to_string(),
            suggestion: String::new(),
            source: Some(Box::new(source)),
        };

        let mut builder =
            Session::builder().map_err(|e| load_error("cannot create session builder", e))?;
        if let Some(cfg) = config {
            builder = Self::apply_ort_config(builder, cfg)
                .map_err(|e| load_error("invalid session configuration", e))?;
        }
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| load_error("cannot read model", e))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| DewarpError::ModelLoad {
                model_path: model_path.display().to_string(),
                reason: "model declares no inputs".to_string(),
                suggestion: String::new(),
                source: None,
            })?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| DewarpError::ModelLoad {
                model_path: model_path.display().to_string(),
                reason: "model declares no outputs".to_string(),
                suggestion: String::new(),
                source: None,
            })?;

        debug!(
            "Loaded '{}' from {} (input '{}', output '{}')",
            model_name,
            model_path.display(),
            input_name,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            model_name,
            input_name,
            output_name,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Runs one forward pass.
    pub fn infer_4d(&self, input: &Tensor4D) -> Result<Tensor4D, DewarpError> {
        let input_shape = input.shape().to_vec();
        let tensor = ort::value::Tensor::from_array(input.clone())?;

        let mut session = self.session.lock().map_err(|_| DewarpError::Inference {
            model_name: self.model_name.clone(),
            context: "session lock poisoned".to_string(),
            source: Box::new(ort::Error::new("poisoned session mutex")),
        })?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => tensor])?;
        let (shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let &[n, c, h, w] = dims.as_slice() else {
            return Err(DewarpError::Inference {
                model_name: self.model_name.clone(),
                context: format!(
                    "expected a 4D output for input {:?}, got shape {:?}",
                    input_shape, dims
                ),
                source: Box::new(ort::Error::new("unexpected output rank")),
            });
        };

        Ok(Tensor4D::from_shape_vec((n, c, h, w), data.to_vec())?)
    }
}
