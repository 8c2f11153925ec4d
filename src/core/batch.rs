//! Tensors exchanged with the generator.

use crate::core::errors::DewarpError;
use ndarray::Array4;

/// A `[N, C, H, W]` float tensor.
pub type Tensor4D = Array4<f32>;

/// The single-item batch fed to the generator.
///
/// Only [`InputBatch::single`] creates one, so a batch never holds more than
/// one image.
#[derive(Debug, Clone)]
pub struct InputBatch {
    tensor: Tensor4D,
}

impl InputBatch {
    /// Wraps a `[1, 3, H, W]` tensor.
    pub fn single(tensor: Tensor4D) -> Result<Self, DewarpError> {
        let shape = tensor.shape();
        if shape[0] != 1 || shape[1] != 3 {
            return Err(DewarpError::invalid_input(format!(
                "generator input must be [1, 3, H, W], got {shape:?}"
            )));
        }
        Ok(Self { tensor })
    }

    pub fn tensor(&self) -> &Tensor4D {
        &self.tensor
    }

    /// `(height, width)` of the prepared image.
    pub fn spatial_size(&self) -> (usize, usize) {
        let shape = self.tensor.shape();
        (shape[2], shape[3])
    }
}

/// Raw generator output: `[1, C, H, W]` with `C` of 1 or 3, values nominally in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct ScoreMap {
    tensor: Tensor4D,
}

impl ScoreMap {
    pub fn new(tensor: Tensor4D) -> Result<Self, DewarpError> {
        let shape = tensor.shape();
        if shape[0] < 1 || !(shape[1] == 1 || shape[1] == 3) || shape[2] == 0 || shape[3] == 0 {
            return Err(DewarpError::invalid_input(format!(
                "score map must be [1, 1|3, H, W] with a non-empty image, got {shape:?}"
            )));
        }
        Ok(Self { tensor })
    }

    pub fn tensor(&self) -> &Tensor4D {
        &self.tensor
    }

    pub fn channels(&self) -> usize {
        self.tensor.shape()[1]
    }
}
