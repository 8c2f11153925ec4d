//! Execution device selection.

use crate::core::config::{OrtExecutionProvider, OrtSessionConfig};
use crate::core::constants::CPU_GPU_ID;
use tracing::warn;

/// Where the generator runs for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelection {
    /// Device-agnostic CPU path (`gpu_id = -1`).
    Cpu,
    /// CUDA accelerator with the given index.
    Cuda { device_id: i32 },
}

impl DeviceSelection {
    /// Resolves the requested `gpu_id` against what is actually available.
    ///
    /// Returns the selection and, when an accelerator was requested but cannot
    /// be used, the reason the run was downgraded to the CPU path.
    pub fn resolve(gpu_id: i32) -> (Self, Option<String>) {
        if gpu_id <= CPU_GPU_ID {
            return (DeviceSelection::Cpu, None);
        }

        match cuda_available() {
            Ok(true) => (DeviceSelection::Cuda { device_id: gpu_id }, None),
            Ok(false) => {
                let reason = "CUDA execution provider is not available".to_string();
                warn!("{}; falling back to CPU", reason);
                (DeviceSelection::Cpu, Some(reason))
            }
            Err(reason) => {
                warn!("{}; falling back to CPU", reason);
                (DeviceSelection::Cpu, Some(reason))
            }
        }
    }

    /// The `gpu_id` value that describes this selection.
    pub fn gpu_id(&self) -> i32 {
        match self {
            DeviceSelection::Cpu => CPU_GPU_ID,
            DeviceSelection::Cuda { device_id } => *device_id,
        }
    }

    /// Session configuration running on this device.
    pub fn session_config(&self) -> OrtSessionConfig {
        match self {
            DeviceSelection::Cpu => {
                OrtSessionConfig::new().with_execution_providers(vec![OrtExecutionProvider::CPU])
            }
            DeviceSelection::Cuda { device_id } => {
                OrtSessionConfig::new().with_execution_providers(vec![
                    OrtExecutionProvider::CUDA {
                        device_id: Some(*device_id),
                        gpu_mem_limit: None,
                    },
                    OrtExecutionProvider::CPU,
                ])
            }
        }
    }
}

impl std::fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSelection::Cpu => write!(f, "cpu"),
            DeviceSelection::Cuda { device_id } => write!(f, "cuda:{device_id}"),
        }
    }
}

#[cfg(feature = "cuda")]
fn cuda_available() -> Result<bool, String> {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
    CUDAExecutionProvider::default()
        .is_available()
        .map_err(|e| format!("cannot query CUDA execution provider: {e}"))
}

#[cfg(not(feature = "cuda"))]
fn cuda_available() -> Result<bool, String> {
    Err("built without the `cuda` feature".to_string())
}
