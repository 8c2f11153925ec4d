//! Model implementations.
//!
//! Models own an inference session and know their input and output
//! conventions; pipeline stages reach them through
//! [`crate::core::InferenceEngine`].

pub mod pix2pixhd;

pub use pix2pixhd::{GeneratorOptions, Pix2PixHdModel, Pix2PixHdModelBuilder};
