//! # OAR Dewarp
//!
//! Learned dewarping of binarized document images stored in a
//! page-processing workspace.
//!
//! For every page of an input file group the crate picks the binarized page
//! image, runs it (or each of its text and table regions) through a pix2pixHD
//! generator exported to ONNX, binarizes the result, stores it in an image
//! file group and records it as an alternative image of the page, together
//! with a processing-step entry naming the parameters used.
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, tensors, ONNX Runtime session and device
//! * [`domain`] - Lossless XML tree, PAGE document view and feature flags
//! * [`processors`] - Image acquisition, input preparation and post-processing
//! * [`models`] - The pix2pixHD generator
//! * [`dewarp`] - The segment orchestrator and its run report
//! * [`workspace`] - File-group storage
//! * [`utils`] - Image I/O, cropping and logging setup
//!
//! ## Example
//!
//! ```rust,no_run
//! use oar_dewarp::core::{DewarpConfig, OutputGroups};
//! use oar_dewarp::dewarp::SegmentOrchestratorBuilder;
//! use oar_dewarp::workspace::DirectoryWorkspace;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DewarpConfig::new("models/latest_net_G.onnx");
//! let orchestrator = SegmentOrchestratorBuilder::new(config).build()?;
//!
//! let mut workspace = DirectoryWorkspace::open("data/workspace")?;
//! let outputs = OutputGroups::parse("OCR-D-DEWARP,OCR-D-IMG-DEWARP")?;
//! let report = orchestrator.process(&mut workspace, "OCR-D-BIN", &outputs)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod dewarp;
pub mod domain;
pub mod models;
pub mod processors;
pub mod utils;
pub mod workspace;
