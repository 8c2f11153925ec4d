//! OAR-Dewarp CLI
//!
//! Runs the dewarping stage over one file group of a workspace.
//!
//! # Usage
//!
//! ```bash
//! oar-dewarp --workspace data/ws -I OCR-D-BIN -O OCR-D-DEWARP,OCR-D-IMG-DEWARP \
//!     --model-path models/latest_net_G.onnx
//! oar-dewarp --workspace data/ws -I OCR-D-BIN -O OCR-D-DEWARP -p params.json --gpu-id 0
//! ```

mod cli;
mod config;

use clap::Parser;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "oar-dewarp")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dewarp binarized document images with a pix2pixHD generator", long_about = None)]
pub struct Cli {
    /// Workspace directory (must contain workspace.json)
    #[arg(long, short = 'w', default_value = ".", env = "OAR_WORKSPACE")]
    pub workspace: PathBuf,

    /// Input file group
    #[arg(long = "input-file-grp", short = 'I')]
    pub input_file_grp: String,

    /// Output file groups: PAGE_GRP or PAGE_GRP,IMG_GRP
    #[arg(long = "output-file-grp", short = 'O')]
    pub output_file_grp: String,

    /// JSON parameter file
    #[arg(long = "parameter", short = 'p')]
    pub parameter: Option<PathBuf>,

    /// Path to the generator weights (overrides the parameter file)
    #[arg(long = "model-path", env = "OAR_DEWARP_MODEL")]
    pub model_path: Option<PathBuf>,

    /// Accelerator index, -1 for CPU
    #[arg(long = "gpu-id", allow_negative_numbers = true, env = "OAR_GPU_ID")]
    pub gpu_id: Option<i32>,

    /// page or region
    #[arg(long = "operation-level")]
    pub operation_level: Option<String>,

    /// resize_and_crop, crop, scale_width, scale_width_and_crop or none
    #[arg(long = "resize-or-crop")]
    pub resize_or_crop: Option<String>,

    /// Load size of the generator
    #[arg(long = "target-height")]
    pub target_height: Option<u32>,

    /// Fine size of the generator
    #[arg(long = "target-width")]
    pub target_width: Option<u32>,

    /// ONNX Runtime intra-op threads
    #[arg(long = "intra-threads", env = "OAR_INTRA_THREADS")]
    pub intra_threads: Option<usize>,

    /// Overwrite existing output files
    #[arg(long)]
    pub force: bool,

    /// Output format for the run report (json, pretty)
    #[arg(long, default_value = "pretty")]
    pub output: String,
}

fn main() {
    oar_dewarp::utils::init_tracing();

    let cli = Cli::parse();
    if let Err(e) = cli::run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
