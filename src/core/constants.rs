//! Constants shared across the pipeline.

/// Name under which this processor records itself in page metadata.
pub const TOOL_NAME: &str = "oar-dewarp";

/// Processing step recorded in page metadata.
pub const PROCESSING_STEP: &str = "preprocessing/optimization/dewarping";

/// Image group used when the caller names only a page output group.
pub const FALLBACK_IMAGE_GRP: &str = "OCR-D-IMG-DEWARP";

/// Feature flag added to every image this processor produces.
pub const DEWARPED_FEATURE: &str = "dewarped";

/// Feature flag an input image must already carry.
pub const BINARIZED_FEATURE: &str = "binarized";

/// Feature flag marking an image that is already cropped to the page border.
pub const CROPPED_FEATURE: &str = "cropped";

/// Device selector of the CPU path.
pub const CPU_GPU_ID: i32 = -1;

/// Default load/fine size of the generator.
pub const DEFAULT_TARGET_SIZE: u32 = 1024;

/// Spatial dimensions fed to the generator are rounded to multiples of this.
///
/// The global generator downsamples four times (2^4).
pub const GENERATOR_SIZE_BASE: u32 = 16;

/// MIME type of serialized page documents.
pub const MIMETYPE_PAGE: &str = "application/vnd.prima.page+xml";

/// MIME type of written images.
pub const MIMETYPE_PNG: &str = "image/png";
