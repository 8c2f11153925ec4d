//! File-group storage the processor reads pages from and writes results to.
//!
//! A workspace holds files organised in named groups (`OCR-D-BIN`,
//! `OCR-D-DEWARP`, ...). Each file has an id that is unique within its group,
//! an optional page id and a MIME type.

mod directory;

pub use directory::{DirectoryWorkspace, MANIFEST_FILE};

use crate::core::errors::DewarpResult;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

/// A file registered in a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    pub id: String,
    pub file_grp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    pub mimetype: String,
    /// Location relative to the workspace root.
    pub local_path: String,
}

impl InputFile {
    /// The page id, or the file id for files not assigned to a page.
    pub fn page_id_or_id(&self) -> &str {
        self.page_id.as_deref().unwrap_or(&self.id)
    }
}

/// A file about to be added to a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile<'a> {
    pub id: &'a str,
    pub file_grp: &'a str,
    pub page_id: Option<&'a str>,
    pub mimetype: &'a str,
    pub local_path: String,
}

/// Result of adding a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The file was (over)written at this location.
    Written(String),
    /// A file with the same id already existed in the group and was left alone.
    Skipped(String),
}

impl AddOutcome {
    /// Workspace-relative location of the file.
    pub fn location(&self) -> &str {
        match self {
            AddOutcome::Written(location) | AddOutcome::Skipped(location) => location,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, AddOutcome::Written(_))
    }
}

/// Storage operations the orchestrator needs.
pub trait Workspace {
    /// Files of a group, in the order they were registered.
    fn resolve_input_files(&self, file_grp: &str) -> DewarpResult<Vec<InputFile>>;

    /// Raw content of a registered file.
    fn download(&self, file: &InputFile) -> DewarpResult<Vec<u8>>;

    /// Decodes the image stored at a workspace-relative location.
    fn load_image(&self, location: &str) -> DewarpResult<DynamicImage>;

    /// Whether `file_grp` already holds a file with this id.
    fn contains(&self, file_grp: &str, file_id: &str) -> bool;

    /// Stores an image and registers it under `file_grp`.
    fn save_image(
        &mut self,
        image: &GrayImage,
        file_id: &str,
        file_grp: &str,
        page_id: Option<&str>,
        force: bool,
    ) -> DewarpResult<AddOutcome>;

    /// Stores `content` and registers it.
    ///
    /// With `force` off an existing file with the same id in the same group
    /// is kept and [`AddOutcome::Skipped`] is returned. With `force` on it is
    /// replaced.
    fn add_file(&mut self, file: NewFile<'_>, content: &[u8], force: bool)
    -> DewarpResult<AddOutcome>;
}
