//! Directory-backed workspace with a JSON manifest.

use super::{AddOutcome, InputFile, NewFile, Workspace};
use crate::core::constants::MIMETYPE_PNG;
use crate::core::errors::{DewarpError, DewarpResult};
use crate::utils::{encode_png, load_image_from_memory};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the manifest file at the workspace root.
pub const MANIFEST_FILE: &str = "workspace.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    files: Vec<InputFile>,
}

/// A workspace rooted at a directory.
///
/// Files live at `<root>/<local_path>`; the manifest at `<root>/workspace.json`
/// lists them. The manifest is rewritten after every added file.
#[derive(Debug)]
pub struct DirectoryWorkspace {
    root: PathBuf,
    manifest: Manifest,
}

impl DirectoryWorkspace {
    /// Opens an existing workspace.
    pub fn open(root: impl Into<PathBuf>) -> DewarpResult<Self> {
        let root = root.into();
        let manifest_path = root.join(MANIFEST_FILE);
        let content = fs::read(&manifest_path).map_err(|e| {
            DewarpError::workspace(format!(
                "cannot read manifest '{}': {e}",
                manifest_path.display()
            ))
        })?;
        let manifest: Manifest = serde_json::from_slice(&content)?;
        debug!(
            root = %root.display(),
            files = manifest.files.len(),
            "opened workspace"
        );
        Ok(Self { root, manifest })
    }

    /// Creates an empty workspace, creating the directory if needed.
    pub fn create(root: impl Into<PathBuf>) -> DewarpResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let workspace = Self {
            root,
            manifest: Manifest::default(),
        };
        workspace.save_manifest()?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All registered files.
    pub fn files(&self) -> &[InputFile] {
        &self.manifest.files
    }

    /// Absolute path of a workspace-relative location.
    pub fn resolve(&self, location: &str) -> DewarpResult<PathBuf> {
        let relative = Path::new(location);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(DewarpError::workspace(format!(
                "'{location}' is not a path inside the workspace"
            )));
        }
        Ok(self.root.join(relative))
    }

    fn find(&self, file_grp: &str, file_id: &str) -> Option<usize> {
        self.manifest
            .files
            .iter()
            .position(|f| f.file_grp == file_grp && f.id == file_id)
    }

    fn save_manifest(&self) -> DewarpResult<()> {
        let json = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(self.root.join(MANIFEST_FILE), json)?;
        Ok(())
    }
}

impl Workspace for DirectoryWorkspace {
    fn resolve_input_files(&self, file_grp: &str) -> DewarpResult<Vec<InputFile>> {
        Ok(self
            .manifest
            .files
            .iter()
            .filter(|f| f.file_grp == file_grp)
            .cloned()
            .collect())
    }

    fn download(&self, file: &InputFile) -> DewarpResult<Vec<u8>> {
        let path = self.resolve(&file.local_path)?;
        fs::read(&path).map_err(|e| {
            DewarpError::workspace(format!(
                "cannot read '{}' of file '{}': {e}",
                path.display(),
                file.id
            ))
        })
    }

    fn load_image(&self, location: &str) -> DewarpResult<DynamicImage> {
        let path = self.resolve(location)?;
        let bytes = fs::read(&path).map_err(|e| {
            DewarpError::workspace(format!("cannot read image '{}': {e}", path.display()))
        })?;
        load_image_from_memory(&bytes)
    }

    fn contains(&self, file_grp: &str, file_id: &str) -> bool {
        self.find(file_grp, file_id).is_some()
    }

    fn save_image(
        &mut self,
        image: &GrayImage,
        file_id: &str,
        file_grp: &str,
        page_id: Option<&str>,
        force: bool,
    ) -> DewarpResult<AddOutcome> {
        let file = NewFile {
            id: file_id,
            file_grp,
            page_id,
            mimetype: MIMETYPE_PNG,
            local_path: format!("{file_grp}/{file_id}.png"),
        };
        if !force && let Some(idx) = self.find(file_grp, file_id) {
            return Ok(AddOutcome::Skipped(
                self.manifest.files[idx].local_path.clone(),
            ));
        }
        let bytes = encode_png(image)?;
        self.add_file(file, &bytes, force)
    }

    fn add_file(
        &mut self,
        file: NewFile<'_>,
        content: &[u8],
        force: bool,
    ) -> DewarpResult<AddOutcome> {
        let existing = self.find(file.file_grp, file.id);
        if let Some(idx) = existing
            && !force
        {
            let location = self.manifest.files[idx].local_path.clone();
            debug!(file_id = file.id, %location, "keeping existing file");
            return Ok(AddOutcome::Skipped(location));
        }

        let path = self.resolve(&file.local_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;

        let entry = InputFile {
            id: file.id.to_string(),
            file_grp: file.file_grp.to_string(),
            page_id: file.page_id.map(str::to_string),
            mimetype: file.mimetype.to_string(),
            local_path: file.local_path,
        };
        let location = entry.local_path.clone();
        let mut stale_path = None;
        match existing {
            Some(idx) => {
                // A replaced file may have moved; its old copy goes.
                let stale = &self.manifest.files[idx].local_path;
                if *stale != location {
                    stale_path = Some(self.resolve(stale)?);
                }
                self.manifest.files[idx] = entry;
            }
            None => self.manifest.files.push(entry),
        }
        self.save_manifest()?;
        if let Some(stale_path) = stale_path
            && let Err(e) = fs::remove_file(&stale_path)
        {
            warn!(
                file_id = file.id,
                path = %stale_path.display(),
                "cannot remove replaced file: {e}"
            );
        }

        info!(
            file_id = file.id,
            file_grp = file.file_grp,
            location = %path.display(),
            "wrote file"
        );
        Ok(AddOutcome::Written(location))
    }
}
