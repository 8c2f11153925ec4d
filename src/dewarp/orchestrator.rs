//! The segment orchestrator.
//!
//! For every page of the input group, strictly in order:
//!
//! 1. read the page document and pick the binarized page image
//! 2. split it into units (the page, or its regions)
//! 3. per unit: prepare the input batch, run the generator, binarize and
//!    resize the result, store it and attach it to the owning node
//! 4. append the processing step and store the page document
//!
//! The generator is loaded once, before the first page, on a device resolved
//! once per run.

use crate::core::config::{ConfigValidator, DewarpConfig, OrtSessionConfig, OutputGroups};
use crate::core::constants::{MIMETYPE_PAGE, TOOL_NAME};
use crate::core::errors::{DewarpError, DewarpResult};
use crate::core::inference::DeviceSelection;
use crate::core::traits::InferenceEngine;
use crate::dewarp::identifiers::{output_file_id, unit_file_id};
use crate::dewarp::provenance::ProvenanceRecorder;
use crate::dewarp::report::{ArtifactKind, ArtifactRecord, RunReport, RunWarning};
use crate::domain::PageDocument;
use crate::models::{GeneratorOptions, Pix2PixHdModel, Pix2PixHdModelBuilder};
use crate::processors::{
    DewarpPostProcessor, ImageUnit, InputPreparer, acquire_units, page_unit, select_page_image,
};
use crate::workspace::{AddOutcome, InputFile, NewFile, Workspace};
use image::{GenericImageView, GrayImage};
use tracing::{debug, info};

/// The device a run uses, plus the warning raised if it is not the one requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    pub selection: DeviceSelection,
    pub warning: Option<RunWarning>,
}

impl ResolvedDevice {
    /// Resolves a requested `gpu_id`, downgrading to the CPU when needed.
    pub fn resolve(requested_gpu_id: i32) -> Self {
        let (selection, reason) = DeviceSelection::resolve(requested_gpu_id);
        Self {
            selection,
            warning: reason.map(|reason| RunWarning::DeviceUnavailable {
                requested_gpu_id,
                reason,
            }),
        }
    }

    pub fn cpu() -> Self {
        Self {
            selection: DeviceSelection::Cpu,
            warning: None,
        }
    }
}

/// Builder for an orchestrator running the pix2pixHD generator.
#[derive(Debug)]
pub struct SegmentOrchestratorBuilder {
    config: DewarpConfig,
    ort_session: Option<OrtSessionConfig>,
}

impl SegmentOrchestratorBuilder {
    pub fn new(config: DewarpConfig) -> Self {
        Self {
            config,
            ort_session: None,
        }
    }

    /// Tunes the ONNX Runtime session.
    ///
    /// Execution providers left unset are filled in from the resolved device.
    pub fn ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.ort_session = Some(config);
        self
    }

    /// Validates the configuration, resolves the device and loads the model.
    ///
    /// # Errors
    ///
    /// Configuration errors and [`DewarpError::ModelLoad`] are fatal: no page
    /// has been touched when they are returned.
    pub fn build(self) -> DewarpResult<SegmentOrchestrator<Pix2PixHdModel>> {
        self.config.validate()?;

        let device = ResolvedDevice::resolve(self.config.gpu_id);
        let mut model_builder = Pix2PixHdModelBuilder::new()
            .device(device.selection)
            .options(GeneratorOptions::frozen());
        if let Some(session) = self.ort_session {
            model_builder = model_builder.with_ort_config(session_for(device.selection, session));
        }
        let model = model_builder.build(&self.config.model_path)?;

        SegmentOrchestrator::new(self.config, model, device)
    }
}

/// Runs dewarping over the pages of a workspace.
#[derive(Debug)]
pub struct SegmentOrchestrator<E: InferenceEngine> {
    /// Configuration with the effective `gpu_id`.
    config: DewarpConfig,
    engine: E,
    device: ResolvedDevice,
    preparer: InputPreparer,
    postprocessor: DewarpPostProcessor,
    provenance: ProvenanceRecorder,
}

impl<E: InferenceEngine> SegmentOrchestrator<E> {
    /// Creates an orchestrator around an already loaded engine.
    pub fn new(config: DewarpConfig, engine: E, device: ResolvedDevice) -> DewarpResult<Self> {
        config.validate()?;
        let config = config.with_gpu_id(device.selection.gpu_id());
        let preparer = InputPreparer::from_config(&config)?;
        let provenance = ProvenanceRecorder::new(&config);
        Ok(Self {
            config,
            engine,
            device,
            preparer,
            postprocessor: DewarpPostProcessor::new(),
            provenance,
        })
    }

    pub fn config(&self) -> &DewarpConfig {
        &self.config
    }

    pub fn device(&self) -> DeviceSelection {
        self.device.selection
    }

    /// Processes every file of `input_grp`.
    ///
    /// Pages are handled one after another. A failing page aborts the run;
    /// artifacts of earlier pages stay in the workspace.
    pub fn process<W: Workspace>(
        &self,
        workspace: &mut W,
        input_grp: &str,
        outputs: &OutputGroups,
    ) -> DewarpResult<RunReport> {
        let mut report = RunReport {
            gpu_id: self.device.selection.gpu_id(),
            ..RunReport::default()
        };
        if let Some(warning) = &self.device.warning {
            report.warn(warning.clone());
        }

        let files = workspace.resolve_input_files(input_grp)?;
        info!(
            tool = TOOL_NAME,
            input_grp,
            page_grp = %outputs.page_grp,
            image_grp = %outputs.image_grp,
            pages = files.len(),
            level = %self.config.operation_level,
            device = %self.device.selection,
            "starting dewarping run"
        );

        for (ordinal, file) in files.iter().enumerate() {
            self.process_page(workspace, file, ordinal, input_grp, outputs, &mut report)?;
        }

        info!("{}", report);
        Ok(report)
    }

    fn process_page<W: Workspace>(
        &self,
        workspace: &mut W,
        file: &InputFile,
        ordinal: usize,
        input_grp: &str,
        outputs: &OutputGroups,
        report: &mut RunReport,
    ) -> DewarpResult<()> {
        let page_id = file.page_id_or_id();
        info!(page_id, file_id = %file.id, "processing page");

        let page_file_id = output_file_id(&file.id, input_grp, &outputs.page_grp, ordinal);
        if !self.config.force && workspace.contains(&outputs.page_grp, &page_file_id) {
            info!(page_id, file_id = %page_file_id, "output exists, skipping page");
            report.artifacts.push(ArtifactRecord {
                kind: ArtifactKind::Page,
                file_id: page_file_id,
                file_grp: outputs.page_grp.clone(),
                location: String::new(),
                written: false,
            });
            return Ok(());
        }

        let mut doc = load_document(workspace, file)?;
        let selection = select_page_image(&doc, page_id)?;
        debug!(page_id, image = %selection.filename, features = %selection.features, "selected page image");
        let image = workspace.load_image(&selection.filename)?;
        let page = page_unit(&doc, &selection, image)?;

        let acquisition = acquire_units(&doc, page, self.config.operation_level, page_id);
        for warning in acquisition.warnings {
            report.warn(warning);
        }

        let image_file_id = output_file_id(&file.id, input_grp, &outputs.image_grp, ordinal);
        for unit in &acquisition.units {
            let dewarped = self.dewarp_unit(unit)?;
            let unit_id = unit_file_id(&image_file_id, &unit.owner);
            let outcome = workspace.save_image(
                &dewarped,
                &unit_id,
                &outputs.image_grp,
                Some(page_id),
                self.config.force,
            )?;
            self.provenance
                .record_image(&mut doc, &unit.owner, &unit.features, outcome.location())?;
            report
                .artifacts
                .push(artifact(ArtifactKind::Image, unit_id, &outputs.image_grp, &outcome));
        }

        self.provenance.record_step(&mut doc);
        let content = doc.to_bytes()?;
        let outcome = workspace.add_file(
            NewFile {
                id: &page_file_id,
                file_grp: &outputs.page_grp,
                page_id: file.page_id.as_deref(),
                mimetype: MIMETYPE_PAGE,
                local_path: format!("{}/{}.xml", outputs.page_grp, page_file_id),
            },
            &content,
            self.config.force,
        )?;
        report
            .artifacts
            .push(artifact(ArtifactKind::Page, page_file_id, &outputs.page_grp, &outcome));
        report.pages_processed += 1;
        Ok(())
    }

    /// Prepare, infer and post-process one unit.
    ///
    /// The result has exactly the unit's dimensions.
    pub fn dewarp_unit(&self, unit: &ImageUnit) -> DewarpResult<GrayImage> {
        let batch = self.preparer.prepare(&unit.image)?;
        let output = self.engine.infer(&batch)?;
        let (width, height) = unit.image.dimensions();
        debug!(
            owner = ?unit.owner,
            engine = self.engine.name(),
            width,
            height,
            "dewarped unit"
        );
        self.postprocessor.apply(&output, width, height)
    }
}

/// Fills in the execution providers of `session` from the resolved device.
fn session_for(device: DeviceSelection, mut session: OrtSessionConfig) -> OrtSessionConfig {
    if session.execution_providers.is_none() {
        session.execution_providers = device.session_config().execution_providers;
    }
    session
}

fn load_document<W: Workspace>(workspace: &W, file: &InputFile) -> DewarpResult<PageDocument> {
    if file.mimetype == MIMETYPE_PAGE {
        return PageDocument::from_bytes(&workspace.download(file)?);
    }
    if file.mimetype.starts_with("image/") {
        let image = workspace.load_image(&file.local_path)?;
        return Ok(PageDocument::from_image(
            file.page_id_or_id(),
            &file.local_path,
            image.width(),
            image.height(),
        ));
    }
    Err(DewarpError::invalid_input(format!(
        "file '{}' has unsupported type '{}'",
        file.id, file.mimetype
    )))
}

fn artifact(kind: ArtifactKind, file_id: String, file_grp: &str, outcome: &AddOutcome) -> ArtifactRecord {
    ArtifactRecord {
        kind,
        file_id,
        file_grp: file_grp.to_string(),
        location: outcome.location().to_string(),
        written: outcome.was_written(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::{InputBatch, ScoreMap};
    use crate::workspace::DirectoryWorkspace;

    struct EchoEngine;

    impl InferenceEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        fn infer(&self, batch: &InputBatch) -> Result<ScoreMap, DewarpError> {
            ScoreMap::new(batch.tensor().clone())
        }
    }

    #[test]
    fn test_resolved_cpu_has_no_warning() {
        assert_eq!(ResolvedDevice::resolve(-1), ResolvedDevice::cpu());
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_gpu_request_without_cuda_falls_back() {
        let device = ResolvedDevice::resolve(0);
        assert_eq!(device.selection, DeviceSelection::Cpu);
        assert!(matches!(
            device.warning,
            Some(RunWarning::DeviceUnavailable {
                requested_gpu_id: 0,
                ..
            })
        ));

        let config = DewarpConfig::new("m.onnx").with_gpu_id(0);
        let orchestrator = SegmentOrchestrator::new(config, EchoEngine, device).unwrap();
        assert_eq!(orchestrator.config().gpu_id, -1);
    }

    #[test]
    fn test_session_override_keeps_device_providers() {
        let session = session_for(
            DeviceSelection::Cpu,
            OrtSessionConfig::new().with_intra_threads(2),
        );
        assert_eq!(session.intra_threads, Some(2));
        assert_eq!(
            session.execution_providers,
            DeviceSelection::Cpu.session_config().execution_providers
        );

        let explicit = OrtSessionConfig::new().with_execution_providers(vec![]);
        assert_eq!(
            session_for(DeviceSelection::Cpu, explicit.clone()),
            explicit
        );
    }

    #[test]
    fn test_missing_model_fails_before_any_page() {
        let config = DewarpConfig::new("/nonexistent/latest_net_G.onnx");
        let err = SegmentOrchestratorBuilder::new(config).build().unwrap_err();
        assert!(err.is_fatal_config());
    }

    #[test]
    fn test_dewarp_unit_keeps_dimensions() {
        let config = DewarpConfig::new("m.onnx").with_target_size(32, 32);
        let orchestrator =
            SegmentOrchestrator::new(config, EchoEngine, ResolvedDevice::cpu()).unwrap();
        let unit = ImageUnit {
            image: image::DynamicImage::ImageLuma8(GrayImage::from_fn(45, 30, |x, _| {
                image::Luma([if x < 20 { 0 } else { 255 }])
            })),
            owner: crate::domain::UnitOwner::Page,
            features: crate::domain::FeatureFlags::parse("binarized"),
            offset: crate::processors::Point::new(0.0, 0.0),
        };
        let out = orchestrator.dewarp_unit(&unit).unwrap();
        assert_eq!(out.dimensions(), (45, 30));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_unsupported_input_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = DirectoryWorkspace::create(dir.path()).unwrap();
        ws.add_file(
            NewFile {
                id: "BIN_0001",
                file_grp: "BIN",
                page_id: Some("P1"),
                mimetype: "text/plain",
                local_path: "BIN/BIN_0001.txt".to_string(),
            },
            b"hello",
            false,
        )
        .unwrap();

        let orchestrator = SegmentOrchestrator::new(
            DewarpConfig::new("m.onnx").with_target_size(32, 32),
            EchoEngine,
            ResolvedDevice::cpu(),
        )
        .unwrap();
        let outputs = OutputGroups::parse("DEWARP,IMG").unwrap();
        let err = orchestrator.process(&mut ws, "BIN", &outputs).unwrap_err();
        assert!(matches!(err, DewarpError::InvalidInput { .. }));
    }
}
