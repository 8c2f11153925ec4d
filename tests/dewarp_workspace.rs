//! End-to-end runs of the orchestrator over a directory workspace, with a
//! deterministic engine standing in for the generator.

use image::{GrayImage, Luma};
use oar_dewarp::core::{
    DewarpConfig, DewarpError, InferenceEngine, InputBatch, MIMETYPE_PAGE, OperationLevel,
    OutputGroups, ScoreMap, Tensor4D,
};
use oar_dewarp::dewarp::{
    ResolvedDevice, RunReport, RunWarning, SegmentOrchestrator, SegmentOrchestratorBuilder,
};
use oar_dewarp::domain::{PageDocument, RegionKind, UnitOwner};
use oar_dewarp::utils::encode_png;
use oar_dewarp::workspace::{DirectoryWorkspace, NewFile, Workspace};
use std::path::Path;

const INPUT_GRP: &str = "OCR-D-BIN";
const SOURCE_IMG_GRP: &str = "OCR-D-BIN-IMG";
const OUTPUTS: &str = "OCR-D-DEWARP,OCR-D-IMG-DEWARP";

/// Returns its input, so the dewarped image is the binarized input itself.
struct EchoEngine;

impl InferenceEngine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    fn infer(&self, batch: &InputBatch) -> Result<ScoreMap, DewarpError> {
        ScoreMap::new(batch.tensor().clone())
    }
}

/// Ignores its input and returns mid-gray (`0.0` in generator space).
struct MidGrayEngine;

impl InferenceEngine for MidGrayEngine {
    fn name(&self) -> &str {
        "mid-gray"
    }

    fn infer(&self, batch: &InputBatch) -> Result<ScoreMap, DewarpError> {
        let (h, w) = batch.spatial_size();
        ScoreMap::new(Tensor4D::zeros((1, 3, h, w)))
    }
}

fn page_xml(body: &str) -> String {
    page_xml_for("P1", body)
}

fn page_xml_for(page_id: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<pc:PcGts xmlns:pc="http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15" pcGtsId="{page_id}">
  <pc:Metadata>
    <pc:Creator>scanner</pc:Creator>
  </pc:Metadata>
  <pc:Page imageFilename="OCR-D-IMG/P1.png" imageWidth="64" imageHeight="48">
    <pc:AlternativeImage filename="{SOURCE_IMG_GRP}/P1.png" comments="binarized"/>
{body}
  </pc:Page>
</pc:PcGts>
"#
    )
}

fn stripes(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        Luma([if (x / 4) % 2 == 0 { 0 } else { 255 }])
    })
}

fn halves(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        Luma([if x < width / 2 { 255 } else { 0 }])
    })
}

/// Replaces the binarized source image every page points at.
fn put_source_image(ws: &mut DirectoryWorkspace, image: &GrayImage) {
    ws.add_file(
        NewFile {
            id: "P1",
            file_grp: SOURCE_IMG_GRP,
            page_id: Some("P1"),
            mimetype: "image/png",
            local_path: format!("{SOURCE_IMG_GRP}/P1.png"),
        },
        &encode_png(image).unwrap(),
        true,
    )
    .unwrap();
}

fn add_page(ws: &mut DirectoryWorkspace, number: usize, body: &str) {
    let page_id = format!("P{number}");
    let file_id = format!("{INPUT_GRP}_{number:04}");
    ws.add_file(
        NewFile {
            id: file_id.as_str(),
            file_grp: INPUT_GRP,
            page_id: Some(page_id.as_str()),
            mimetype: MIMETYPE_PAGE,
            local_path: format!("{INPUT_GRP}/{file_id}.xml"),
        },
        page_xml_for(&page_id, body).as_bytes(),
        false,
    )
    .unwrap();
}

fn setup(root: &Path, body: &str) -> DirectoryWorkspace {
    let mut ws = DirectoryWorkspace::create(root).unwrap();
    put_source_image(&mut ws, &stripes(64, 48));
    add_page(&mut ws, 1, body);
    ws
}

fn orchestrator(config: DewarpConfig) -> SegmentOrchestrator<EchoEngine> {
    SegmentOrchestrator::new(config, EchoEngine, ResolvedDevice::cpu()).unwrap()
}

fn config() -> DewarpConfig {
    DewarpConfig::new("models/latest_net_G.onnx").with_target_size(32, 32)
}

fn run(ws: &mut DirectoryWorkspace, config: DewarpConfig) -> RunReport {
    let outputs = OutputGroups::parse(OUTPUTS).unwrap();
    orchestrator(config).process(ws, INPUT_GRP, &outputs).unwrap()
}

fn output_page(ws: &DirectoryWorkspace) -> (Vec<u8>, PageDocument) {
    let file = ws
        .resolve_input_files("OCR-D-DEWARP")
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(file.id, "OCR-D-DEWARP_0001");
    assert_eq!(file.mimetype, MIMETYPE_PAGE);
    let bytes = ws.download(&file).unwrap();
    let doc = PageDocument::from_bytes(&bytes).unwrap();
    (bytes, doc)
}

#[test]
fn test_page_level_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = setup(dir.path(), "");

    let report = run(&mut ws, config());
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.images_written(), 1);
    assert_eq!(report.pages_written(), 1);
    assert!(report.warnings.is_empty());

    let image = ws
        .load_image("OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001.png")
        .unwrap()
        .to_luma8();
    assert_eq!(image.dimensions(), (64, 48));
    assert!(image.pixels().all(|p| p[0] == 0 || p[0] == 255));

    let (_, doc) = output_page(&ws);
    let images = doc.page_alternative_images();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].filename, format!("{SOURCE_IMG_GRP}/P1.png"));
    assert_eq!(images[0].features.to_string(), "binarized");
    assert_eq!(
        images[1].filename,
        "OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001.png"
    );
    assert_eq!(images[1].features.to_string(), "binarized,dewarped");

    let steps = doc.processing_steps();
    assert_eq!(steps.len(), 1);
    assert!(
        steps[0]
            .parameters
            .contains(&("operation_level".to_string(), "page".to_string()))
    );
}

#[test]
fn test_border_is_cropped_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = setup(
        dir.path(),
        r#"    <pc:Border><pc:Coords points="8,8 56,8 56,40 8,40"/></pc:Border>"#,
    );

    run(&mut ws, config());

    let image = ws
        .load_image("OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001.png")
        .unwrap();
    assert_eq!((image.width(), image.height()), (48, 32));
    let (_, doc) = output_page(&ws);
    let images = doc.page_alternative_images();
    assert_eq!(images[1].features.to_string(), "binarized,cropped,dewarped");
}

#[test]
fn test_region_level_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = setup(
        dir.path(),
        r#"    <pc:TextRegion id="R1"><pc:Coords points="4,4 36,4 36,20 4,20"/></pc:TextRegion>"#,
    );

    let report = run(
        &mut ws,
        config().with_operation_level(OperationLevel::Region),
    );
    assert_eq!(report.images_written(), 1);

    let image = ws
        .load_image("OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001_R1.png")
        .unwrap();
    assert_eq!((image.width(), image.height()), (32, 16));

    let (_, doc) = output_page(&ws);
    let region = UnitOwner::Region {
        kind: RegionKind::Text,
        id: "R1".to_string(),
    };
    let images = doc.alternative_images(&region);
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].features.to_string(), "binarized,dewarped");
    assert_eq!(doc.page_alternative_images().len(), 1);
}

#[test]
fn test_region_level_without_regions() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = setup(dir.path(), "");

    let report = run(
        &mut ws,
        config().with_operation_level(OperationLevel::Region),
    );
    assert_eq!(report.images_written(), 0);
    assert_eq!(report.pages_written(), 1);
    assert_eq!(
        report.warnings,
        vec![RunWarning::EmptyRegionSet {
            page_id: "P1".to_string()
        }]
    );
    assert!(ws.resolve_input_files("OCR-D-IMG-DEWARP").unwrap().is_empty());
}

#[test]
fn test_runs_are_deterministic() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let mut ws_a = setup(first.path(), "");
    let mut ws_b = setup(second.path(), "");

    let report_a = run(&mut ws_a, config());
    let report_b = run(&mut ws_b, config());
    assert_eq!(report_a, report_b);

    let (bytes_a, _) = output_page(&ws_a);
    let (bytes_b, _) = output_page(&ws_b);
    assert_eq!(bytes_a, bytes_b);

    let location = "OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001.png";
    assert_eq!(
        ws_a.load_image(location).unwrap().to_luma8(),
        ws_b.load_image(location).unwrap().to_luma8()
    );
}

#[test]
fn test_existing_outputs_and_force() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = setup(dir.path(), "");
    let image_path = dir
        .path()
        .join("OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001.png");

    run(&mut ws, config());
    let (page_before, _) = output_page(&ws);
    let image_before = std::fs::read(&image_path).unwrap();

    // New input content: only a forced run may pick it up.
    put_source_image(&mut ws, &halves(64, 48));

    let report = run(&mut ws, config());
    assert_eq!(report.pages_processed, 0);
    assert_eq!(report.pages_skipped(), 1);
    assert_eq!(report.images_written(), 0);
    assert_eq!(std::fs::read(&image_path).unwrap(), image_before);
    assert_eq!(output_page(&ws).0, page_before);

    let report = run(&mut ws, config().with_force(true));
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.pages_written(), 1);
    assert_eq!(report.images_written(), 1);

    let image_after = ws
        .load_image("OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001.png")
        .unwrap()
        .to_luma8();
    assert_ne!(std::fs::read(&image_path).unwrap(), image_before);
    assert_eq!(image_after.get_pixel(0, 0)[0], 255);
    assert_eq!(image_after.get_pixel(63, 0)[0], 0);
    assert_eq!(
        ws.resolve_input_files("OCR-D-IMG-DEWARP").unwrap().len(),
        1
    );

    let (_, doc) = output_page(&ws);
    assert_eq!(doc.page_alternative_images().len(), 2);
}

#[test]
fn test_empty_region_page_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = setup(dir.path(), "");
    add_page(
        &mut ws,
        2,
        r#"    <pc:TextRegion id="R1"><pc:Coords points="4,4 36,4 36,20 4,20"/></pc:TextRegion>"#,
    );

    let report = run(
        &mut ws,
        config().with_operation_level(OperationLevel::Region),
    );
    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.pages_written(), 2);
    assert_eq!(
        report.warnings,
        vec![RunWarning::EmptyRegionSet {
            page_id: "P1".to_string()
        }]
    );

    let images = ws.resolve_input_files("OCR-D-IMG-DEWARP").unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].id, "OCR-D-IMG-DEWARP_0002_R1");
    assert_eq!(images[0].page_id.as_deref(), Some("P2"));
}

#[test]
fn test_region_scenario_with_mid_gray_generator() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = setup(
        dir.path(),
        r#"    <pc:TextRegion id="R1"><pc:Coords points="4,4 36,4 36,20 4,20"/></pc:TextRegion>"#,
    );

    let orchestrator = SegmentOrchestrator::new(
        config().with_operation_level(OperationLevel::Region),
        MidGrayEngine,
        ResolvedDevice::cpu(),
    )
    .unwrap();
    let outputs = OutputGroups::parse(OUTPUTS).unwrap();
    let report = orchestrator.process(&mut ws, INPUT_GRP, &outputs).unwrap();
    assert_eq!(report.images_written(), 1);
    assert!(report.warnings.is_empty());

    let image = ws
        .load_image("OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001_R1.png")
        .unwrap()
        .to_luma8();
    assert_eq!(image.dimensions(), (32, 16));
    assert!(image.pixels().all(|p| p[0] == 0 || p[0] == 255));

    let (_, doc) = output_page(&ws);
    let images = doc.alternative_images(&UnitOwner::Region {
        kind: RegionKind::Text,
        id: "R1".to_string(),
    });
    assert_eq!(images.len(), 1);
    assert_eq!(
        images[0].filename,
        "OCR-D-IMG-DEWARP/OCR-D-IMG-DEWARP_0001_R1.png"
    );
    assert_eq!(images[0].features.to_string(), "binarized,dewarped");
}

#[test]
fn test_page_without_binarized_image_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = DirectoryWorkspace::create(dir.path()).unwrap();
    let xml = page_xml("").replace(r#"comments="binarized""#, r#"comments="cropped""#);
    ws.add_file(
        NewFile {
            id: "OCR-D-BIN_0001",
            file_grp: INPUT_GRP,
            page_id: Some("P1"),
            mimetype: MIMETYPE_PAGE,
            local_path: format!("{INPUT_GRP}/OCR-D-BIN_0001.xml"),
        },
        xml.as_bytes(),
        false,
    )
    .unwrap();

    let outputs = OutputGroups::parse(OUTPUTS).unwrap();
    let err = orchestrator(config())
        .process(&mut ws, INPUT_GRP, &outputs)
        .unwrap_err();
    assert!(matches!(err, DewarpError::InvalidInput { .. }));
    assert!(ws.resolve_input_files("OCR-D-DEWARP").unwrap().is_empty());
}

#[test]
fn test_missing_model_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let ws = setup(dir.path(), "");
    let files_before = ws.files().len();

    let config = DewarpConfig::new(dir.path().join("missing.onnx"));
    let err = SegmentOrchestratorBuilder::new(config).build().unwrap_err();
    assert!(err.is_fatal_config());
    assert_eq!(ws.files().len(), files_before);
}
