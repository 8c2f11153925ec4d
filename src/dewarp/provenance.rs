//! Lineage records for produced images.

use crate::core::config::DewarpConfig;
use crate::core::constants::{DEWARPED_FEATURE, PROCESSING_STEP, TOOL_NAME};
use crate::core::errors::{DewarpError, DewarpResult, ProcessingStage};
use crate::domain::{AlternativeImage, FeatureFlags, PageDocument, ProcessingStepRecord, UnitOwner};

/// Writes alternative images and the processing-step entry into a page.
#[derive(Debug, Clone)]
pub struct ProvenanceRecorder {
    step: ProcessingStepRecord,
}

impl ProvenanceRecorder {
    /// Recorder for a run with the given (effective) configuration.
    pub fn new(config: &DewarpConfig) -> Self {
        Self {
            step: ProcessingStepRecord {
                step_name: PROCESSING_STEP.to_string(),
                tool_name: TOOL_NAME.to_string(),
                parameters: config.parameters(),
            },
        }
    }

    /// Flags of a dewarped image: the prior flags plus `dewarped`.
    pub fn dewarped_features(prior: &FeatureFlags) -> FeatureFlags {
        prior.with(DEWARPED_FEATURE)
    }

    /// Attaches the image at `location` to its owner and returns the record.
    pub fn record_image(
        &self,
        doc: &mut PageDocument,
        owner: &UnitOwner,
        prior: &FeatureFlags,
        location: &str,
    ) -> DewarpResult<AlternativeImage> {
        let image = AlternativeImage::new(location, Self::dewarped_features(prior));
        doc.attach_alternative_image(owner, &image).map_err(|e| {
            DewarpError::processing(
                ProcessingStage::Provenance,
                format!("cannot attach '{location}' to {owner:?}"),
                e,
            )
        })?;
        Ok(image)
    }

    /// Appends this run's processing step to the page's metadata.
    pub fn record_step(&self, doc: &mut PageDocument) {
        doc.append_metadata(&self.step);
    }

    pub fn step(&self) -> &ProcessingStepRecord {
        &self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_lists_every_parameter() {
        let config = DewarpConfig::new("models/latest_net_G.onnx").with_force(true);
        let recorder = ProvenanceRecorder::new(&config);
        let names: Vec<&str> = recorder
            .step()
            .parameters
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "model_path",
                "gpu_id",
                "operation_level",
                "resize_or_crop",
                "target_height",
                "target_width",
                "force"
            ]
        );
        assert_eq!(recorder.step().step_name, PROCESSING_STEP);
        assert_eq!(recorder.step().tool_name, TOOL_NAME);
    }

    #[test]
    fn test_record_image_and_step() {
        let mut doc = PageDocument::from_image("P1", "IMG/P1.png", 8, 8);
        let recorder = ProvenanceRecorder::new(&DewarpConfig::new("m.onnx"));
        let prior = FeatureFlags::parse("binarized,cropped");

        let record = recorder
            .record_image(&mut doc, &UnitOwner::Page, &prior, "DEWARP/P1.png")
            .unwrap();
        recorder.record_step(&mut doc);

        assert_eq!(record.features.to_string(), "binarized,cropped,dewarped");
        assert_eq!(prior.to_string(), "binarized,cropped");
        assert_eq!(doc.page_alternative_images(), vec![record]);
        assert_eq!(doc.processing_steps().len(), 1);
    }

    #[test]
    fn test_unknown_region_is_a_provenance_error() {
        let mut doc = PageDocument::from_image("P1", "IMG/P1.png", 8, 8);
        let recorder = ProvenanceRecorder::new(&DewarpConfig::new("m.onnx"));
        let owner = UnitOwner::Region {
            kind: crate::domain::RegionKind::Text,
            id: "R404".to_string(),
        };

        let err = recorder
            .record_image(&mut doc, &owner, &FeatureFlags::parse("binarized"), "IMG/x.png")
            .unwrap_err();
        assert!(matches!(
            err,
            DewarpError::Processing {
                kind: ProcessingStage::Provenance,
                ..
            }
        ));
        assert!(doc.page_alternative_images().is_empty());
    }
}
