//! Image acquisition: from a page document and its decoded image to the
//! units the generator runs on.
//!
//! At page level a page yields exactly one unit. At region level it yields one
//! unit per top-level text region, then one per top-level table region, each
//! cropped out of the page image. Nothing here modifies the document.

use crate::core::config::OperationLevel;
use crate::core::constants::{BINARIZED_FEATURE, CROPPED_FEATURE, DEWARPED_FEATURE};
use crate::core::errors::{DewarpError, DewarpResult, ProcessingStage};
use crate::dewarp::RunWarning;
use crate::domain::{FeatureFlags, ImageSelection, PageDocument, UnitOwner};
use crate::processors::geometry::Point;
use crate::utils::BBoxCrop;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

/// Flags the page image must carry.
pub const PAGE_IMAGE_SELECTOR: &[&str] = &[BINARIZED_FEATURE];
/// Flags the page image must not carry.
pub const PAGE_IMAGE_FILTER: &[&str] = &[DEWARPED_FEATURE];

/// The page or one region, ready to be dewarped.
#[derive(Clone)]
pub struct ImageUnit {
    pub image: DynamicImage,
    pub owner: UnitOwner,
    /// Flags of the image this unit was taken from.
    pub features: FeatureFlags,
    /// Top-left corner of the unit in original page coordinates.
    pub offset: Point,
}

impl ImageUnit {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl std::fmt::Debug for ImageUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUnit")
            .field("owner", &self.owner)
            .field(
                "image",
                &format_args!("DynamicImage({}x{})", self.width(), self.height()),
            )
            .field("features", &self.features.to_string())
            .field("offset", &self.offset)
            .finish()
    }
}

/// Units of one page plus the warnings raised while collecting them.
#[derive(Debug, Default)]
pub struct Acquisition {
    pub units: Vec<ImageUnit>,
    pub warnings: Vec<RunWarning>,
}

/// Chooses the page image to dewarp: the newest binarized, not yet dewarped one.
///
/// # Errors
///
/// [`DewarpError::InvalidInput`] when no image of the page qualifies.
pub fn select_page_image(doc: &PageDocument, page_id: &str) -> DewarpResult<ImageSelection> {
    doc.primary_image(PAGE_IMAGE_SELECTOR, PAGE_IMAGE_FILTER)
        .ok_or_else(|| {
            DewarpError::invalid_input(format!(
                "page '{page_id}' has no image with flags [{}] and without [{}]",
                PAGE_IMAGE_SELECTOR.join(","),
                PAGE_IMAGE_FILTER.join(",")
            ))
        })
}

/// Brings the decoded page image into the page frame.
///
/// When the page has a border and the selected image is not already
/// cropped, the image is cropped to the border and gains the `cropped`
/// flag. Either way the border's top-left corner becomes the unit offset.
pub fn page_unit(
    doc: &PageDocument,
    selection: &ImageSelection,
    image: DynamicImage,
) -> DewarpResult<ImageUnit> {
    let mut features = selection.features.clone();
    let Some(border) = doc.border() else {
        return Ok(ImageUnit {
            image,
            owner: UnitOwner::Page,
            features,
            offset: Point::new(0.0, 0.0),
        });
    };

    let image = if features.contains(CROPPED_FEATURE) {
        image
    } else {
        let rect = BBoxCrop::crop_rect(image.dimensions(), &border).map_err(|e| {
            DewarpError::processing(
                ProcessingStage::Acquisition,
                format!("page border does not overlap '{}'", selection.filename),
                e,
            )
        })?;
        features = features.with(CROPPED_FEATURE);
        BBoxCrop::slice(&image, rect)
    };

    Ok(ImageUnit {
        image,
        owner: UnitOwner::Page,
        features,
        offset: Point::new(border.x_min().max(0.0).floor(), border.y_min().max(0.0).floor()),
    })
}

/// Splits a page into the units the operation level asks for.
pub fn acquire_units(
    doc: &PageDocument,
    page: ImageUnit,
    level: OperationLevel,
    page_id: &str,
) -> Acquisition {
    match level {
        OperationLevel::Page => Acquisition {
            units: vec![page],
            warnings: Vec::new(),
        },
        OperationLevel::Region => region_units(doc, &page, page_id),
    }
}

fn region_units(doc: &PageDocument, page: &ImageUnit, page_id: &str) -> Acquisition {
    let regions = doc.regions();
    if regions.is_empty() {
        return Acquisition {
            units: Vec::new(),
            warnings: vec![RunWarning::EmptyRegionSet {
                page_id: page_id.to_string(),
            }],
        };
    }

    let mut acquisition = Acquisition::default();
    for region in regions {
        let cropped = region.outline.as_ref().and_then(|outline| {
            let local = outline.translate(-page.offset.x, -page.offset.y);
            BBoxCrop::crop_bounding_box(&page.image, &local).ok()
        });
        let Some((image, rect)) = cropped else {
            acquisition.warnings.push(RunWarning::EmptyRegion {
                page_id: page_id.to_string(),
                region_id: region.id.clone(),
            });
            continue;
        };

        debug!(
            region = %region.id,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "cropped region"
        );
        acquisition.units.push(ImageUnit {
            image,
            owner: region.owner(),
            features: page.features.clone(),
            offset: Point::new(
                page.offset.x + rect.x as f32,
                page.offset.y + rect.y as f32,
            ),
        });
    }
    acquisition
}
