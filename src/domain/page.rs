//! PAGE-XML document view.
//!
//! [`PageDocument`] wraps an [`XmlDocument`] and exposes only the parts of
//! the page schema this processor reads or extends: the page image, its
//! alternative images and border, the top-level text and table regions, and
//! the metadata log. Everything else in the document is carried through
//! untouched.

use crate::core::errors::{DewarpError, DewarpResult};
use crate::domain::features::FeatureFlags;
use crate::domain::xml::{XmlDocument, XmlElement, XmlNode};
use crate::processors::geometry::BoundingBox;

/// Namespace of the 2019 page content schema.
pub const PAGE_NAMESPACE: &str = "http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15";

/// Kinds of regions the processor dewarps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Text,
    Table,
}

impl RegionKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            RegionKind::Text => "TextRegion",
            RegionKind::Table => "TableRegion",
        }
    }
}

/// Node that owns an image unit and receives its alternative image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOwner {
    Page,
    Region { kind: RegionKind, id: String },
}

impl UnitOwner {
    /// Identifier used in logs and output ids (`None` for the page).
    pub fn region_id(&self) -> Option<&str> {
        match self {
            UnitOwner::Page => None,
            UnitOwner::Region { id, .. } => Some(id),
        }
    }
}

/// A region as seen by the acquisition stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRef {
    pub kind: RegionKind,
    pub id: String,
    /// Outline in page coordinates; `None` when the region has no usable `Coords`.
    pub outline: Option<BoundingBox>,
}

impl RegionRef {
    pub fn owner(&self) -> UnitOwner {
        UnitOwner::Region {
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

/// An `AlternativeImage` record.
#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeImage {
    pub filename: String,
    pub features: FeatureFlags,
}

impl AlternativeImage {
    pub fn new(filename: impl Into<String>, features: FeatureFlags) -> Self {
        Self {
            filename: filename.into(),
            features,
        }
    }

    fn from_element(element: &XmlElement) -> Option<Self> {
        let filename = element.attribute("filename")?;
        let features = FeatureFlags::parse(element.attribute("comments").unwrap_or_default());
        Some(Self::new(filename, features))
    }
}

/// The page image chosen for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSelection {
    pub filename: String,
    pub features: FeatureFlags,
    /// False when the original `imageFilename` was selected.
    pub is_alternative: bool,
}

/// One processing-step entry of the metadata log.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingStepRecord {
    pub step_name: String,
    pub tool_name: String,
    pub parameters: Vec<(String, String)>,
}

impl ProcessingStepRecord {
    fn to_element(&self, name_of: impl Fn(&str) -> String) -> XmlElement {
        let labels = self.parameters.iter().fold(
            XmlElement::new(name_of("Labels")),
            |labels, (name, value)| {
                labels.with_child(
                    XmlElement::new(name_of("Label"))
                        .with_attribute("value", value)
                        .with_attribute("type", name),
                )
            },
        );
        XmlElement::new(name_of("MetadataItem"))
            .with_attribute("type", "processingStep")
            .with_attribute("name", &self.step_name)
            .with_attribute("value", &self.tool_name)
            .with_child(labels)
    }
}

/// A page document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDocument {
    doc: XmlDocument,
}

impl PageDocument {
    /// Parses a serialized page document.
    pub fn from_bytes(bytes: &[u8]) -> DewarpResult<Self> {
        let doc = XmlDocument::parse(bytes)?;
        if doc.root.local_name() != "PcGts" {
            return Err(DewarpError::xml(format!(
                "expected a PcGts root element, found <{}>",
                doc.root.name
            )));
        }
        if doc.root.find_child("Page").is_none() {
            return Err(DewarpError::xml("PcGts has no Page element"));
        }
        Ok(Self { doc })
    }

    /// Creates a fresh document for a bare page image.
    pub fn from_image(pc_gts_id: &str, image_filename: &str, width: u32, height: u32) -> Self {
        let root = XmlElement::new("PcGts")
            .with_attribute("xmlns", PAGE_NAMESPACE)
            .with_attribute("pcGtsId", pc_gts_id)
            .with_child(
                XmlElement::new("Metadata")
                    .with_child(XmlElement::new("Creator")),
            )
            .with_child(
                XmlElement::new("Page")
                    .with_attribute("imageFilename", image_filename)
                    .with_attribute("imageWidth", width.to_string())
                    .with_attribute("imageHeight", height.to_string()),
            );
        Self {
            doc: XmlDocument::new(root),
        }
    }

    /// Serializes the document.
    pub fn to_bytes(&self) -> DewarpResult<Vec<u8>> {
        self.doc.to_bytes()
    }

    fn page(&self) -> &XmlElement {
        // Presence is checked on construction.
        self.doc
            .root
            .find_child("Page")
            .unwrap_or(&self.doc.root)
    }

    fn page_mut(&mut self) -> DewarpResult<&mut XmlElement> {
        self.doc
            .root
            .find_child_mut("Page")
            .ok_or_else(|| DewarpError::xml("PcGts has no Page element"))
    }

    pub fn pc_gts_id(&self) -> Option<&str> {
        self.doc.root.attribute("pcGtsId")
    }

    pub fn image_filename(&self) -> Option<&str> {
        self.page().attribute("imageFilename")
    }

    /// Declared `(imageWidth, imageHeight)` of the original image.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        let width = self.page().attribute("imageWidth")?.parse().ok()?;
        let height = self.page().attribute("imageHeight")?.parse().ok()?;
        Some((width, height))
    }

    /// Page border in original image coordinates, if any.
    pub fn border(&self) -> Option<BoundingBox> {
        let points = self
            .page()
            .find_child("Border")?
            .find_child("Coords")?
            .attribute("points")?;
        BoundingBox::parse_points(points).ok()
    }

    /// Alternative images of the page, oldest first.
    pub fn page_alternative_images(&self) -> Vec<AlternativeImage> {
        alternative_images_of(self.page())
    }

    /// Alternative images of any owner, oldest first.
    pub fn alternative_images(&self, owner: &UnitOwner) -> Vec<AlternativeImage> {
        match owner {
            UnitOwner::Page => self.page_alternative_images(),
            UnitOwner::Region { kind, id } => self
                .page()
                .children_named(kind.element_name())
                .find(|r| r.attribute("id") == Some(id.as_str()))
                .map(alternative_images_of)
                .unwrap_or_default(),
        }
    }

    /// The newest page image whose flags include every `selector` flag and
    /// none of the `filter` flags.
    ///
    /// The original image has no flags, so it only qualifies for an empty selector.
    pub fn primary_image(&self, selector: &[&str], filter: &[&str]) -> Option<ImageSelection> {
        let alternative = self
            .page_alternative_images()
            .into_iter()
            .rev()
            .find(|alt| alt.features.satisfies(selector, filter))
            .map(|alt| ImageSelection {
                filename: alt.filename,
                features: alt.features,
                is_alternative: true,
            });

        alternative.or_else(|| {
            let original = FeatureFlags::new();
            if !original.satisfies(selector, filter) {
                return None;
            }
            self.image_filename().map(|filename| ImageSelection {
                filename: filename.to_string(),
                features: original,
                is_alternative: false,
            })
        })
    }

    /// Top-level text regions followed by top-level table regions, each in document order.
    pub fn regions(&self) -> Vec<RegionRef> {
        [RegionKind::Text, RegionKind::Table]
            .into_iter()
            .flat_map(|kind| {
                self.page()
                    .children_named(kind.element_name())
                    .map(move |region| RegionRef {
                        kind,
                        id: region.attribute("id").unwrap_or_default().to_string(),
                        outline: region
                            .find_child("Coords")
                            .and_then(|c| c.attribute("points"))
                            .and_then(|p| BoundingBox::parse_points(p).ok()),
                    })
            })
            .collect()
    }

    /// Appends an alternative image to the owning node.
    ///
    /// The new element goes after the node's existing alternative images,
    /// which the schema places before all other children. Existing records
    /// are not touched.
    pub fn attach_alternative_image(
        &mut self,
        owner: &UnitOwner,
        image: &AlternativeImage,
    ) -> DewarpResult<()> {
        let page = self.page_mut()?;
        let node = match owner {
            UnitOwner::Page => page,
            UnitOwner::Region { kind, id } => page
                .child_elements_mut()
                .find(|el| {
                    el.local_name() == kind.element_name()
                        && el.attribute("id") == Some(id.as_str())
                })
                .ok_or_else(|| {
                    DewarpError::xml(format!("no {} with id '{}'", kind.element_name(), id))
                })?,
        };

        let element = XmlElement::new(node.sibling_name("AlternativeImage"))
            .with_attribute("filename", &image.filename)
            .with_attribute("comments", image.features.to_string());

        let position = node
            .children
            .iter()
            .rposition(|child| {
                matches!(child, XmlNode::Element(el) if el.local_name() == "AlternativeImage")
            })
            .map_or(0, |idx| idx + 1);
        node.children.insert(position, XmlNode::Element(element));
        Ok(())
    }

    /// Appends a processing-step entry to the metadata log.
    pub fn append_metadata(&mut self, record: &ProcessingStepRecord) {
        let root = &mut self.doc.root;
        if root.find_child("Metadata").is_none() {
            let metadata = XmlElement::new(root.sibling_name("Metadata"));
            root.children.insert(0, XmlNode::Element(metadata));
        }
        if let Some(metadata) = root.find_child_mut("Metadata") {
            let item = record.to_element(|local| metadata.sibling_name(local));
            metadata.children.push(XmlNode::Element(item));
        }
    }

    /// Processing-step entries currently in the metadata log.
    pub fn processing_steps(&self) -> Vec<ProcessingStepRecord> {
        let Some(metadata) = self.doc.root.find_child("Metadata") else {
            return Vec::new();
        };
        metadata
            .children_named("MetadataItem")
            .filter(|item| item.attribute("type") == Some("processingStep"))
            .map(|item| ProcessingStepRecord {
                step_name: item.attribute("name").unwrap_or_default().to_string(),
                tool_name: item.attribute("value").unwrap_or_default().to_string(),
                parameters: item
                    .find_child("Labels")
                    .map(|labels| {
                        labels
                            .children_named("Label")
                            .map(|label| {
                                (
                                    label.attribute("type").unwrap_or_default().to_string(),
                                    label.attribute("value").unwrap_or_default().to_string(),
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect()
    }
}

fn alternative_images_of(node: &XmlElement) -> Vec<AlternativeImage> {
    node.children_named("AlternativeImage")
        .filter_map(AlternativeImage::from_element)
        .collect()
}
