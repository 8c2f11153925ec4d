//! Document model: a lossless XML tree and the page view built on it.

pub mod features;
pub mod page;
pub mod xml;

pub use features::FeatureFlags;
pub use page::{
    AlternativeImage, ImageSelection, PAGE_NAMESPACE, PageDocument, ProcessingStepRecord,
    RegionKind, RegionRef, UnitOwner,
};
pub use xml::{XmlDocument, XmlElement, XmlNode};
