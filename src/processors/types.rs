//! Types used in image processing operations
//!
//! This module defines the enums that describe how an image is brought into
//! the generator's input space.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::DewarpError;

/// Specifies how an image is resized and cropped before inference.
///
/// The names match the generator's data-loader options so that parameter
/// files written for the original tooling keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePolicy {
    /// Resize to a `target_height` square, then centre-crop a `target_width` square
    #[default]
    ResizeAndCrop,
    /// Centre-crop a `target_width` square without resizing
    Crop,
    /// Scale the width to `target_height`, keeping the aspect ratio
    ScaleWidth,
    /// Scale the width to `target_height`, then centre-crop a `target_width` square
    ScaleWidthAndCrop,
    /// Keep the original size
    None,
}

impl ResizePolicy {
    /// Returns the canonical option string of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizePolicy::ResizeAndCrop => "resize_and_crop",
            ResizePolicy::Crop => "crop",
            ResizePolicy::ScaleWidth => "scale_width",
            ResizePolicy::ScaleWidthAndCrop => "scale_width_and_crop",
            ResizePolicy::None => "none",
        }
    }

    /// Whether this policy ends with a square centre crop.
    pub fn crops(&self) -> bool {
        matches!(
            self,
            ResizePolicy::ResizeAndCrop | ResizePolicy::Crop | ResizePolicy::ScaleWidthAndCrop
        )
    }
}

impl std::fmt::Display for ResizePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizePolicy {
    type Err = DewarpError;

    fn from_str(policy: &str) -> Result<Self, Self::Err> {
        match policy {
            "resize_and_crop" => Ok(ResizePolicy::ResizeAndCrop),
            "crop" => Ok(ResizePolicy::Crop),
            "scale_width" => Ok(ResizePolicy::ScaleWidth),
            "scale_width_and_crop" => Ok(ResizePolicy::ScaleWidthAndCrop),
            "none" => Ok(ResizePolicy::None),
            other => Err(DewarpError::invalid_field(
                "resize_or_crop",
                "one of resize_and_crop, crop, scale_width, scale_width_and_crop, none",
                other,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_policy_round_trip_through_str() {
        for policy in [
            ResizePolicy::ResizeAndCrop,
            ResizePolicy::Crop,
            ResizePolicy::ScaleWidth,
            ResizePolicy::ScaleWidthAndCrop,
            ResizePolicy::None,
        ] {
            assert_eq!(policy.as_str().parse::<ResizePolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!("stretch".parse::<ResizePolicy>().is_err());
    }

    #[test]
    fn test_serde_uses_option_names() {
        let json = serde_json::to_string(&ResizePolicy::ScaleWidthAndCrop).unwrap();
        assert_eq!(json, "\"scale_width_and_crop\"");
        let policy: ResizePolicy = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(policy, ResizePolicy::None);
    }
}
