//! Image file extensions accepted for upload.

use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid file type")]
pub struct UnsupportedExtension(pub String);

/// The closed set of extensions the gateway stores.
///
/// Matching is case-sensitive: `photo.PNG` is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageExtension {
    Jpg,
    Jpeg,
    Png,
}

impl ImageExtension {
    /// Extract and validate the extension of an uploaded filename.
    ///
    /// The extension is the trailing `.` followed by one or more ASCII
    /// alphanumerics. Names without one are rejected as well.
    pub fn from_filename(filename: &str) -> Result<Self, UnsupportedExtension> {
        let suffix = filename
            .rfind('.')
            .map(|pos| &filename[pos..])
            .filter(|suffix| {
                suffix.len() > 1 && suffix[1..].bytes().all(|b| b.is_ascii_alphanumeric())
            })
            .unwrap_or("");
        suffix.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageExtension::Jpg => ".jpg",
            ImageExtension::Jpeg => ".jpeg",
            ImageExtension::Png => ".png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageExtension::Jpg | ImageExtension::Jpeg => "image/jpeg",
            ImageExtension::Png => "image/png",
        }
    }
}

impl FromStr for ImageExtension {
    type Err = UnsupportedExtension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ".jpg" => Ok(ImageExtension::Jpg),
            ".jpeg" => Ok(ImageExtension::Jpeg),
            ".png" => Ok(ImageExtension::Png),
            other => Err(UnsupportedExtension(other.to_string())),
        }
    }
}

impl fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ImageExtension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
