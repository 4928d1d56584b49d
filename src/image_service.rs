//! IIIF Image API addressing and dimension lookup.
//!
//! Every image is addressed by appending its identifier to the configured
//! service base. The URL grammar below is what viewers request, so it must be
//! produced exactly:
//!
//! ```text
//! {base}/{identifier}                          service id
//! {base}/{identifier}/info.json                descriptor (width, height, ...)
//! {base}/{identifier}/full/max/0/default.jpg   full image
//! {base}/{identifier}/full/256,/0/default.jpg  thumbnail
//! ```
//!
//! The [`DimensionSource`] trait is the seam between manifest assembly and the
//! network; [`HttpImageService`] is the production implementation.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ImageServiceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Image server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("info.json for {0} has no usable width/height")]
    MissingDimensions(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Placeholder used when dimensions cannot be determined.
    pub const UNKNOWN: Dimensions = Dimensions {
        width: 0,
        height: 0,
    };

    /// Both sides known and non-zero.
    pub fn from_parts(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        match (width, height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(Dimensions { width, height })
            }
            _ => None,
        }
    }
}

/// Looks up image dimensions by identifier.
pub trait DimensionSource {
    fn dimensions(&self, identifier: &str) -> Result<Dimensions, ImageServiceError>;
}

/// The subset of an Image API `info.json` this pipeline reads.
#[derive(Debug, Deserialize)]
pub struct ImageInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Blocking client for an IIIF Image API server.
pub struct HttpImageService {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpImageService {
    pub fn new(client: reqwest::blocking::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl DimensionSource for HttpImageService {
    fn dimensions(&self, identifier: &str) -> Result<Dimensions, ImageServiceError> {
        let url = info_url(&service_url(&self.base_url, identifier));
        debug!(%url, "fetching image descriptor");

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageServiceError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let info: ImageInfo = response.json()?;
        Dimensions::from_parts(info.width, info.height)
            .ok_or_else(|| ImageServiceError::MissingDimensions(identifier.to_string()))
    }
}

/// Service id for an image: `{base}/{identifier}`.
pub fn service_url(base_url: &str, identifier: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), identifier)
}

/// Descriptor URL: `{service}/info.json`.
pub fn info_url(service_url: &str) -> String {
    format!("{service_url}/info.json")
}

/// Image request for the full region at the given IIIF size (`max`, `256,`, ...).
pub fn image_request_url(service_url: &str, size: &str) -> String {
    format!("{service_url}/full/{size}/0/default.jpg")
}
