//! IIIF Presentation 3.0 document types.
//!
//! Only the subset this pipeline emits is modelled. Field order matches the
//! order properties appear in the written JSON. Every type also deserializes,
//! so a manifest read back from disk compares equal to the one that was
//! written.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/3/context.json";

/// Language-tagged text: `{ "en": ["Title"] }`.
pub type LanguageMap = BTreeMap<String, Vec<String>>;

/// Wrap a single English string.
pub fn en(text: impl Into<String>) -> LanguageMap {
    let mut map = LanguageMap::new();
    map.insert("en".to_string(), vec![text.into()]);
    map
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LanguageMap>,
    pub items: Vec<Canvas>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnail: Vec<Thumbnail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
}

/// One page/surface. `width`/`height` are 0 when the image server could not
/// be asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub height: u32,
    pub width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LanguageMap>,
    pub items: Vec<AnnotationPage>,
    /// Annotation pages passed through verbatim from the catalog record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub items: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub motivation: String,
    pub body: ImageBody,
    pub target: String,
}

/// The image resource painted onto a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBody {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub service: Vec<ServiceDescriptor>,
}

/// Binding of a resource to its IIIF Image API service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub profile: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub service: Vec<ServiceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: LanguageMap,
    pub value: LanguageMap,
}
