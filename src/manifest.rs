//! Manifest assembly: one catalog record → one IIIF Presentation 3.0 manifest.
//!
//! ## Image references
//!
//! The configured image field may hold any of these shapes, and lists of them:
//!
//! ```text
//! "map.tif"                                             bare filename
//! { "filename_disk": "map.tif", "type": "image/tiff",   CMS file object
//!   "title": "Sheet 1", "width": 4000, "height": 3000 }
//! { "directus_files_id": { "filename_disk": ... } }     many-to-many junction row
//! ```
//!
//! ## Identifiers
//!
//! ```text
//! {public_base}/{slug}.json                                   manifest
//! {public_base}/{slug}.json/canvas/p{n}                       canvas n (1-based)
//! {public_base}/{slug}.json/canvas/p{n}/annotationpage/1
//! {public_base}/{slug}.json/canvas/p{n}/annotationpage/1/annotation/1
//! ```
//!
//! ## Dimensions
//!
//! A failed `info.json` lookup is not fatal: the canvas is written as 0×0,
//! which viewers tolerate.

use crate::catalog::{CatalogRecord, is_blank};
use crate::config::{DimensionPolicy, MetadataField, PipelineConfig, SlugSource};
use crate::iiif::{
    self, Annotation, AnnotationPage, Canvas, ImageBody, Manifest, MetadataEntry,
    ServiceDescriptor, Thumbnail,
};
use crate::image_service::{self, DimensionSource, Dimensions};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// One image attached to a record, normalized from whatever shape the CMS
/// returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Identifier on the image server (the stored filename).
    pub identifier: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// MIME type, if the CMS knows it.
    pub format: Option<String>,
    pub title: Option<String>,
}

impl ImageReference {
    fn bare(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            width: None,
            height: None,
            format: None,
            title: None,
        }
    }
}

/// Normalize an image field into an ordered list of references.
///
/// Unresolvable entries (null, objects without a filename, empty strings)
/// are dropped.
pub fn image_references(value: &Value) -> Vec<ImageReference> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![ImageReference::bare(s.trim())],
        Value::Array(items) => items.iter().flat_map(image_references).collect(),
        Value::Object(obj) => {
            if let Some(inner) = obj.get("directus_files_id") {
                return image_references(inner);
            }
            let identifier = ["filename_disk", "filename", "identifier"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty());
            match identifier {
                Some(identifier) => vec![ImageReference {
                    identifier: identifier.to_string(),
                    width: dimension(obj.get("width")),
                    height: dimension(obj.get("height")),
                    format: non_empty_str(obj.get("type").or_else(|| obj.get("format"))),
                    title: non_empty_str(obj.get("title")),
                }],
                None => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn dimension(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// References held in the record's configured image field.
pub fn record_images(record: &CatalogRecord, config: &PipelineConfig) -> Vec<ImageReference> {
    record
        .field(&config.manifest.image_field)
        .map(image_references)
        .unwrap_or_default()
}

/// File name (without `.json`) the record's manifest is written under.
///
/// `None` when the slug source is the filename and the record has no image.
pub fn manifest_slug(record: &CatalogRecord, config: &PipelineConfig) -> Option<String> {
    let slug = match config.manifest.slug_source {
        SlugSource::Id => record.id.to_string(),
        SlugSource::Filename => {
            let images = record_images(record, config);
            let first = images.first()?;
            Path::new(&first.identifier)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| first.identifier.clone())
        }
    };
    let slug = slug.replace(['/', '\\'], "-");
    (!slug.is_empty()).then_some(slug)
}

/// Public URL of the manifest file.
pub fn manifest_id(public_base_url: &str, slug: &str) -> String {
    format!("{}/{}.json", public_base_url.trim_end_matches('/'), slug)
}

/// Build the manifest for one record.
///
/// Returns `None` (after logging) when the record has no usable image
/// reference. Dimension lookups that fail degrade to 0×0.
pub fn build_manifest(
    record: &CatalogRecord,
    config: &PipelineConfig,
    dimensions: &impl DimensionSource,
) -> Option<Manifest> {
    let images = record_images(record, config);
    if images.is_empty() {
        warn!(
            record = %record.id,
            title = %record.display_title(),
            field = %config.manifest.image_field,
            "record has no image reference, skipping manifest"
        );
        return None;
    }
    let Some(slug) = manifest_slug(record, config) else {
        warn!(record = %record.id, "cannot derive a file name for record, skipping manifest");
        return None;
    };

    let id = manifest_id(&config.manifest.public_base_url, &slug);
    let service = &config.image_service;

    let mut canvases: Vec<Canvas> = images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let size = resolve_dimensions(image, service.fetch_dimensions, dimensions);
            build_canvas(&id, index + 1, image, size, config)
        })
        .collect();

    if let Some(payload) = record.field("annotations")
        && let Some(last) = canvases.last_mut()
    {
        last.annotations = annotation_pages(payload);
    }

    if canvases.is_empty() {
        return None;
    }

    let first_service = image_service::service_url(&service.base_url, &images[0].identifier);
    let thumbnail = Thumbnail {
        id: image_service::image_request_url(&first_service, &service.thumbnail_size),
        kind: "Image".to_string(),
        service: vec![service_descriptor(first_service, config)],
    };

    debug!(record = %record.id, %id, canvases = canvases.len(), "assembled manifest");

    Some(Manifest {
        context: iiif::PRESENTATION_CONTEXT.to_string(),
        id,
        kind: "Manifest".to_string(),
        label: iiif::en(record.display_title()),
        summary: record.description().map(iiif::en),
        items: canvases,
        thumbnail: vec![thumbnail],
        metadata: metadata_entries(record, &config.manifest.metadata),
    })
}

/// Width/height for one image according to the configured policy.
pub fn resolve_dimensions(
    image: &ImageReference,
    policy: DimensionPolicy,
    source: &impl DimensionSource,
) -> Dimensions {
    let declared = Dimensions::from_parts(image.width, image.height);
    match (policy, declared) {
        (DimensionPolicy::Auto, Some(size)) => size,
        (DimensionPolicy::Never, declared) => declared.unwrap_or_else(|| {
            warn!(image = %image.identifier, "no declared dimensions, canvas will be 0x0");
            Dimensions::UNKNOWN
        }),
        _ => match source.dimensions(&image.identifier) {
            Ok(size) => {
                info!(image = %image.identifier, width = size.width, height = size.height, "fetched dimensions");
                size
            }
            Err(e) => {
                warn!(image = %image.identifier, error = %e, "could not determine dimensions, canvas will be 0x0");
                Dimensions::UNKNOWN
            }
        },
    }
}

fn build_canvas(
    manifest_id: &str,
    position: usize,
    image: &ImageReference,
    size: Dimensions,
    config: &PipelineConfig,
) -> Canvas {
    let service = &config.image_service;
    let service_url = image_service::service_url(&service.base_url, &image.identifier);
    let canvas_id = format!("{manifest_id}/canvas/p{position}");
    let page_id = format!("{canvas_id}/annotationpage/1");
    let annotation_id = format!("{page_id}/annotation/1");

    Canvas {
        id: canvas_id.clone(),
        kind: "Canvas".to_string(),
        height: size.height,
        width: size.width,
        label: image.title.clone().map(iiif::en),
        items: vec![AnnotationPage {
            id: page_id,
            kind: "AnnotationPage".to_string(),
            items: vec![Annotation {
                id: annotation_id,
                kind: "Annotation".to_string(),
                motivation: config.manifest.motivation.clone(),
                body: ImageBody {
                    id: image_service::image_request_url(&service_url, "max"),
                    kind: "Image".to_string(),
                    format: image
                        .format
                        .clone()
                        .unwrap_or_else(|| service.default_format.clone()),
                    width: size.width,
                    height: size.height,
                    service: vec![service_descriptor(service_url, config)],
                },
                target: canvas_id,
            }],
        }],
        annotations: Vec::new(),
    }
}

fn service_descriptor(id: String, config: &PipelineConfig) -> ServiceDescriptor {
    ServiceDescriptor {
        id,
        kind: config.image_service.service_type.clone(),
        profile: config.image_service.profile.clone(),
    }
}

/// Annotation payload as a list; a bare object becomes a one-element list.
/// Blank payloads (`""`, `false`, `0`) carry no annotations.
pub fn annotation_pages(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Array(pages) => pages.clone(),
        blank if is_blank(blank) => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Metadata entries for the configured fields present on the record, in
/// configured order.
pub fn metadata_entries(record: &CatalogRecord, fields: &[MetadataField]) -> Vec<MetadataEntry> {
    fields
        .iter()
        .filter_map(|m| {
            record.text_field(&m.field).map(|value| MetadataEntry {
                label: iiif::en(m.label.clone()),
                value: iiif::en(value),
            })
        })
        .collect()
}
