//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Every URL,
//! collection name and field name the pipeline touches lives here, so a
//! second catalog source is a second config file, not a code edit.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_dir = "docs"
//!
//! [cms]
//! api_url = "https://cms.example.org"
//! collection = "iiif_images"
//! fields = ["id", "image.*", "title", "description", ...]
//! status = "published"      # "" disables the status filter
//! page_size = 100           # 0 = one unbounded request
//! # timeout_secs = 30
//!
//! [image_service]
//! base_url = "https://images.example.org/iiif/3"
//! service_type = "ImageService3"
//! profile = "http://iiif.io/api/image/3/level2.json"
//! fetch_dimensions = "auto" # auto | always | never
//! thumbnail_size = "256,"
//! default_format = "image/jpeg"
//!
//! [manifest]
//! public_base_url = "https://manifests.example.org"
//! image_field = "image"
//! slug_source = "filename"  # filename | id
//! motivation = "painting"
//!
//! [[manifest.metadata]]
//! field = "description"
//! label = "Summary"
//!
//! [index]
//! output_file = "index.html"
//! items_per_page = 12       # 0 = single page, no controls
//! count_annotations = true
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [cms]
//! collection = "Historic_England_Raf"
//!
//! [manifest]
//! image_field = "filename"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory that receives manifests and `index.html`.
    pub output_dir: String,
    /// Catalog source (headless CMS).
    pub cms: CmsConfig,
    /// IIIF Image API server.
    pub image_service: ImageServiceConfig,
    /// Manifest assembly settings.
    pub manifest: ManifestConfig,
    /// Index page settings.
    pub index: IndexConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: "docs".to_string(),
            cms: CmsConfig::default(),
            image_service: ImageServiceConfig::default(),
            manifest: ManifestConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate config values are usable before any network call is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation("output_dir must not be empty".into()));
        }
        require_http_url("cms.api_url", &self.cms.api_url)?;
        require_http_url("image_service.base_url", &self.image_service.base_url)?;
        require_http_url("manifest.public_base_url", &self.manifest.public_base_url)?;
        if self.cms.collection.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cms.collection must not be empty".into(),
            ));
        }
        if self.manifest.image_field.trim().is_empty() {
            return Err(ConfigError::Validation(
                "manifest.image_field must not be empty".into(),
            ));
        }
        if self.manifest.motivation.trim().is_empty() {
            return Err(ConfigError::Validation(
                "manifest.motivation must not be empty".into(),
            ));
        }
        if let Some(entry) = self
            .manifest
            .metadata
            .iter()
            .find(|m| m.field.trim().is_empty() || m.label.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "manifest.metadata entries need both field and label (got field={:?}, label={:?})",
                entry.field, entry.label
            )));
        }
        if self.index.output_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "index.output_file must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn require_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{key} must be an http(s) URL, got {value:?}"
        )))
    }
}

/// Catalog source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmsConfig {
    /// Base URL of the CMS API (without `/items`).
    pub api_url: String,
    /// Collection holding the catalog records.
    pub collection: String,
    /// Field selection sent as the `fields` query parameter.
    pub fields: Vec<String>,
    /// Only fetch records with this `status`. Empty string disables the filter.
    pub status: String,
    /// Records per request. `0` issues one unbounded request.
    pub page_size: u32,
    /// Per-request timeout. Absent means no timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://cms.example.org".to_string(),
            collection: "iiif_images".to_string(),
            fields: [
                "id",
                "image.*",
                "title",
                "description",
                "creator",
                "annotations",
                "license",
                "source",
                "attribution",
                "rights",
                "date_created",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            status: "published".to_string(),
            page_size: 100,
            timeout_secs: None,
        }
    }
}

/// When to ask the image server for `info.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionPolicy {
    /// Trust dimensions declared on the record; fetch only when missing.
    Auto,
    /// Always fetch, ignoring declared dimensions.
    Always,
    /// Never fetch; undeclared dimensions become 0×0.
    Never,
}

/// IIIF Image API server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageServiceConfig {
    /// Image API base, e.g. `https://host/iiif/3`. Identifiers are appended.
    pub base_url: String,
    /// `type` of the service descriptor embedded in image bodies.
    pub service_type: String,
    /// Compliance profile URI of the service.
    pub profile: String,
    pub fetch_dimensions: DimensionPolicy,
    /// IIIF size parameter for the manifest thumbnail.
    pub thumbnail_size: String,
    /// MIME type used when a reference declares none.
    pub default_format: String,
}

impl Default for ImageServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://images.example.org/iiif/3".to_string(),
            service_type: "ImageService3".to_string(),
            profile: "http://iiif.io/api/image/3/level2.json".to_string(),
            fetch_dimensions: DimensionPolicy::Auto,
            thumbnail_size: "256,".to_string(),
            default_format: "image/jpeg".to_string(),
        }
    }
}

/// Where the manifest file name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugSource {
    /// Base name of the first image's filename, extension stripped.
    Filename,
    /// The record identifier.
    Id,
}

/// One `(source field, display label)` pair of the manifest metadata list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataField {
    pub field: String,
    pub label: String,
}

impl MetadataField {
    fn new(field: &str, label: &str) -> Self {
        Self {
            field: field.to_string(),
            label: label.to_string(),
        }
    }
}

/// Manifest assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    /// Public URL the output directory is served from.
    pub public_base_url: String,
    /// Record field holding the image reference(s).
    pub image_field: String,
    pub slug_source: SlugSource,
    /// Motivation of the image annotation. Anything but `painting` is suspect.
    pub motivation: String,
    /// Ordered metadata mapping; absent or empty fields are skipped.
    pub metadata: Vec<MetadataField>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            public_base_url: "https://manifests.example.org".to_string(),
            image_field: "image".to_string(),
            slug_source: SlugSource::Filename,
            motivation: "painting".to_string(),
            metadata: vec![
                MetadataField::new("description", "Summary"),
                MetadataField::new("creator", "Creator"),
                MetadataField::new("date_created", "Date Created"),
                MetadataField::new("license", "License"),
                MetadataField::new("source", "Source"),
                MetadataField::new("attribution", "Attribution"),
                MetadataField::new("rights", "Rights"),
            ],
        }
    }
}

/// Index page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// File name of the generated index, excluded from its own listing.
    pub output_file: String,
    /// Hosting control file (matched case-insensitively), never listed.
    pub hosting_control_file: String,
    /// Stylesheet linked from the page, never listed.
    pub stylesheet: String,
    /// Entries per page. `0` renders everything on one page.
    pub items_per_page: usize,
    /// Inspect JSON files for annotation counts.
    pub count_annotations: bool,
    /// Viewer URL prefix; the manifest's public URL is appended.
    pub viewer_url: String,
    pub page_title: String,
    /// Paragraphs shown above the list.
    pub intro: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            output_file: "index.html".to_string(),
            hosting_control_file: "CNAME".to_string(),
            stylesheet: "styles.css".to_string(),
            items_per_page: 12,
            count_annotations: true,
            viewer_url: "https://samvera-labs.github.io/clover-iiif/docs/viewer/demo?iiif-content="
                .to_string(),
            page_title: "Available Manifests".to_string(),
            intro: vec![
                "Welcome to the manifest index.".to_string(),
                "Below is a list of available manifests with links to each file and a demo viewer."
                    .to_string(),
            ],
            repository_url: None,
            footer: None,
        }
    }
}

// =============================================================================
// Loading: stock defaults, then config.toml laid over them
// =============================================================================

/// Stock defaults as a TOML table; the layer a `config.toml` is laid over.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default())
        .expect("stock PipelineConfig serializes to TOML")
}

/// Lay `overlay` over `base`.
///
/// Sections merge key by key. Any other overlay value wins outright, so a
/// user `cms.fields` array or `[[manifest.metadata]]` list replaces the stock
/// one rather than extending it.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(overrides)) => {
            for (key, value) in overrides {
                let value = match merged.remove(&key) {
                    Some(stock) => merge_toml(stock, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, value) => value,
    }
}

/// Parse the config file at `path`. A missing file is `Ok(None)`: the
/// pipeline then runs on stock defaults.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Build the effective [`PipelineConfig`] from the stock layer and an
/// optional user layer. Unknown keys and failed validation are errors.
pub fn resolve_config(
    stock: toml::Value,
    user: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match user {
        Some(user) => merge_toml(stock, user),
        None => stock,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Effective configuration for a run: `path` over stock defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# iiif-static configuration
# =========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory receiving the manifests and the index page.
output_dir = "docs"

# ---------------------------------------------------------------------------
# Catalog source (headless CMS)
# ---------------------------------------------------------------------------
[cms]
# Base URL of the CMS API; records are read from {api_url}/items/{collection}.
api_url = "https://cms.example.org"
collection = "iiif_images"

# Field selection sent with the query.
fields = [
    "id",
    "image.*",
    "title",
    "description",
    "creator",
    "annotations",
    "license",
    "source",
    "attribution",
    "rights",
    "date_created",
]

# Only fetch records with this status. Set to "" to fetch everything.
status = "published"

# Records per request. 0 issues a single unbounded request.
page_size = 100

# Per-request timeout in seconds. Omit for no timeout.
# timeout_secs = 30

# ---------------------------------------------------------------------------
# IIIF Image API server
# ---------------------------------------------------------------------------
[image_service]
base_url = "https://images.example.org/iiif/3"
service_type = "ImageService3"
profile = "http://iiif.io/api/image/3/level2.json"

# auto:   trust width/height declared on the record, fetch info.json otherwise
# always: always fetch info.json
# never:  never fetch; undeclared dimensions become 0x0
fetch_dimensions = "auto"

# IIIF size parameter for the manifest thumbnail.
thumbnail_size = "256,"

# Format used when an image declares no MIME type.
default_format = "image/jpeg"

# ---------------------------------------------------------------------------
# Manifest assembly
# ---------------------------------------------------------------------------
[manifest]
# Public URL the output directory is served from.
public_base_url = "https://manifests.example.org"

# Record field holding the image reference(s): a filename string, a file
# object, or a list of either.
image_field = "image"

# Manifest file name: "filename" (first image, extension stripped) or "id".
slug_source = "filename"

# Annotation motivation for the image. Only "painting" is correct for images.
motivation = "painting"

# Ordered metadata entries. Absent or empty fields are skipped.
[[manifest.metadata]]
field = "description"
label = "Summary"

[[manifest.metadata]]
field = "creator"
label = "Creator"

[[manifest.metadata]]
field = "date_created"
label = "Date Created"

[[manifest.metadata]]
field = "license"
label = "License"

[[manifest.metadata]]
field = "source"
label = "Source"

[[manifest.metadata]]
field = "attribution"
label = "Attribution"

[[manifest.metadata]]
field = "rights"
label = "Rights"

# ---------------------------------------------------------------------------
# Index page
# ---------------------------------------------------------------------------
[index]
output_file = "index.html"

# Never listed: the hosting control file (any case) and the stylesheet.
hosting_control_file = "CNAME"
stylesheet = "styles.css"

# Entries per page. 0 renders a single page without controls.
items_per_page = 12

# Read each JSON file and show its annotation count.
count_annotations = true

# The manifest's public URL is appended to this.
viewer_url = "https://samvera-labs.github.io/clover-iiif/docs/viewer/demo?iiif-content="

page_title = "Available Manifests"
intro = [
    "Welcome to the manifest index.",
    "Below is a list of available manifests with links to each file and a demo viewer.",
]

# repository_url = "https://github.com/you/your-manifests"
# footer = "Your Institution"
"##
}
