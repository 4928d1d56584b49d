//! Manifest generation over the whole catalog.
//!
//! Stage 1 of the build: fetch every catalog record, assemble one manifest
//! per record, write `<output_dir>/<slug>.json`. Strictly sequential: records
//! are processed, and files written, in catalog order.
//!
//! ## Failure handling
//!
//! | Failure                       | Effect                               |
//! |-------------------------------|--------------------------------------|
//! | catalog fetch                 | whole run aborts with an error       |
//! | record without image          | record skipped, run continues        |
//! | `info.json` lookup            | canvas written as 0×0                |
//! | writing one manifest          | logged, reported, run continues      |

use crate::catalog::{self, CatalogError, CatalogSource, HttpCatalog};
use crate::config::PipelineConfig;
use crate::iiif::Manifest;
use crate::image_service::{DimensionSource, HttpImageService};
use crate::manifest::{build_manifest, manifest_slug};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to fetch catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// What happened to one catalog record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Written {
        id: String,
        title: String,
        path: PathBuf,
        canvases: usize,
    },
    /// No usable image reference.
    Skipped { id: String, title: String },
    WriteFailed {
        id: String,
        title: String,
        path: PathBuf,
        error: String,
    },
}

/// Result of a generation run, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl RunReport {
    /// Number of manifests successfully written.
    pub fn generated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Written { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::WriteFailed { .. }))
            .count()
    }
}

/// Run generation against the configured CMS and image server.
pub fn run(config: &PipelineConfig, output_dir: &Path) -> Result<RunReport, PipelineError> {
    let client = catalog::build_client(config.cms.timeout_secs)?;
    let catalog = HttpCatalog::new(client.clone(), config.cms.clone());
    let images = HttpImageService::new(client, config.image_service.base_url.clone());
    run_with_sources(config, output_dir, &catalog, &images)
}

/// Run generation with explicit collaborators (allows testing with mocks).
pub fn run_with_sources(
    config: &PipelineConfig,
    output_dir: &Path,
    catalog: &impl CatalogSource,
    images: &impl DimensionSource,
) -> Result<RunReport, PipelineError> {
    if output_dir.is_dir() {
        info!(dir = %output_dir.display(), "output directory already exists");
    } else {
        fs::create_dir_all(output_dir)?;
        info!(dir = %output_dir.display(), "created output directory");
    }

    if config.manifest.motivation != "painting" {
        warn!(
            motivation = %config.manifest.motivation,
            "image annotations normally use motivation \"painting\"; check manifest.motivation"
        );
    }

    let records = catalog.fetch_records()?;
    info!(
        count = records.len(),
        collection = %config.cms.collection,
        "fetched catalog records"
    );

    let mut report = RunReport {
        fetched: records.len(),
        outcomes: Vec::with_capacity(records.len()),
    };

    for record in &records {
        let id = record.id.to_string();
        let title = record.display_title();

        let built = build_manifest(record, config, images)
            .zip(manifest_slug(record, config));
        let Some((manifest, slug)) = built else {
            report.outcomes.push(RecordOutcome::Skipped { id, title });
            continue;
        };

        let path = output_dir.join(format!("{slug}.json"));
        match write_manifest(&path, &manifest) {
            Ok(()) => {
                info!(record = %id, path = %path.display(), "generated manifest");
                report.outcomes.push(RecordOutcome::Written {
                    id,
                    title,
                    path,
                    canvases: manifest.items.len(),
                });
            }
            Err(e) => {
                error!(record = %id, path = %path.display(), error = %e, "failed to write manifest");
                report.outcomes.push(RecordOutcome::WriteFailed {
                    id,
                    title,
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(generated = report.generated(), "manifest generation complete");
    Ok(report)
}

/// Serialize a manifest as pretty-printed JSON.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json)
}
