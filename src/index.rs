//! Static HTML index of the output directory.
//!
//! Stage 2 of the build. Lists the immediate entries of the output directory
//! (manifests, and anything else that was put there) as a paginated page.
//!
//! ## What gets listed
//!
//! Everything except the hosting control file (`CNAME`, any case), the
//! stylesheet and the index file itself. JSON files are opened to show their
//! title and annotation count; a file that cannot be read or parsed is still
//! listed, just without either.
//!
//! ## Pagination
//!
//! All list items are rendered up front and split into pages. Page 0 is
//! written into the list; every page is embedded as a JSON array in an inline
//! script that swaps the list contents. Switching pages never touches the
//! server.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating,
//! so names and titles taken from files are escaped automatically.

use crate::catalog::is_blank;
use crate::config::{IndexConfig, PipelineConfig};
use chrono::{DateTime, Local};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Output directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One listed directory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub name: String,
    pub is_dir: bool,
    /// Creation time, or modification time where the filesystem has no birth time.
    pub created: Option<DateTime<Local>>,
    /// `None` for directories.
    pub size_bytes: Option<u64>,
    /// Manifest title; empty when unknown.
    pub title: String,
    pub annotation_count: usize,
}

/// A rendered index page and what went into it.
#[derive(Debug, Clone)]
pub struct IndexDocument {
    pub html: String,
    pub entries: Vec<IndexEntry>,
    pub page_count: usize,
}

const EMPTY_STATE: &str = "No manifests found at this time.";

/// Whether a file name is never listed.
pub fn is_reserved(name: &str, config: &IndexConfig) -> bool {
    name.eq_ignore_ascii_case(&config.hosting_control_file)
        || name == config.stylesheet
        || name == config.output_file
}

/// Read the listable entries of `dir`, sorted by name.
pub fn scan_entries(dir: &Path, config: &IndexConfig) -> Result<Vec<IndexEntry>, IndexError> {
    if !dir.is_dir() {
        return Err(IndexError::MissingDirectory(dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_reserved(&name, config) {
            continue;
        }
        let metadata = entry.metadata()?;
        let is_dir = metadata.is_dir();
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .map(DateTime::<Local>::from);

        let summary = if !is_dir && name.ends_with(".json") {
            summarize_file(&entry.path(), config.count_annotations)
        } else {
            ManifestSummary::default()
        };

        entries.push(IndexEntry {
            name,
            is_dir,
            created,
            size_bytes: (!is_dir).then_some(metadata.len()),
            title: summary.title,
            annotation_count: summary.annotation_count,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Title and annotation count read out of a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    pub title: String,
    pub annotation_count: usize,
}

fn summarize_file(path: &Path, count_annotations: bool) -> ManifestSummary {
    match fs::read_to_string(path) {
        Ok(content) => summarize_manifest(&content, count_annotations),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable JSON file");
            ManifestSummary::default()
        }
    }
}

/// Shallow inspection of IIIF v2/v3 JSON. Anything unparseable or of an
/// unknown shape yields an empty title and zero annotations.
pub fn summarize_manifest(content: &str, count_annotations: bool) -> ManifestSummary {
    match serde_json::from_str::<Value>(content) {
        Ok(json) => ManifestSummary {
            title: extract_title(&json),
            annotation_count: if count_annotations {
                count_annotation_items(&json)
            } else {
                0
            },
        },
        Err(_) => ManifestSummary::default(),
    }
}

/// Display title: `label` (English preferred, else the language listed first
/// in the document; or a plain string), falling back to `title` when the
/// label is missing or blank.
pub fn extract_title(json: &Value) -> String {
    match json.get("label").filter(|label| !is_blank(label)) {
        Some(Value::Object(languages)) => languages
            .get("en")
            .and_then(first_string)
            .or_else(|| languages.values().next().and_then(first_string))
            .unwrap_or_default(),
        Some(Value::String(label)) => label.clone(),
        Some(_) => String::new(),
        None => json
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn first_string(value: &Value) -> Option<String> {
    value
        .as_array()
        .and_then(|values| values.first())
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Sum of `items` lengths across annotation pages: the top-level
/// `annotations` array when present, otherwise each `items[].annotations`.
pub fn count_annotation_items(json: &Value) -> usize {
    if let Some(pages) = json.get("annotations").and_then(Value::as_array) {
        return page_items(pages);
    }
    json.get("items")
        .and_then(Value::as_array)
        .map(|canvases| {
            canvases
                .iter()
                .filter_map(|canvas| canvas.get("annotations").and_then(Value::as_array))
                .map(|pages| page_items(pages))
                .sum()
        })
        .unwrap_or(0)
}

fn page_items(pages: &[Value]) -> usize {
    pages
        .iter()
        .filter_map(|page| page.get("items").and_then(Value::as_array))
        .map(Vec::len)
        .sum()
}

/// en-GB long date: `Monday, 19-10-2026`.
pub fn format_created(created: Option<&DateTime<Local>>) -> String {
    created
        .map(|dt| dt.format("%A, %d-%m-%Y").to_string())
        .unwrap_or_default()
}

/// Size in kilobytes with one decimal: `12.3 KB`.
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Split rendered items into pages. `per_page == 0` keeps everything on one
/// page. No items means no pages.
pub fn paginate(items: &[String], per_page: usize) -> Vec<String> {
    if items.is_empty() {
        return Vec::new();
    }
    let per_page = if per_page == 0 { items.len() } else { per_page };
    items.chunks(per_page).map(|chunk| chunk.join("\n")).collect()
}

/// Build the index document for `dir` without writing it.
pub fn build_index(dir: &Path, config: &PipelineConfig) -> Result<IndexDocument, IndexError> {
    let entries = scan_entries(dir, &config.index)?;
    let items: Vec<String> = entries
        .iter()
        .map(|entry| render_entry(entry, config).into_string())
        .collect();
    let pages = paginate(&items, config.index.items_per_page);
    let html = render_index(&pages, &config.index).into_string();
    Ok(IndexDocument {
        html,
        entries,
        page_count: pages.len(),
    })
}

/// Build the index and write it to `<dir>/<output_file>`.
pub fn write_index(dir: &Path, config: &PipelineConfig) -> Result<IndexDocument, IndexError> {
    let document = build_index(dir, config)?;
    let path = dir.join(&config.index.output_file);
    fs::write(&path, &document.html)?;
    info!(
        path = %path.display(),
        entries = document.entries.len(),
        pages = document.page_count,
        "wrote index"
    );
    Ok(document)
}

// ============================================================================
// HTML Components
// ============================================================================

/// Viewer link for a file served from the public manifest base.
fn demo_url(name: &str, config: &PipelineConfig) -> String {
    format!(
        "{}{}/{}",
        config.index.viewer_url,
        config.manifest.public_base_url.trim_end_matches('/'),
        name
    )
}

/// Renders one list item.
fn render_entry(entry: &IndexEntry, config: &PipelineConfig) -> Markup {
    let created = format_created(entry.created.as_ref());
    if entry.is_dir {
        return html! {
            li.px-4.py-2 {
                a.fw-bold.text-decoration-none href={ "./" (entry.name) "/" } { (entry.name) "/" }
                " "
                span.text-muted.small.ms-2 { "Created: " (created) }
            }
        };
    }

    let size = entry.size_bytes.map(format_size).unwrap_or_default();
    html! {
        li.d-flex.justify-content-between.align-items-center.px-4.py-2 {
            span {
                @if !entry.title.is_empty() {
                    span.ms-2 {
                        a.fw-semibold.link-dark href={ "./" (entry.name) } title="View manifest" { (entry.title) }
                    }
                }
                span.text-muted.small.ms-2 { "Created: " (created) }
                span.text-muted.small.ms-2 { "Size: " (size) }
                @if entry.annotation_count > 0 {
                    span.badge.bg-primary.text-white.ms-2 { "Annotations: " (entry.annotation_count) }
                }
            }
            a.btn.btn-dark.btn-sm.ms-2 href=(demo_url(&entry.name, config)) target="_blank" rel="noopener" {
                "Demo"
            }
        }
    }
}

/// Previous / numbered / Next controls. Page 0 starts active.
fn pagination_controls(page_count: usize) -> Markup {
    html! {
        nav {
            ul.pagination.justify-content-center {
                li.page-item.disabled id="prevPage" {
                    button.page-link type="button" tabindex="-1" { "Previous" }
                }
                @for page in 0..page_count {
                    li.page-item.active[page == 0] {
                        button.page-link type="button" data-page=(page) { (page + 1) }
                    }
                }
                li.page-item.disabled[page_count <= 1] id="nextPage" {
                    button.page-link type="button" { "Next" }
                }
            }
        }
    }
}

/// Pages as a JS array literal. `<` is escaped so embedded markup cannot
/// close the surrounding script element.
fn embedded_pages(pages: &[String]) -> String {
    serde_json::to_string(pages)
        .unwrap_or_else(|_| "[]".to_string())
        .replace('<', "\\u003c")
}

fn pagination_script(pages: &[String]) -> String {
    format!(
        r#"
const paginatedLists = {pages};
let currentPage = 0;
const totalPages = paginatedLists.length;

function showPage(page) {{
    if (page < 0 || page >= totalPages) return;
    currentPage = page;
    document.getElementById('manifestList').innerHTML = paginatedLists[page] || '';
    document.querySelectorAll('.pagination .page-link[data-page]').forEach(function (btn) {{
        btn.parentElement.classList.toggle('active', Number(btn.dataset.page) === page);
    }});
    document.getElementById('prevPage').classList.toggle('disabled', page === 0);
    document.getElementById('nextPage').classList.toggle('disabled', page === totalPages - 1);
}}

document.addEventListener('DOMContentLoaded', function () {{
    document.getElementById('prevPage').addEventListener('click', function () {{
        showPage(currentPage - 1);
    }});
    document.getElementById('nextPage').addEventListener('click', function () {{
        showPage(currentPage + 1);
    }});
    document.querySelectorAll('.pagination .page-link[data-page]').forEach(function (btn) {{
        btn.addEventListener('click', function () {{
            showPage(Number(btn.dataset.page));
        }});
    }});
}});
"#,
        pages = embedded_pages(pages)
    )
}

/// Renders the full index document from pre-rendered pages.
pub fn render_index(pages: &[String], config: &IndexConfig) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (config.page_title) }
                link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet";
                link rel="stylesheet" href=(config.stylesheet);
                link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.2/css/all.min.css";
            }
            body {
                div.container.py-4 {
                    header.mb-4 {
                        h1.display-5 { (config.page_title) }
                    }
                    main {
                        @for paragraph in &config.intro {
                            p { (paragraph) }
                        }
                        ul.file-list id="manifestList" {
                            @match pages.first() {
                                Some(first) => {
                                    (PreEscaped(first))
                                }
                                None => {
                                    li.empty-state { (EMPTY_STATE) }
                                }
                            }
                        }
                        @if pages.len() > 1 {
                            (pagination_controls(pages.len()))
                        }
                    }
                    @if config.footer.is_some() || config.repository_url.is_some() {
                        footer.footer-classy.mt-5.text-muted {
                            div {
                                @if let Some(footer) = &config.footer {
                                    (footer) " "
                                }
                                @if let Some(repo) = &config.repository_url {
                                    a.text-dark href=(repo) target="_blank" rel="noopener" title="Source repository" {
                                        i.fab.fa-github {}
                                        " Repository"
                                    }
                                }
                            }
                        }
                    }
                }
                @if pages.len() > 1 {
                    script { (PreEscaped(pagination_script(pages))) }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
