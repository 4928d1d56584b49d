//! # iiif-static
//!
//! Publishes a CMS image collection as static IIIF Presentation 3.0
//! manifests, plus a browsable index page. The output directory is plain
//! files: drop it on any static host and point a IIIF viewer at the JSON.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Generate  CMS records + image server  →  docs/<slug>.json   (one manifest per record)
//! 2. Index     docs/                       →  docs/index.html    (paginated listing)
//! ```
//!
//! The stages only share the output directory. The index stage knows nothing
//! about the CMS: it lists whatever is in the directory, so hand-placed
//! manifests show up too, and either stage can run on its own.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Paginated record fetch from the CMS items endpoint |
//! | [`image_service`] | IIIF Image API URL grammar and `info.json` dimension lookup |
//! | [`iiif`] | Serializable Presentation 3.0 types (`Manifest`, `Canvas`, ...) |
//! | [`manifest`] | Stage 1 core: one record → one manifest |
//! | [`pipeline`] | Stage 1 driver: fetch, build, write, report |
//! | [`index`] | Stage 2: directory scan and Maud-rendered index page |
//! | [`config`] | Layered `config.toml` loading and validation |
//! | [`output`] | CLI output formatting for both stages |
//!
//! # Design Decisions
//!
//! ## Traits at the Network Seams
//!
//! Manifest assembly talks to the outside world only through
//! [`catalog::CatalogSource`] and [`image_service::DimensionSource`]. The
//! production implementations use a blocking `reqwest` client; tests swap in
//! in-memory fakes, so every stage runs offline under `cargo test`.
//!
//! ## Sequential, Ordered Output
//!
//! Records are processed one at a time in catalog order. Image servers behind
//! small collections are often modest machines, and a deterministic order
//! makes logs and reports line up with the CMS.
//!
//! ## Degrade, Don't Abort
//!
//! Only a failed catalog fetch stops a run. A record without an image is
//! skipped, an unreachable `info.json` yields a 0×0 canvas, a failed write is
//! reported and the run moves on. The index stage treats unreadable JSON the
//! same way: the file is listed without a title.
//!
//! ## Maud Over Template Engines
//!
//! The index page is generated with [Maud](https://maud.lambda.xyz/).
//! Names and titles come from files anyone can drop into the output
//! directory, and Maud escapes all interpolation by default.

pub mod catalog;
pub mod config;
pub mod iiif;
pub mod image_service;
pub mod index;
pub mod manifest;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
