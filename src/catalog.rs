//! Catalog records and the CMS client that fetches them.
//!
//! Records come from a Directus-style items endpoint:
//!
//! ```text
//! GET {api_url}/items/{collection}?fields=id,image.*,title&filter={"status":{"_eq":"published"}}&limit=100&offset=0
//! → { "data": [ { "id": 1, "title": "...", "image": { "filename_disk": "a.jpg", ... } }, ... ] }
//! ```
//!
//! Pages of `page_size` records are requested until a short page comes back.
//! A `page_size` of 0 sends a single `limit=-1` request instead.

use crate::config::CmsConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("CMS returned HTTP {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },
}

/// Record identifier. CMS collections use either integer or UUID/string keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// One catalog row. Everything but `id` stays in `fields` so configured
/// field names (image field, metadata mapping) can address any column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CatalogRecord {
    /// Raw field value; JSON `null` counts as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Field rendered as display text. Empty strings and empty lists are
    /// absent. Lists of scalars are joined with `, `.
    pub fn text_field(&self, name: &str) -> Option<String> {
        self.field(name).and_then(value_text)
    }

    pub fn title(&self) -> Option<String> {
        self.text_field("title")
    }

    pub fn description(&self) -> Option<String> {
        self.text_field("description")
    }

    /// Title, or `Item {id}` for untitled records.
    pub fn display_title(&self) -> String {
        self.title().unwrap_or_else(|| format!("Item {}", self.id))
    }
}

/// JSON values that read as "nothing here": null, `false`, zero and the empty
/// string. Empty arrays and objects are not blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

/// Anything that can produce the full list of catalog records.
pub trait CatalogSource {
    fn fetch_records(&self) -> Result<Vec<CatalogRecord>, CatalogError>;
}

#[derive(Deserialize)]
struct ItemsResponse {
    data: Vec<CatalogRecord>,
}

/// Blocking HTTP client for the CMS items endpoint.
pub struct HttpCatalog {
    client: reqwest::blocking::Client,
    config: CmsConfig,
}

impl HttpCatalog {
    pub fn new(client: reqwest::blocking::Client, config: CmsConfig) -> Self {
        Self { client, config }
    }

    fn fetch_page(&self, offset: usize) -> Result<Vec<CatalogRecord>, CatalogError> {
        let url = items_url(&self.config);
        let params = query_params(&self.config, offset);
        debug!(%url, offset, "fetching catalog page");

        let response = self.client.get(&url).query(&params).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }
        let items: ItemsResponse = response.json()?;
        Ok(items.data)
    }
}

impl CatalogSource for HttpCatalog {
    fn fetch_records(&self) -> Result<Vec<CatalogRecord>, CatalogError> {
        collect_pages(self.config.page_size, |offset| self.fetch_page(offset))
    }
}

/// Build the shared blocking client used for the CMS and the image server.
pub fn build_client(timeout_secs: Option<u64>) -> Result<reqwest::blocking::Client, reqwest::Error> {
    let builder = reqwest::blocking::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout_secs.map(Duration::from_secs));
    builder.build()
}

/// `{api_url}/items/{collection}`, tolerating a trailing slash on the base.
pub fn items_url(config: &CmsConfig) -> String {
    format!(
        "{}/items/{}",
        config.api_url.trim_end_matches('/'),
        config.collection
    )
}

/// Query parameters for one page request.
pub fn query_params(config: &CmsConfig, offset: usize) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if !config.fields.is_empty() {
        params.push(("fields", config.fields.join(",")));
    }
    if !config.status.is_empty() {
        let filter = serde_json::json!({ "status": { "_eq": config.status } });
        params.push(("filter", filter.to_string()));
    }
    if config.page_size == 0 {
        params.push(("limit", "-1".to_string()));
    } else {
        params.push(("limit", config.page_size.to_string()));
        params.push(("offset", offset.to_string()));
    }
    params
}

/// Drive the offset loop: keep asking for pages until one comes back empty.
///
/// A short page does not end the loop. Servers may cap `limit` below the
/// requested page size, and every page would then look short.
pub fn collect_pages<F>(page_size: u32, mut fetch_page: F) -> Result<Vec<CatalogRecord>, CatalogError>
where
    F: FnMut(usize) -> Result<Vec<CatalogRecord>, CatalogError>,
{
    let mut records = Vec::new();
    let mut first_page = None;
    loop {
        let page = fetch_page(records.len())?;
        if page.is_empty() {
            break;
        }
        first_page.get_or_insert(page.len());
        records.extend(page);
        if page_size == 0 {
            break;
        }
    }
    if let Some(first) = first_page
        && first < page_size as usize
        && records.len() > first
    {
        warn!(
            requested = page_size,
            fetched = records.len(),
            "CMS returned fewer records per page than requested; check its query limit"
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{loopback_client, serve_json};
    use serde_json::json;

    fn record(value: Value) -> CatalogRecord {
        serde_json::from_value(value).unwrap()
    }

    fn records(ids: std::ops::Range<i64>) -> Vec<CatalogRecord> {
        ids.map(|id| record(json!({ "id": id }))).collect()
    }

    #[test]
    fn record_accepts_integer_and_string_ids() {
        assert_eq!(record(json!({ "id": 7 })).id, RecordId::Int(7));
        assert_eq!(
            record(json!({ "id": "a1b2" })).id,
            RecordId::Text("a1b2".to_string())
        );
    }

    #[test]
    fn record_id_display() {
        assert_eq!(RecordId::Int(42).to_string(), "42");
        assert_eq!(RecordId::Text("x-1".to_string()).to_string(), "x-1");
    }

    #[test]
    fn text_field_skips_null_and_empty() {
        let r = record(json!({
            "id": 1,
            "creator": null,
            "license": "",
            "rights": "   ",
            "source": []
        }));
        assert_eq!(r.text_field("creator"), None);
        assert_eq!(r.text_field("license"), None);
        assert_eq!(r.text_field("rights"), None);
        assert_eq!(r.text_field("source"), None);
        assert_eq!(r.text_field("missing"), None);
    }

    #[test]
    fn text_field_renders_scalars_and_lists() {
        let r = record(json!({
            "id": 1,
            "date_created": "2024-05-01",
            "year": 1921,
            "license": ["CC-BY", "CC0"]
        }));
        assert_eq!(r.text_field("date_created").as_deref(), Some("2024-05-01"));
        assert_eq!(r.text_field("year").as_deref(), Some("1921"));
        assert_eq!(r.text_field("license").as_deref(), Some("CC-BY, CC0"));
    }

    #[test]
    fn blank_values() {
        for blank in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(is_blank(&blank), "{blank} should be blank");
        }
        for present in [json!(true), json!(1), json!(" "), json!([]), json!({})] {
            assert!(!is_blank(&present), "{present} should not be blank");
        }
    }

    #[test]
    fn display_title_falls_back_to_id() {
        assert_eq!(record(json!({ "id": 3, "title": "Map" })).display_title(), "Map");
        assert_eq!(record(json!({ "id": 3 })).display_title(), "Item 3");
        assert_eq!(record(json!({ "id": 3, "title": "" })).display_title(), "Item 3");
    }

    #[test]
    fn items_url_trims_trailing_slash() {
        let config = CmsConfig {
            api_url: "https://cms.example.org/".to_string(),
            ..CmsConfig::default()
        };
        assert_eq!(items_url(&config), "https://cms.example.org/items/iiif_images");
    }

    #[test]
    fn query_params_include_fields_filter_and_paging() {
        let config = CmsConfig {
            fields: vec!["id".to_string(), "image.*".to_string()],
            page_size: 50,
            ..CmsConfig::default()
        };
        let params = query_params(&config, 100);
        assert_eq!(
            params,
            vec![
                ("fields", "id,image.*".to_string()),
                ("filter", r#"{"status":{"_eq":"published"}}"#.to_string()),
                ("limit", "50".to_string()),
                ("offset", "100".to_string()),
            ]
        );
    }

    #[test]
    fn query_params_unbounded_without_filter() {
        let config = CmsConfig {
            status: String::new(),
            page_size: 0,
            ..CmsConfig::default()
        };
        let params = query_params(&config, 0);
        assert!(params.iter().all(|(k, _)| *k != "filter" && *k != "offset"));
        assert!(params.contains(&("limit", "-1".to_string())));
    }

    #[test]
    fn collect_pages_continues_past_short_page() {
        let mut offsets = Vec::new();
        let result = collect_pages(2, |offset| {
            offsets.push(offset);
            Ok(match offset {
                0 => records(0..2),
                2 => records(2..4),
                4 => records(4..5),
                _ => vec![],
            })
        })
        .unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(offsets, vec![0, 2, 4, 5]);
    }

    #[test]
    fn collect_pages_survives_server_side_limit_cap() {
        // Asked for 100 per page, the server never returns more than 30.
        let mut calls = 0;
        let result = collect_pages(100, |offset| {
            calls += 1;
            let end = (offset + 30).min(75) as i64;
            Ok(records(offset as i64..end))
        })
        .unwrap();
        assert_eq!(result.len(), 75);
        assert_eq!(calls, 4);
        assert_eq!(result[74].id, RecordId::Int(74));
    }

    #[test]
    fn collect_pages_stops_on_empty_page() {
        let mut calls = 0;
        let result = collect_pages(2, |offset| {
            calls += 1;
            Ok(if offset == 0 { records(0..2) } else { vec![] })
        })
        .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn collect_pages_unbounded_is_single_request() {
        let mut calls = 0;
        let result = collect_pages(0, |_| {
            calls += 1;
            Ok(records(0..250))
        })
        .unwrap();
        assert_eq!(result.len(), 250);
        assert_eq!(calls, 1);
    }

    #[test]
    fn collect_pages_propagates_errors() {
        let result = collect_pages(2, |_| {
            Err(CatalogError::Status {
                status: 503,
                url: "u".to_string(),
                body: String::new(),
            })
        });
        assert!(matches!(result, Err(CatalogError::Status { status: 503, .. })));
    }

    #[test]
    fn items_response_parses_data_array() {
        let parsed: ItemsResponse = serde_json::from_value(json!({
            "data": [
                { "id": 1, "title": "One", "image": { "filename_disk": "one.jpg" } },
                { "id": "two" }
            ]
        }))
        .unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].title().as_deref(), Some("One"));
        assert!(parsed.data[0].field("image").is_some());
    }

    #[test]
    fn http_catalog_pages_through_items_endpoint() {
        let (base, server) = serve_json(vec![
            (
                "200 OK",
                json!({ "data": [{ "id": 1, "title": "One" }, { "id": 2 }] }).to_string(),
            ),
            ("200 OK", json!({ "data": [] }).to_string()),
        ]);
        let config = CmsConfig {
            api_url: base,
            page_size: 2,
            ..CmsConfig::default()
        };

        let records = HttpCatalog::new(loopback_client(), config)
            .fetch_records()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title().as_deref(), Some("One"));

        let requests = server.join().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("GET /items/iiif_images?"));
        assert!(requests[0].contains("limit=2"));
        assert!(requests[0].contains("offset=0"));
        assert!(requests[1].contains("offset=2"));
    }

    #[test]
    fn http_catalog_maps_error_status() {
        let (base, server) = serve_json(vec![(
            "503 Service Unavailable",
            r#"{"errors":[{"message":"maintenance"}]}"#.to_string(),
        )]);
        let config = CmsConfig {
            api_url: base,
            ..CmsConfig::default()
        };

        let err = HttpCatalog::new(loopback_client(), config)
            .fetch_records()
            .unwrap_err();
        match err {
            CatalogError::Status { status, url, body } => {
                assert_eq!(status, 503);
                assert!(url.ends_with("/items/iiif_images"));
                assert!(body.contains("maintenance"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
        server.join().unwrap();
    }
}
