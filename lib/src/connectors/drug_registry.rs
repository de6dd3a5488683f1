// lib/src/connectors/drug_registry.rs

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::Value;

use models::errors::{ClinicError, ClinicResult};

use crate::config::DrugRegistryConfig;

pub const NO_DESCRIPTION_AVAILABLE: &str = "drug found but no description available";
pub const DRUG_NOT_FOUND: &str = "drug not found in registry";

/// Source of human-readable drug information.
///
/// Implementations never fail: every problem degrades to one of the two
/// sentinel strings (for `lookup`) or an empty list (for `search`).
#[async_trait]
pub trait DrugInfoSource: Send + Sync {
    async fn lookup(&self, drug_name: &str) -> String;
    async fn search(&self, prefix: &str) -> Vec<String>;
}

/// Client for an openFDA-style drug label endpoint.
#[derive(Clone)]
pub struct DrugRegistryClient {
    http: Client,
    base_url: String,
    description_limit: usize,
    search_limit: usize,
}

impl DrugRegistryClient {
    pub fn new(config: &DrugRegistryConfig) -> ClinicResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClinicError::Configuration(format!("Failed to build drug registry client: {}", e)))?;
        info!("[DrugRegistry] Using {} (timeout {} ms)", config.base_url, config.timeout_ms);
        Ok(DrugRegistryClient {
            http,
            base_url: config.base_url.clone(),
            description_limit: config.description_limit,
            search_limit: config.search_limit,
        })
    }

    async fn fetch(&self, search: &str, limit: usize) -> Result<Value, reqwest::Error> {
        debug!("[DrugRegistry] GET {} search={} limit={}", self.base_url, search, limit);
        self.http
            .get(&self.base_url)
            .query(&[("search", search.to_string()), ("limit", limit.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl DrugInfoSource for DrugRegistryClient {
    async fn lookup(&self, drug_name: &str) -> String {
        let name = sanitize_term(drug_name);
        if name.is_empty() {
            return DRUG_NOT_FOUND.to_string();
        }

        let search = format!(
            "openfda.brand_name:\"{0}\" openfda.generic_name:\"{0}\"",
            name
        );
        match self.fetch(&search, 1).await {
            Ok(body) => describe_label(&body, self.description_limit),
            Err(e) => {
                warn!("[DrugRegistry] Lookup for '{}' failed: {}", name, e);
                DRUG_NOT_FOUND.to_string()
            }
        }
    }

    async fn search(&self, prefix: &str) -> Vec<String> {
        let prefix = sanitize_term(prefix);
        if prefix.is_empty() {
            return Vec::new();
        }

        let search = format!("openfda.brand_name:\"{}*\"", prefix);
        match self.fetch(&search, self.search_limit).await {
            Ok(body) => extract_brand_names(&body, self.search_limit),
            Err(e) => {
                warn!("[DrugRegistry] Search for '{}' failed: {}", prefix, e);
                Vec::new()
            }
        }
    }
}

/// Quotes would break out of the query phrase.
fn sanitize_term(term: &str) -> String {
    term.trim().replace('"', "")
}

/// Picks the indication text of the first label, or a sentinel.
pub fn describe_label(body: &Value, limit: usize) -> String {
    let first = match body.get("results").and_then(Value::as_array).and_then(|r| r.first()) {
        Some(first) => first,
        None => return DRUG_NOT_FOUND.to_string(),
    };

    first
        .get("indications_and_usage")
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| truncate_description(text, limit))
        .unwrap_or_else(|| NO_DESCRIPTION_AVAILABLE.to_string())
}

/// Cuts at `limit` characters, not bytes.
pub fn truncate_description(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

pub fn extract_brand_names(body: &Value, limit: usize) -> Vec<String> {
    body.get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|r| {
                    r.pointer("/openfda/brand_name/0")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}
