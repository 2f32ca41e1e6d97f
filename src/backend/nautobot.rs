// Copyright (c) 2025 - Cowboy AI, Inc.

//! Nautobot Inventory Backend
//!
//! Implements the [`Backend`] primitives against the Nautobot REST API and its
//! GraphQL endpoint.
//!
//! ```text
//! get/filter(collection, filter) = GET    /api/<path>/?k=v
//! create(collection, properties) = POST   /api/<path>/
//! update(collection, record, ..) = PATCH  /api/<path>/<id>/   (changed fields only)
//! delete(collection, record)     = DELETE /api/<path>/<id>/
//! query(text, variables)         = POST   /api/graphql/
//! ```
//!
//! `update` diffs the desired properties against the record first and skips
//! the request when nothing differs, so callers can tell "updated" from
//! "already in the desired state".
//!
//! # Example
//!
//! ```rust,no_run
//! use cim_sot::backend::NautobotBackend;
//! use cim_sot::config::NautobotConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NautobotConfig {
//!     url: "http://127.0.0.1:8080".to_string(),
//!     token: "your-token-here".to_string(),
//!     timeout_secs: 30,
//! };
//! let backend = NautobotBackend::new(&config)?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Backend, BackendError, BackendResult, Filter, Record};
use crate::config::NautobotConfig;
use crate::domain::{Collection, PropertySet};

/// Upper bound on followed pagination links per listing
const MAX_PAGES: usize = 1000;

/// Paginated list response
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<Record>,
}

/// Nautobot REST/GraphQL client
#[derive(Debug, Clone)]
pub struct NautobotBackend {
    client: Client,
    base_url: String,
}

impl NautobotBackend {
    /// Build the HTTP client with token authentication
    pub fn new(config: &NautobotConfig) -> Result<Self, BackendError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut token: reqwest::header::HeaderValue = format!("Token {}", config.token)
            .parse()
            .map_err(|e| BackendError::Transport(format!("Invalid API token: {}", e)))?;
        token.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, token);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/api/{}/", self.base_url, collection.api_path())
    }

    fn record_url(&self, collection: Collection, record: &Record) -> String {
        format!("{}{}/", self.collection_url(collection), record.id())
    }

    async fn list(&self, collection: Collection, filter: &Filter) -> BackendResult<Vec<Record>> {
        let query: Vec<(&str, &str)> = filter.pairs().collect();
        let response = self
            .client
            .get(self.collection_url(collection))
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        let mut page: Page = decode(response).await?;
        let mut records = std::mem::take(&mut page.results);

        let mut pages = 1;
        while let Some(next) = page.next.take() {
            if pages >= MAX_PAGES {
                warn!("stopping pagination of {} after {} pages", collection, pages);
                break;
            }
            let response = self.client.get(&next).send().await.map_err(transport)?;
            page = decode(response).await?;
            records.append(&mut page.results);
            pages += 1;
        }
        Ok(records)
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

async fn check(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> BackendResult<T> {
    let response = check(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl Backend for NautobotBackend {
    async fn get(&self, collection: Collection, filter: &Filter) -> BackendResult<Option<Record>> {
        let mut records = self.list(collection, filter).await?;
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            count => Err(BackendError::MultipleResults {
                collection,
                filter: filter.to_string(),
                count,
            }),
        }
    }

    async fn filter(&self, collection: Collection, filter: &Filter) -> BackendResult<Vec<Record>> {
        self.list(collection, filter).await
    }

    async fn create(&self, collection: Collection, properties: &PropertySet) -> BackendResult<Record> {
        debug!("POST {} {}", collection.api_path(), properties);
        let response = self
            .client
            .post(self.collection_url(collection))
            .json(properties)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn update(
        &self,
        collection: Collection,
        record: &Record,
        properties: &PropertySet,
    ) -> BackendResult<bool> {
        let changed = record.changed_fields(properties);
        if changed.is_empty() {
            debug!("{} {} already up to date", collection, record);
            return Ok(false);
        }
        debug!("PATCH {} {} {}", collection.api_path(), record.id(), changed);
        let response = self
            .client
            .patch(self.record_url(collection, record))
            .json(&changed)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(true)
    }

    async fn delete(&self, collection: Collection, record: &Record) -> BackendResult<bool> {
        let response = self
            .client
            .delete(self.record_url(collection, record))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await?;
        Ok(true)
    }

    async fn query(&self, query: &str, variables: &Value) -> BackendResult<Value> {
        let response = self
            .client
            .post(format!("{}/api/graphql/", self.base_url))
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(transport)?;
        let body: Value = decode(response).await?;
        match body.get("errors") {
            Some(Value::Array(errors)) if !errors.is_empty() => {
                Err(BackendError::Query(Value::Array(errors.clone()).to_string()))
            }
            _ => Ok(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let backend = NautobotBackend::new(&NautobotConfig {
            url: "http://nautobot.local/".to_string(),
            token: "abc".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(
            backend.collection_url(Collection::IpAddresses),
            "http://nautobot.local/api/ipam/ip-addresses/"
        );
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let result = NautobotBackend::new(&NautobotConfig {
            url: "http://nautobot.local".to_string(),
            token: "bad\ntoken".to_string(),
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(BackendError::Transport(_))));
    }
}
