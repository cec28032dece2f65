use crate::core::ReferenceStore;
use crate::domain::model::{DatasetKind, ReferenceEntry};
use crate::utils::error::{ComplianceError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// REST 表格 API 回傳的單列資料
#[derive(Debug, Deserialize)]
struct ReferenceRow {
    canonical_name: String,
    #[serde(default)]
    synonyms: Option<Vec<String>>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    source_citation: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
}

impl ReferenceRow {
    fn into_entry(self, kind: DatasetKind) -> ReferenceEntry {
        ReferenceEntry {
            canonical_name: self.canonical_name,
            synonyms: self.synonyms.unwrap_or_default(),
            kind,
            status: self.status,
            source_citation: self.source_citation,
            is_active: self.is_active.unwrap_or(true),
        }
    }
}

/// PostgREST 風格的參考資料來源：
/// `GET {endpoint}/{dataset}?is_active=eq.true&order=id.asc&offset=..&limit=..`
pub struct HttpReferenceStore {
    client: Client,
    endpoint: String,
    headers: HashMap<String, String>,
    kinds: HashMap<String, DatasetKind>,
    max_page_size: usize,
    request_timeout: Option<Duration>,
}

impl HttpReferenceStore {
    pub fn new(endpoint: impl Into<String>, kinds: HashMap<String, DatasetKind>, max_page_size: usize) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            headers: HashMap::new(),
            kinds,
            max_page_size: max_page_size.max(1),
            request_timeout: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn dataset_url(&self, dataset: &str) -> String {
        format!("{}/{}", self.endpoint, dataset)
    }
}

impl ReferenceStore for HttpReferenceStore {
    fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    async fn list_active(
        &self,
        dataset: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<ReferenceEntry>> {
        let kind = self
            .kinds
            .get(dataset)
            .copied()
            .ok_or_else(|| ComplianceError::StoreError {
                dataset: dataset.to_string(),
                message: "dataset is not configured".to_string(),
            })?;

        let url = self.dataset_url(dataset);
        let limit = page_size.min(self.max_page_size);

        let mut request = self.client.get(&url).query(&[
            ("is_active", "eq.true".to_string()),
            ("order", "id.asc".to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ]);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("📡 GET {} (offset {}, limit {})", url, offset, limit);
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ComplianceError::StoreError {
                dataset: dataset.to_string(),
                message: format!("HTTP {}: {}", status, body.trim()),
            });
        }

        let rows: Vec<ReferenceRow> = response.json().await?;
        Ok(rows.into_iter().map(|row| row.into_entry(kind)).collect())
    }
}
