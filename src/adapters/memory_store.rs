use crate::core::ReferenceStore;
use crate::domain::model::ReferenceEntry;
use crate::utils::error::{ComplianceError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// 以記憶體內資料模擬分頁後端，適合嵌入固定清單或測試
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    datasets: Arc<HashMap<String, Vec<ReferenceEntry>>>,
    max_page_size: usize,
}

impl InMemoryStore {
    pub fn new(max_page_size: usize) -> Self {
        Self {
            datasets: Arc::new(HashMap::new()),
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>, entries: Vec<ReferenceEntry>) -> Self {
        Arc::make_mut(&mut self.datasets).insert(dataset.into(), entries);
        self
    }
}

impl ReferenceStore for InMemoryStore {
    fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    async fn list_active(
        &self,
        dataset: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<ReferenceEntry>> {
        let entries = self
            .datasets
            .get(dataset)
            .ok_or_else(|| ComplianceError::StoreError {
                dataset: dataset.to_string(),
                message: "dataset not found".to_string(),
            })?;

        Ok(entries
            .iter()
            .filter(|e| e.is_active)
            .skip(offset)
            .take(page_size.min(self.max_page_size))
            .cloned()
            .collect())
    }
}
