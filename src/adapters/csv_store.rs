use crate::core::ReferenceStore;
use crate::domain::model::{DatasetKind, ReferenceEntry};
use crate::utils::error::{ComplianceError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// CSV 欄位：canonical_name,synonyms,status,source_citation,is_active（synonyms 以 `|` 分隔）
#[derive(Debug, Deserialize)]
struct CsvRow {
    canonical_name: String,
    synonyms: Option<String>,
    status: Option<String>,
    source_citation: Option<String>,
    is_active: Option<bool>,
}

impl CsvRow {
    fn into_entry(self, kind: DatasetKind) -> ReferenceEntry {
        let synonyms = self
            .synonyms
            .map(|s| {
                s.split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        ReferenceEntry {
            canonical_name: self.canonical_name.trim().to_string(),
            synonyms,
            kind,
            status: self.status.filter(|s| !s.trim().is_empty()),
            source_citation: self.source_citation.filter(|s| !s.trim().is_empty()),
            is_active: self.is_active.unwrap_or(true),
        }
    }
}

/// 每個資料集一個 `{directory}/{dataset}.csv` 檔案
#[derive(Debug, Clone)]
pub struct CsvReferenceStore {
    directory: PathBuf,
    kinds: HashMap<String, DatasetKind>,
    max_page_size: usize,
}

impl CsvReferenceStore {
    pub fn new(
        directory: impl Into<PathBuf>,
        kinds: HashMap<String, DatasetKind>,
        max_page_size: usize,
    ) -> Self {
        Self {
            directory: directory.into(),
            kinds,
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn dataset_path(&self, dataset: &str) -> PathBuf {
        Path::new(&self.directory).join(format!("{}.csv", dataset))
    }

    fn kind_of(&self, dataset: &str) -> Result<DatasetKind> {
        self.kinds
            .get(dataset)
            .copied()
            .ok_or_else(|| ComplianceError::StoreError {
                dataset: dataset.to_string(),
                message: "dataset is not configured".to_string(),
            })
    }
}

impl ReferenceStore for CsvReferenceStore {
    fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    async fn list_active(
        &self,
        dataset: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<ReferenceEntry>> {
        let kind = self.kind_of(dataset)?;
        let path = self.dataset_path(dataset);
        tracing::debug!("📄 Reading {} (offset {}, limit {})", path.display(), offset, page_size);

        let data = tokio::fs::read(&path).await?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(data.as_slice());

        let mut page = Vec::new();
        let mut active_seen = 0usize;
        let limit = page_size.min(self.max_page_size);

        for row in reader.deserialize::<CsvRow>() {
            let entry = row?.into_entry(kind);
            if !entry.is_active {
                continue;
            }
            if active_seen >= offset {
                page.push(entry);
                if page.len() == limit {
                    break;
                }
            }
            active_seen += 1;
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ALLERGENS_CSV: &str = "canonical_name,synonyms,status,source_citation,is_active
Milk,casein|whey|whey protein isolate|lactose,major,FALCPA 2004,true
Soy,soy lecithin|soybean oil|edamame,major,FALCPA 2004,true
Lupin,lupine,,EU 1169/2011,false
Sesame,tahini|sesame oil,major,FASTER Act 2021,
";

    fn store_with(dir: &TempDir, max_page_size: usize) -> CsvReferenceStore {
        std::fs::write(dir.path().join("major_allergens.csv"), ALLERGENS_CSV).unwrap();
        let kinds = HashMap::from([("major_allergens".to_string(), DatasetKind::Allergen)]);
        CsvReferenceStore::new(dir.path(), kinds, max_page_size)
    }

    #[tokio::test]
    async fn test_reads_rows_and_splits_synonyms() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 1000);

        let rows = store.list_active("major_allergens", 0, 1000).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].canonical_name, "Milk");
        assert_eq!(rows[0].kind, DatasetKind::Allergen);
        assert_eq!(rows[0].synonyms, vec!["casein", "whey", "whey protein isolate", "lactose"]);
        assert_eq!(rows[0].source_citation.as_deref(), Some("FALCPA 2004"));
        // Empty is_active defaults to active; explicit false is skipped
        assert_eq!(rows[2].canonical_name, "Sesame");
        assert!(rows.iter().all(|r| r.canonical_name != "Lupin"));
    }

    #[tokio::test]
    async fn test_offset_and_page_cap_apply_to_active_rows() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 2);

        let first = store.list_active("major_allergens", 0, 1000).await.unwrap();
        let second = store.list_active("major_allergens", 2, 1000).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].canonical_name, "Sesame");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let kinds = HashMap::from([("gras_substances".to_string(), DatasetKind::Gras)]);
        let store = CsvReferenceStore::new(dir.path(), kinds, 1000);

        let err = store.list_active("gras_substances", 0, 1000).await.unwrap_err();
        assert!(matches!(err, ComplianceError::IoError(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_dataset_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, 1000);

        let err = store.list_active("ndi_notifications", 0, 1000).await.unwrap_err();
        assert!(matches!(err, ComplianceError::StoreError { .. }));
    }
}
