// Adapters layer: concrete reference stores behind the `ReferenceStore` port.

pub mod csv_store;
pub mod http_store;
pub mod memory_store;

pub use csv_store::CsvReferenceStore;
pub use http_store::HttpReferenceStore;
pub use memory_store::InMemoryStore;

use crate::core::ReferenceStore;
use crate::domain::model::ReferenceEntry;
use crate::utils::error::Result;

/// 依設定檔選擇的後端
pub enum ConfiguredStore {
    Http(HttpReferenceStore),
    Csv(CsvReferenceStore),
}

impl ReferenceStore for ConfiguredStore {
    fn max_page_size(&self) -> usize {
        match self {
            ConfiguredStore::Http(store) => store.max_page_size(),
            ConfiguredStore::Csv(store) => store.max_page_size(),
        }
    }

    async fn list_active(
        &self,
        dataset: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<ReferenceEntry>> {
        match self {
            ConfiguredStore::Http(store) => store.list_active(dataset, offset, page_size).await,
            ConfiguredStore::Csv(store) => store.list_active(dataset, offset, page_size).await,
        }
    }
}
