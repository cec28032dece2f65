use crate::adapters::{ConfiguredStore, CsvReferenceStore, HttpReferenceStore};
use crate::config::toml_config::{ComplianceConfig, DatasetsConfig, StoreKind};
use crate::core::cache::{CacheConfig, DatasetStats, ReferenceDataCache};
use crate::core::declaration::EscalationPolicy;
use crate::core::orchestrator::ComplianceOrchestrator;
use crate::core::ReferenceStore;
use crate::domain::model::AggregateComplianceResult;
use crate::utils::error::{ComplianceError, Result};
use std::sync::Arc;

pub struct ComplianceEngine<S: ReferenceStore + 'static> {
    cache: Arc<ReferenceDataCache<S>>,
    orchestrator: ComplianceOrchestrator,
    datasets: DatasetsConfig,
}

impl<S: ReferenceStore + 'static> ComplianceEngine<S> {
    pub fn new(store: S, cache_config: CacheConfig, datasets: DatasetsConfig, policy: EscalationPolicy) -> Self {
        let cache = Arc::new(ReferenceDataCache::with_config(store, cache_config));
        let orchestrator = ComplianceOrchestrator::from_cache(Arc::clone(&cache), &datasets).with_policy(policy);
        Self {
            cache,
            orchestrator,
            datasets,
        }
    }

    pub fn cache(&self) -> &Arc<ReferenceDataCache<S>> {
        &self.cache
    }

    pub fn datasets(&self) -> &DatasetsConfig {
        &self.datasets
    }

    /// 預先載入全部四個資料集。任一資料集載入失敗時回傳第一個錯誤，其餘結果仍會寫入快取。
    pub async fn warm_up(&self) -> Result<usize> {
        tracing::info!("🔥 Warming up {} reference datasets", self.datasets.all().len());

        let mut total = 0;
        let mut first_error = None;
        for (dataset, result) in self.cache.warm_up(&self.datasets.all()).await {
            match result {
                Ok(count) => {
                    tracing::info!("📚 {}: {} entries", dataset, count);
                    total += count;
                }
                Err(e) => {
                    tracing::error!("❌ Failed to warm up '{}': {}", dataset, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }

    pub async fn run(
        &self,
        ingredients: &[String],
        declared_allergen_statement: Option<&str>,
    ) -> Result<AggregateComplianceResult> {
        self.orchestrator.run(ingredients, declared_allergen_statement).await
    }

    /// 捨棄全部快照，下一次檢查會重新載入
    pub async fn invalidate_all(&self) {
        for dataset in self.datasets.all() {
            self.cache.invalidate(&dataset).await;
        }
    }

    pub async fn stats(&self) -> Vec<DatasetStats> {
        self.cache.stats().await
    }
}

impl ComplianceEngine<ConfiguredStore> {
    /// 依設定檔建立後端、快取與檢查器
    pub fn from_config(config: &ComplianceConfig) -> Result<Self> {
        let kinds = config.datasets.kinds();
        let store = match config.store_kind()? {
            StoreKind::Http => {
                let endpoint = config
                    .store
                    .endpoint
                    .clone()
                    .ok_or_else(|| ComplianceError::MissingConfigError {
                        field: "store.endpoint".to_string(),
                    })?;
                let mut store =
                    HttpReferenceStore::new(endpoint, kinds, config.max_page_size()).with_headers(config.headers());
                if let Some(timeout) = config.store_timeout() {
                    store = store.with_timeout(timeout);
                }
                ConfiguredStore::Http(store)
            }
            StoreKind::Csv => {
                let directory = config
                    .store
                    .directory
                    .clone()
                    .ok_or_else(|| ComplianceError::MissingConfigError {
                        field: "store.directory".to_string(),
                    })?;
                ConfiguredStore::Csv(CsvReferenceStore::new(directory, kinds, config.max_page_size()))
            }
        };

        tracing::info!(
            "🔧 {}: {} reference store, TTL {:?}",
            config.engine_name(),
            config.store.r#type,
            config.cache_config().ttl
        );

        Ok(Self::new(
            store,
            config.cache_config(),
            config.datasets.clone(),
            config.escalation_policy(),
        ))
    }
}
