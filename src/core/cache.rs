use crate::domain::model::{DatasetSnapshot, ReferenceEntry};
use crate::domain::ports::ReferenceStore;
use crate::utils::error::{ComplianceError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_PAGES: usize = 500;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub page_size: usize,
    pub fetch_timeout: Duration,
    pub max_pages: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            page_size: DEFAULT_PAGE_SIZE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// `get` 的回傳值。刷新失敗但仍有舊快照時 `warning` 會帶有失敗原因。
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub snapshot: Arc<DatasetSnapshot>,
    pub warning: Option<String>,
}

impl CacheLookup {
    fn fresh(snapshot: Arc<DatasetSnapshot>) -> Self {
        Self {
            snapshot,
            warning: None,
        }
    }

    fn stale(snapshot: Arc<DatasetSnapshot>, reason: &str) -> Self {
        let warning = format!(
            "Serving stale '{}' snapshot loaded at {} ({} entries): refresh failed: {}",
            snapshot.dataset(),
            snapshot.loaded_at().to_rfc3339(),
            snapshot.len(),
            reason
        );
        Self {
            snapshot,
            warning: Some(warning),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.warning.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub dataset: String,
    pub entries: usize,
    pub loaded_at: Option<DateTime<Utc>>,
    pub age_seconds: Option<u64>,
    pub fresh: bool,
    pub refresh_count: u64,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct RefreshOutcome {
    last_error: Option<String>,
}

#[derive(Default)]
struct DatasetSlot {
    current: RwLock<Option<Arc<DatasetSnapshot>>>,
    // 同一資料集同時間只允許一個刷新序列；鎖由刷新 task 持有直到結果發布
    refresh: Arc<Mutex<RefreshOutcome>>,
    generation: AtomicU64,
    refresh_count: AtomicU64,
}

impl DatasetSlot {
    async fn snapshot(&self) -> Option<Arc<DatasetSnapshot>> {
        self.current.read().await.clone()
    }

    async fn fresh(&self, ttl: Duration) -> Option<Arc<DatasetSnapshot>> {
        self.snapshot().await.filter(|s| s.is_fresh(ttl))
    }
}

/// 每個資料集一份記憶體快照，TTL 到期後以 single-flight 方式從後端分頁重新載入。
///
/// Snapshots are published by swapping an `Arc`; callers holding an older snapshot keep
/// reading it undisturbed. A refresh runs on its own task, so a caller that is dropped
/// mid-refresh does not cancel it and queued callers still receive its result.
pub struct ReferenceDataCache<S: ReferenceStore> {
    store: Arc<S>,
    config: CacheConfig,
    slots: Mutex<HashMap<String, Arc<DatasetSlot>>>,
}

impl<S: ReferenceStore + 'static> ReferenceDataCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    pub fn with_config(store: S, config: CacheConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 實際使用的分頁大小，不超過後端上限
    pub fn page_size(&self) -> usize {
        effective_page_size(&self.config, self.store.as_ref())
    }

    async fn slot(&self, dataset: &str) -> Arc<DatasetSlot> {
        let mut slots = self.slots.lock().await;
        slots.entry(dataset.to_string()).or_default().clone()
    }

    pub async fn get(&self, dataset: &str) -> Result<CacheLookup> {
        let slot = self.slot(dataset).await;

        if let Some(snapshot) = slot.fresh(self.config.ttl).await {
            return Ok(CacheLookup::fresh(snapshot));
        }

        let observed = slot.generation.load(Ordering::Acquire);
        let outcome = Arc::clone(&slot.refresh).lock_owned().await;

        if slot.generation.load(Ordering::Acquire) != observed {
            // 等待鎖的期間已有其他呼叫者完成刷新，沿用其結果
            if let Some(lookup) = Self::settled(dataset, &slot, &outcome).await? {
                tracing::debug!("♻️ {}: reusing result of concurrent refresh", dataset);
                return Ok(lookup);
            }
        } else if let Some(snapshot) = slot.fresh(self.config.ttl).await {
            return Ok(CacheLookup::fresh(snapshot));
        }

        tracing::info!("🔄 Refreshing reference dataset '{}'", dataset);
        slot.refresh_count.fetch_add(1, Ordering::Relaxed);

        let refresh = tokio::spawn(refresh_dataset(
            Arc::clone(&self.store),
            self.config.clone(),
            dataset.to_string(),
            slot,
            outcome,
        ));

        refresh.await.map_err(|e| ComplianceError::CacheUnavailable {
            dataset: dataset.to_string(),
            reason: format!("refresh task aborted: {}", e),
        })?
    }

    async fn settled(
        dataset: &str,
        slot: &DatasetSlot,
        outcome: &RefreshOutcome,
    ) -> Result<Option<CacheLookup>> {
        let current = slot.snapshot().await;
        match (&outcome.last_error, current) {
            (None, Some(snapshot)) => Ok(Some(CacheLookup::fresh(snapshot))),
            (Some(reason), Some(snapshot)) => Ok(Some(CacheLookup::stale(snapshot, reason))),
            (Some(reason), None) => Err(ComplianceError::CacheUnavailable {
                dataset: dataset.to_string(),
                reason: reason.clone(),
            }),
            // 刷新成功後又被 invalidate，需要重新載入
            (None, None) => Ok(None),
        }
    }

    /// 捨棄快照，下一次 `get` 會重新載入
    pub async fn invalidate(&self, dataset: &str) {
        let slot = self.slot(dataset).await;
        *slot.current.write().await = None;
        tracing::info!("🗑️ Invalidated reference dataset '{}'", dataset);
    }

    pub async fn stats(&self) -> Vec<DatasetStats> {
        let slots: Vec<(String, Arc<DatasetSlot>)> = {
            let slots = self.slots.lock().await;
            slots.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut stats = Vec::with_capacity(slots.len());
        for (dataset, slot) in slots {
            let snapshot = slot.snapshot().await;
            let last_error = match slot.refresh.try_lock() {
                Ok(outcome) => outcome.last_error.clone(),
                Err(_) => None,
            };
            stats.push(DatasetStats {
                dataset,
                entries: snapshot.as_ref().map_or(0, |s| s.len()),
                loaded_at: snapshot.as_ref().map(|s| s.loaded_at()),
                age_seconds: snapshot.as_ref().map(|s| s.age().as_secs()),
                fresh: snapshot.as_ref().is_some_and(|s| s.is_fresh(self.config.ttl)),
                refresh_count: slot.refresh_count.load(Ordering::Relaxed),
                last_error,
            });
        }
        stats.sort_by(|a, b| a.dataset.cmp(&b.dataset));
        stats
    }

    /// 同時預先載入多個資料集，回傳各資料集的筆數或錯誤（順序與輸入相同）
    pub async fn warm_up(self: &Arc<Self>, datasets: &[String]) -> Vec<(String, Result<usize>)> {
        let mut tasks = tokio::task::JoinSet::new();
        for (index, dataset) in datasets.iter().cloned().enumerate() {
            let cache = Arc::clone(self);
            tasks.spawn(async move {
                let result = cache.get(&dataset).await.map(|lookup| lookup.snapshot.len());
                (index, dataset, result)
            });
        }

        let mut results = Vec::with_capacity(datasets.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!("❌ Warm-up task aborted: {}", e),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, dataset, result)| (dataset, result))
            .collect()
    }
}

fn effective_page_size<S: ReferenceStore>(config: &CacheConfig, store: &S) -> usize {
    config.page_size.min(store.max_page_size()).max(1)
}

/// 執行一次完整的分頁載入並發布結果；持有刷新鎖直到世代號遞增
async fn refresh_dataset<S: ReferenceStore>(
    store: Arc<S>,
    config: CacheConfig,
    dataset: String,
    slot: Arc<DatasetSlot>,
    mut outcome: OwnedMutexGuard<RefreshOutcome>,
) -> Result<CacheLookup> {
    let lookup = match fetch_all(store.as_ref(), &config, &dataset).await {
        Ok(entries) => {
            let snapshot = Arc::new(DatasetSnapshot::new(&dataset, entries));
            *slot.current.write().await = Some(snapshot.clone());
            outcome.last_error = None;
            tracing::info!("✅ Loaded {} entries for '{}'", snapshot.len(), dataset);
            Ok(CacheLookup::fresh(snapshot))
        }
        Err(e) => {
            let reason = e.to_string();
            outcome.last_error = Some(reason.clone());
            match slot.snapshot().await {
                Some(previous) => {
                    tracing::warn!("⚠️ Refresh of '{}' failed, serving stale snapshot: {}", dataset, reason);
                    Ok(CacheLookup::stale(previous, &reason))
                }
                None => {
                    tracing::error!("❌ Refresh of '{}' failed with no snapshot to fall back on: {}", dataset, reason);
                    Err(ComplianceError::CacheUnavailable { dataset, reason })
                }
            }
        }
    };

    slot.generation.fetch_add(1, Ordering::Release);
    lookup
}

/// 逐頁讀取直到某頁筆數少於分頁大小
async fn fetch_all<S: ReferenceStore>(store: &S, config: &CacheConfig, dataset: &str) -> Result<Vec<ReferenceEntry>> {
    let page_size = effective_page_size(config, store);
    let mut entries = Vec::new();
    let mut offset = 0;

    for page_number in 0..config.max_pages {
        let request = store.list_active(dataset, offset, page_size);
        let page = tokio::time::timeout(config.fetch_timeout, request)
            .await
            .map_err(|_| ComplianceError::FetchTimeout {
                dataset: dataset.to_string(),
                offset,
                timeout_ms: config.fetch_timeout.as_millis() as u64,
            })??;

        let count = page.len();
        tracing::debug!(
            "📥 {}: page {} (offset {}) returned {} rows",
            dataset,
            page_number + 1,
            offset,
            count
        );
        entries.extend(page);

        if count < page_size {
            return Ok(entries);
        }
        offset += count;
    }

    Err(ComplianceError::PaginationLimitExceeded {
        dataset: dataset.to_string(),
        max_pages: config.max_pages,
    })
}
