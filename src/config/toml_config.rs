use crate::core::cache::{CacheConfig, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, DEFAULT_TTL};
use crate::core::declaration::EscalationPolicy;
use crate::core::DatasetNames;
use crate::domain::model::DatasetKind;
use crate::utils::error::{ComplianceError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    pub engine: Option<EngineInfo>,
    pub store: StoreConfig,
    pub cache: Option<CacheSettings>,
    #[serde(default)]
    pub datasets: DatasetsConfig,
    pub escalation: Option<EscalationConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub r#type: String,
    pub endpoint: Option<String>,
    pub directory: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_page_size: Option<usize>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub ttl_hours: Option<u64>,
    pub page_size: Option<usize>,
    pub fetch_timeout_seconds: Option<u64>,
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsConfig {
    #[serde(default = "default_gras")]
    pub gras: String,
    #[serde(default = "default_odi")]
    pub odi: String,
    #[serde(default = "default_ndi")]
    pub ndi: String,
    #[serde(default = "default_allergens")]
    pub allergens: String,
}

fn default_gras() -> String {
    "gras_substances".to_string()
}

fn default_odi() -> String {
    "old_dietary_ingredients".to_string()
}

fn default_ndi() -> String {
    "ndi_notifications".to_string()
}

fn default_allergens() -> String {
    "major_allergens".to_string()
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            gras: default_gras(),
            odi: default_odi(),
            ndi: default_ndi(),
            allergens: default_allergens(),
        }
    }
}

impl DatasetsConfig {
    /// 資料集名稱與種類的對照，供後端把資料列轉成對應的條目
    pub fn kinds(&self) -> HashMap<String, DatasetKind> {
        HashMap::from([
            (self.gras.clone(), DatasetKind::Gras),
            (self.odi.clone(), DatasetKind::Odi),
            (self.ndi.clone(), DatasetKind::Ndi),
            (self.allergens.clone(), DatasetKind::Allergen),
        ])
    }

    pub fn all(&self) -> Vec<String> {
        vec![
            self.gras.clone(),
            self.odi.clone(),
            self.ndi.clone(),
            self.allergens.clone(),
        ]
    }
}

impl DatasetNames for DatasetsConfig {
    fn gras_dataset(&self) -> &str {
        &self.gras
    }

    fn odi_dataset(&self) -> &str {
        &self.odi
    }

    fn ndi_dataset(&self) -> &str {
        &self.ndi
    }

    fn allergen_dataset(&self) -> &str {
        &self.allergens
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    pub parenthetical_declarations: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Http,
    Csv,
}

impl ComplianceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ComplianceError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ComplianceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${REFERENCE_API_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn store_kind(&self) -> Result<StoreKind> {
        match self.store.r#type.to_lowercase().as_str() {
            "http" | "rest" => Ok(StoreKind::Http),
            "csv" => Ok(StoreKind::Csv),
            other => Err(ComplianceError::InvalidConfigValueError {
                field: "store.type".to_string(),
                value: other.to_string(),
                reason: "Supported store types: http, csv".to_string(),
            }),
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        match self.store_kind()? {
            StoreKind::Http => {
                let endpoint = validation::validate_required_field("store.endpoint", &self.store.endpoint)?;
                validation::validate_url("store.endpoint", endpoint)?;
            }
            StoreKind::Csv => {
                let directory = validation::validate_required_field("store.directory", &self.store.directory)?;
                validation::validate_path("store.directory", directory)?;
            }
        }

        if let Some(max_page_size) = self.store.max_page_size {
            validation::validate_positive_number("store.max_page_size", max_page_size, 1)?;
        }
        if let Some(timeout) = self.store.timeout_seconds {
            validation::validate_range("store.timeout_seconds", timeout, 1, 300)?;
        }

        if let Some(cache) = &self.cache {
            if let Some(ttl_hours) = cache.ttl_hours {
                validation::validate_range("cache.ttl_hours", ttl_hours, 1, 720)?;
            }
            if let Some(page_size) = cache.page_size {
                validation::validate_positive_number("cache.page_size", page_size, 1)?;
            }
            if let Some(timeout) = cache.fetch_timeout_seconds {
                validation::validate_range("cache.fetch_timeout_seconds", timeout, 1, 300)?;
            }
            if let Some(max_pages) = cache.max_pages {
                validation::validate_positive_number("cache.max_pages", max_pages, 1)?;
            }
        }

        validation::validate_dataset_name("datasets.gras", &self.datasets.gras)?;
        validation::validate_dataset_name("datasets.odi", &self.datasets.odi)?;
        validation::validate_dataset_name("datasets.ndi", &self.datasets.ndi)?;
        validation::validate_dataset_name("datasets.allergens", &self.datasets.allergens)?;

        // 四個資料集必須各自獨立，否則種類對照會互相覆蓋
        if self.datasets.kinds().len() != 4 {
            return Err(ComplianceError::ConfigValidationError {
                field: "datasets".to_string(),
                message: "Each dataset must have a distinct name".to_string(),
            });
        }

        if let Some(level) = self.log_level() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level) {
                return Err(ComplianceError::InvalidConfigValueError {
                    field: "monitoring.log_level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        Ok(())
    }

    pub fn max_page_size(&self) -> usize {
        self.store.max_page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        self.store.timeout_seconds.map(Duration::from_secs)
    }

    pub fn headers(&self) -> HashMap<String, String> {
        self.store.headers.clone().unwrap_or_default()
    }

    pub fn cache_config(&self) -> CacheConfig {
        let settings = self.cache.as_ref();
        CacheConfig {
            ttl: settings
                .and_then(|c| c.ttl_hours)
                .map(|h| Duration::from_secs(h * 60 * 60))
                .unwrap_or(DEFAULT_TTL),
            page_size: settings.and_then(|c| c.page_size).unwrap_or(DEFAULT_PAGE_SIZE),
            fetch_timeout: settings
                .and_then(|c| c.fetch_timeout_seconds)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT),
            max_pages: settings.and_then(|c| c.max_pages).unwrap_or(DEFAULT_MAX_PAGES),
        }
    }

    pub fn escalation_policy(&self) -> EscalationPolicy {
        EscalationPolicy {
            parenthetical_declarations: self
                .escalation
                .as_ref()
                .and_then(|e| e.parenthetical_declarations)
                .unwrap_or(false),
        }
    }

    /// 日誌與報告中使用的引擎名稱，未設定時使用套件名稱
    pub fn engine_name(&self) -> &str {
        self.engine
            .as_ref()
            .map(|e| e.name.as_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(env!("CARGO_PKG_NAME"))
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring.as_ref().and_then(|m| m.json_logs).unwrap_or(false)
    }
}

impl Validate for ComplianceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
