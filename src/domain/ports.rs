use crate::domain::model::{CheckerKind, ComplianceReport, ReferenceEntry};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 參考資料的後端儲存。單次請求最多回傳 `max_page_size` 筆，超過的部分會被靜默截斷。
pub trait ReferenceStore: Send + Sync {
    fn max_page_size(&self) -> usize;

    fn list_active(
        &self,
        dataset: &str,
        offset: usize,
        page_size: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ReferenceEntry>>> + Send;
}

pub trait DatasetNames: Send + Sync {
    fn gras_dataset(&self) -> &str;
    fn odi_dataset(&self) -> &str;
    fn ndi_dataset(&self) -> &str;
    fn allergen_dataset(&self) -> &str;
}

#[async_trait]
pub trait ComplianceChecker: Send + Sync {
    fn kind(&self) -> CheckerKind;
    async fn check(&self, ingredients: &[String]) -> Result<ComplianceReport>;
}
