use crate::domain::model::{OutputBlob, RecordTable, TransformResult, WorkflowReport};
use crate::domain::rules::ProcessingRules;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Receives finished spreadsheets; returns where the blob ended up.
pub trait BlobSink: Send + Sync {
    fn deliver(
        &self,
        blob: &OutputBlob,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn rules(&self) -> &ProcessingRules;
    fn monitoring_enabled(&self) -> bool {
        false
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RecordTable>;
    async fn transform(&self, table: RecordTable) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<WorkflowReport>;
}
