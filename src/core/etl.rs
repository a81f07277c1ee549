use crate::core::Pipeline;
use crate::domain::model::WorkflowReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a pipeline through extract, transform and load.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<WorkflowReport> {
        tracing::info!("Starting workflow run");

        tracing::info!("Reading sheet...");
        let table = self.pipeline.extract().await?;
        tracing::info!(
            "Read {} rows across {} columns",
            table.row_count(),
            table.column_count()
        );
        self.monitor.log_phase("extract", table.row_count());

        tracing::info!("Processing rows...");
        let result = self.pipeline.transform(table).await?;
        tracing::info!(
            "Kept {} of {} rows in {} spreadsheet(s)",
            result.rows_out,
            result.rows_in,
            result.blobs.len()
        );
        self.monitor.log_phase("transform", result.rows_out);

        tracing::info!("Delivering spreadsheets...");
        let report = self.pipeline.load(result).await?;
        self.monitor.log_phase("load", report.delivered.len());

        for diagnostic in &report.diagnostics {
            tracing::warn!("{}", diagnostic.message());
        }
        self.monitor.log_final_stats();

        Ok(report)
    }
}
