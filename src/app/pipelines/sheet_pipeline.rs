use crate::adapters::storage::sanitize_filename;
use crate::adapters::workbook::SourceWorkbook;
use crate::core::emitter::{emit, EmitLayout};
use crate::core::normalizer::normalize;
use crate::core::partitioner::{check_complete, partition_by_office};
use crate::core::trimmer::trim_trailing;
use crate::core::{BlobSink, Pipeline};
use crate::domain::area::Area;
use crate::domain::model::{
    DeliveredBlob, Diagnostic, OutputBlob, ProcessingMode, RecordTable, TransformResult,
    WorkflowReport,
};
use crate::domain::rules::ProcessingRules;
use crate::utils::error::{Result, WorkflowError};
use std::collections::HashSet;

/// One sheet of one uploaded workbook, processed for one area.
pub struct SheetPipeline<'a, K: BlobSink> {
    pub(crate) workbook: &'a SourceWorkbook,
    pub(crate) sheet: &'a str,
    pub(crate) area: Area,
    pub(crate) mode: ProcessingMode,
    pub(crate) rules: &'a ProcessingRules,
    pub(crate) sink: &'a K,
}

impl<'a, K: BlobSink> SheetPipeline<'a, K> {
    pub fn new(
        workbook: &'a SourceWorkbook,
        sheet: &'a str,
        area: Area,
        mode: ProcessingMode,
        rules: &'a ProcessingRules,
        sink: &'a K,
    ) -> Self {
        Self {
            workbook,
            sheet,
            area,
            mode,
            rules,
            sink,
        }
    }

    fn split_by_office(&self, table: RecordTable) -> Result<TransformResult> {
        let rows_in = table.row_count();
        let normalized = normalize(&table, self.rules)?;
        let trimmed = trim_trailing(&normalized, self.rules.trailing_columns)?;
        let partition = partition_by_office(&trimmed, self.rules)?;

        // every eligible group is emitted before anything is delivered
        let layout = EmitLayout::from_rules(self.rules);
        let mut blobs = Vec::with_capacity(partition.eligible.len());
        let mut rows_out = 0;
        for group in &partition.eligible {
            let bytes = emit(&group.table, &layout)?;
            tracing::debug!(
                "Office '{}': {} rows, {} bytes",
                group.label(),
                group.table.row_count(),
                bytes.len()
            );
            rows_out += group.table.row_count();
            blobs.push(OutputBlob::for_office(self.area, &group.label(), bytes));
        }
        make_filenames_distinct(&mut blobs);

        let mut diagnostics = Vec::new();
        if !partition.pending.is_empty() {
            diagnostics.push(Diagnostic::PendingOffices {
                offices: partition.pending.clone(),
            });
        }

        Ok(TransformResult {
            blobs,
            pending_offices: partition.pending,
            diagnostics,
            rows_in,
            rows_out,
        })
    }

    fn whole_table(&self, table: RecordTable) -> Result<TransformResult> {
        let rows_in = table.row_count();

        match check_complete(&table, self.rules) {
            Ok(()) => {}
            Err(WorkflowError::IncompleteData {
                column,
                missing_rows,
            }) => {
                tracing::info!(
                    "{} row(s) without '{}', nothing emitted",
                    missing_rows,
                    column
                );
                return Ok(TransformResult {
                    blobs: Vec::new(),
                    pending_offices: Vec::new(),
                    diagnostics: vec![Diagnostic::IncompleteTable { missing_rows }],
                    rows_in,
                    rows_out: 0,
                });
            }
            Err(e) => return Err(e),
        }

        let bytes = emit(&table, &EmitLayout::from_rules(self.rules))?;
        Ok(TransformResult {
            blobs: vec![OutputBlob::for_whole_table(self.area, bytes)],
            pending_offices: Vec::new(),
            diagnostics: Vec::new(),
            rows_in,
            rows_out: rows_in,
        })
    }
}

/// Office labels come from cell text, so two offices can map to the same file
/// name ("A/B" and "A_B", or "12" as text and as a number). Later ones get a
/// ` (2)`, ` (3)` suffix.
fn make_filenames_distinct(blobs: &mut [OutputBlob]) {
    let mut taken = HashSet::new();
    for blob in blobs.iter_mut() {
        let mut candidate = blob.filename.clone();
        let mut n = 1;
        // compared as written to disk, ignoring case
        while !taken.insert(sanitize_filename(&candidate).to_lowercase()) {
            n += 1;
            candidate = numbered(&blob.filename, n);
        }
        if candidate != blob.filename {
            tracing::warn!(
                "'{}' clashes with an earlier office, writing '{}'",
                blob.filename,
                candidate
            );
            blob.filename = candidate;
        }
    }
}

fn numbered(filename: &str, n: usize) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{} ({}).{}", stem, n, ext),
        None => format!("{} ({})", filename, n),
    }
}

#[async_trait::async_trait]
impl<'a, K: BlobSink> Pipeline for SheetPipeline<'a, K> {
    async fn extract(&self) -> Result<RecordTable> {
        tracing::debug!(
            "Reading sheet '{}' of '{}'",
            self.sheet,
            self.workbook.filename()
        );
        self.workbook.read_table(self.sheet, self.rules)
    }

    async fn transform(&self, table: RecordTable) -> Result<TransformResult> {
        match self.mode {
            ProcessingMode::SplitByOffice => self.split_by_office(table),
            ProcessingMode::WholeTable => self.whole_table(table),
        }
    }

    async fn load(&self, result: TransformResult) -> Result<WorkflowReport> {
        let mut delivered = Vec::with_capacity(result.blobs.len());
        for blob in &result.blobs {
            let location = self.sink.deliver(blob).await?;
            delivered.push(DeliveredBlob {
                filename: blob.filename.clone(),
                label: blob.label.clone(),
                location,
                size: blob.bytes.len(),
            });
        }

        Ok(WorkflowReport {
            area: self.area.name().to_string(),
            mode: self.mode,
            delivered,
            pending_offices: result.pending_offices,
            diagnostics: result.diagnostics,
        })
    }
}
