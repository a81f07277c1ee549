//! Step-by-step controller for one processing run.
//!
//! The host feeds selections in the order a person makes them: area, file,
//! sheet, then run. Missing selections are prompts and leave the state alone;
//! malformed input moves the controller to `Invalid`, which only a new
//! `Workflow` gets out of.

use crate::adapters::workbook::SourceWorkbook;
use crate::app::pipelines::SheetPipeline;
use crate::core::etl::EtlEngine;
use crate::core::{BlobSink, ConfigProvider};
use crate::domain::area::Area;
use crate::domain::model::{ProcessingMode, WorkflowReport};
use crate::domain::rules::ProcessingRules;
use crate::utils::error::{Result, WorkflowError};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    AwaitingArea,
    AwaitingFile {
        area: Area,
    },
    AwaitingSheet {
        area: Area,
        workbook: SourceWorkbook,
    },
    ReadyNoSplit {
        area: Area,
        workbook: SourceWorkbook,
        sheet: String,
    },
    ReadySplit {
        area: Area,
        workbook: SourceWorkbook,
        sheet: String,
    },
    Done(WorkflowReport),
    Invalid {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingArea,
    AwaitingFile,
    AwaitingSheet,
    ReadyNoSplit,
    ReadySplit,
    Done,
    Invalid,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AwaitingArea => "awaiting area",
            Phase::AwaitingFile => "awaiting file",
            Phase::AwaitingSheet => "awaiting sheet",
            Phase::ReadyNoSplit => "ready (whole table)",
            Phase::ReadySplit => "ready (split by office)",
            Phase::Done => "done",
            Phase::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

impl WorkflowState {
    pub fn phase(&self) -> Phase {
        match self {
            WorkflowState::AwaitingArea => Phase::AwaitingArea,
            WorkflowState::AwaitingFile { .. } => Phase::AwaitingFile,
            WorkflowState::AwaitingSheet { .. } => Phase::AwaitingSheet,
            WorkflowState::ReadyNoSplit { .. } => Phase::ReadyNoSplit,
            WorkflowState::ReadySplit { .. } => Phase::ReadySplit,
            WorkflowState::Done(_) => Phase::Done,
            WorkflowState::Invalid { .. } => Phase::Invalid,
        }
    }
}

/// Splitting is mandatory for office-bearing areas and opt-in for the rest.
pub fn resolve_mode(area: Area, split_by_office: bool) -> ProcessingMode {
    if area.requires_office_split() || split_by_office {
        ProcessingMode::SplitByOffice
    } else {
        ProcessingMode::WholeTable
    }
}

pub struct Workflow {
    state: WorkflowState,
    split_by_office: bool,
    rules: ProcessingRules,
    monitor_enabled: bool,
}

impl Workflow {
    pub fn new(rules: ProcessingRules) -> Self {
        Self {
            state: WorkflowState::AwaitingArea,
            split_by_office: false,
            rules,
            monitor_enabled: false,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        let mut workflow = Self::new(config.rules().clone());
        workflow.monitor_enabled = config.monitoring_enabled();
        workflow
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn rules(&self) -> &ProcessingRules {
        &self.rules
    }

    /// Sets the toggle; a ready workflow is re-resolved against it.
    pub fn set_split_by_office(&mut self, split: bool) {
        self.split_by_office = split;
        let state = std::mem::replace(&mut self.state, WorkflowState::AwaitingArea);
        self.state = match state {
            WorkflowState::ReadyNoSplit {
                area,
                workbook,
                sheet,
            }
            | WorkflowState::ReadySplit {
                area,
                workbook,
                sheet,
            } => self.ready(area, workbook, sheet),
            other => other,
        };
    }

    pub fn select_area(&mut self, area: Area) -> Result<()> {
        self.expect_phase(Phase::AwaitingArea)?;
        if !area.is_selected() {
            return Err(WorkflowError::MissingSelection {
                what: "area".to_string(),
            });
        }
        tracing::debug!("Area selected: {}", area);
        self.state = WorkflowState::AwaitingFile { area };
        Ok(())
    }

    pub fn select_area_name(&mut self, name: &str) -> Result<()> {
        self.expect_phase(Phase::AwaitingArea)?;
        let area = name.parse::<Area>().map_err(|e| self.invalidate(e))?;
        self.select_area(area)
    }

    /// Accepts the uploaded file; unreadable or unsupported files invalidate the run.
    pub fn upload(&mut self, filename: &str, bytes: Vec<u8>) -> Result<()> {
        self.expect_phase(Phase::AwaitingFile)?;
        let workbook = SourceWorkbook::from_bytes(filename, bytes).map_err(|e| self.invalidate(e))?;
        self.accept_workbook(workbook)
    }

    pub fn accept_workbook(&mut self, workbook: SourceWorkbook) -> Result<()> {
        let area = match &self.state {
            WorkflowState::AwaitingFile { area } => *area,
            other => return Err(wrong_phase(other.phase(), Phase::AwaitingFile)),
        };
        tracing::debug!(
            "Workbook '{}' has {} sheet(s)",
            workbook.filename(),
            workbook.sheet_names().len()
        );
        self.state = WorkflowState::AwaitingSheet { area, workbook };
        Ok(())
    }

    /// Sheets available for selection once a workbook is uploaded.
    pub fn sheet_names(&self) -> &[String] {
        match &self.state {
            WorkflowState::AwaitingSheet { workbook, .. }
            | WorkflowState::ReadyNoSplit { workbook, .. }
            | WorkflowState::ReadySplit { workbook, .. } => workbook.sheet_names(),
            _ => &[],
        }
    }

    pub fn select_sheet(&mut self, sheet: &str) -> Result<()> {
        self.expect_phase(Phase::AwaitingSheet)?;
        if sheet.trim().is_empty() {
            return Err(WorkflowError::MissingSelection {
                what: "sheet".to_string(),
            });
        }

        let checked = match &self.state {
            WorkflowState::AwaitingSheet { workbook, .. } => workbook.check_sheet(sheet, &self.rules),
            other => Err(wrong_phase(other.phase(), Phase::AwaitingSheet)),
        };
        checked.map_err(|e| self.invalidate(e))?;

        let state = std::mem::replace(&mut self.state, WorkflowState::AwaitingArea);
        self.state = match state {
            WorkflowState::AwaitingSheet { area, workbook } => {
                self.ready(area, workbook, sheet.to_string())
            }
            other => other,
        };
        tracing::debug!("Sheet '{}' selected, {}", sheet, self.phase());
        Ok(())
    }

    /// Runs the ready pipeline and routes its blobs to `sink`.
    pub async fn run<K: BlobSink>(&mut self, sink: &K) -> Result<WorkflowReport> {
        let outcome = {
            let (area, workbook, sheet, mode) = match &self.state {
                WorkflowState::ReadySplit {
                    area,
                    workbook,
                    sheet,
                } => (*area, workbook, sheet.as_str(), ProcessingMode::SplitByOffice),
                WorkflowState::ReadyNoSplit {
                    area,
                    workbook,
                    sheet,
                } => (*area, workbook, sheet.as_str(), ProcessingMode::WholeTable),
                other => {
                    return Err(WorkflowError::InvalidState {
                        reason: format!("cannot run while {}", other.phase()),
                    })
                }
            };

            tracing::info!("Processing '{}' for {} ({:?})", sheet, area, mode);
            let pipeline = SheetPipeline::new(workbook, sheet, area, mode, &self.rules, sink);
            EtlEngine::new_with_monitoring(pipeline, self.monitor_enabled)
                .run()
                .await
        };

        match outcome {
            Ok(report) => {
                self.state = WorkflowState::Done(report.clone());
                Ok(report)
            }
            Err(e) => Err(self.invalidate(e)),
        }
    }

    fn ready(&self, area: Area, workbook: SourceWorkbook, sheet: String) -> WorkflowState {
        match resolve_mode(area, self.split_by_office) {
            ProcessingMode::SplitByOffice => WorkflowState::ReadySplit {
                area,
                workbook,
                sheet,
            },
            ProcessingMode::WholeTable => WorkflowState::ReadyNoSplit {
                area,
                workbook,
                sheet,
            },
        }
    }

    fn expect_phase(&self, expected: Phase) -> Result<()> {
        match self.phase() {
            phase if phase == expected => Ok(()),
            phase => Err(wrong_phase(phase, expected)),
        }
    }

    fn invalidate(&mut self, error: WorkflowError) -> WorkflowError {
        tracing::warn!("Workflow invalidated: {}", error);
        self.state = WorkflowState::Invalid {
            reason: error.to_string(),
        };
        error
    }
}

fn wrong_phase(actual: Phase, expected: Phase) -> WorkflowError {
    WorkflowError::InvalidState {
        reason: format!("expected {}, workflow is {}", expected, actual),
    }
}

/// Everything a host collects from the person before processing starts.
#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub area: Area,
    pub split_by_office: bool,
    pub workbook: Option<SourceWorkbook>,
    pub sheet: Option<String>,
}

/// Drives a fresh `Workflow` through every step of `request`.
pub async fn process_request<C, K>(
    request: WorkflowRequest,
    config: &C,
    sink: &K,
) -> Result<WorkflowReport>
where
    C: ConfigProvider,
    K: BlobSink,
{
    let mut workflow = Workflow::from_config(config);
    workflow.set_split_by_office(request.split_by_office);
    workflow.select_area(request.area)?;

    let workbook = request.workbook.ok_or_else(|| WorkflowError::MissingSelection {
        what: "file".to_string(),
    })?;
    workflow.accept_workbook(workbook)?;

    let sheet = request.sheet.ok_or_else(|| WorkflowError::MissingSelection {
        what: "sheet".to_string(),
    })?;
    workflow.select_sheet(&sheet)?;

    workflow.run(sink).await
}
