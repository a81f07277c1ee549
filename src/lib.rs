pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{StaticConfig, TomlConfig};

pub use adapters::{LocalStorage, MemorySink, SourceWorkbook};
pub use app::{process_request, Phase, SheetPipeline, Workflow, WorkflowRequest, WorkflowState};
pub use crate::core::{emitter::emit, emitter::EmitLayout, etl::EtlEngine};
pub use domain::area::Area;
pub use domain::model::{OutputBlob, ProcessingMode, RecordTable, Value, WorkflowReport};
pub use domain::rules::ProcessingRules;
pub use utils::error::{Result, WorkflowError};
