pub mod sheet_pipeline;

pub use sheet_pipeline::SheetPipeline;
