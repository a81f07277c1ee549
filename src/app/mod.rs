pub mod pipelines;
pub mod workflow;

pub use pipelines::SheetPipeline;
pub use workflow::{process_request, Phase, Workflow, WorkflowRequest, WorkflowState};
