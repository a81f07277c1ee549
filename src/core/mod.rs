pub mod biff;
pub mod emitter;
pub mod etl;
pub mod normalizer;
pub mod partitioner;
pub mod trimmer;

pub use crate::domain::model::{RecordTable, TransformResult, Value};
pub use crate::domain::ports::{BlobSink, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
