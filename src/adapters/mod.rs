// Adapters for the outside world: uploaded workbooks in, spreadsheet blobs out.

pub mod memory;
pub mod storage;
pub mod workbook;

pub use memory::MemorySink;
pub use storage::LocalStorage;
pub use workbook::SourceWorkbook;
