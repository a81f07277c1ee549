use crate::domain::model::RecordTable;
use crate::utils::error::{Result, WorkflowError};

/// Removes the last `n` columns, keeping every other column and row as is.
pub fn trim_trailing(table: &RecordTable, n: usize) -> Result<RecordTable> {
    let count = table.column_count();
    if n > count {
        return Err(WorkflowError::InvalidArgument {
            message: format!(
                "cannot trim {} trailing columns from a table with {} columns",
                n, count
            ),
        });
    }

    let keep = count - n;
    let columns = table.columns()[..keep].to_vec();
    let rows = table.rows().map(|row| row[..keep].to_vec()).collect();

    tracing::debug!("Trimmed {} trailing columns ({} -> {})", n, count, keep);
    RecordTable::from_rows(columns, rows)
}
