use crate::domain::model::{RecordTable, Value};
use crate::domain::rules::ProcessingRules;
use crate::utils::error::{Result, WorkflowError};

/// Rows of a single office, re-indexed from zero.
#[derive(Debug, Clone, PartialEq)]
pub struct OfficeGroup {
    pub office: Value,
    pub table: RecordTable,
}

impl OfficeGroup {
    /// Office name as used in file names and messages.
    pub fn label(&self) -> String {
        self.office.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
    pub eligible: Vec<OfficeGroup>,
    pub pending: Vec<String>,
}

/// Splits `table` by office in first-occurrence order. An office whose rows all
/// carry a departure date becomes an eligible group; any gap sends the whole
/// office to `pending`.
pub fn partition_by_office(table: &RecordTable, rules: &ProcessingRules) -> Result<Partition> {
    let office_col = table.require_column(&rules.office_column)?;
    let departure_col = table.require_column(&rules.departure_date_column)?;

    // (office, row indices) in first-occurrence order
    let mut groups: Vec<(&Value, Vec<usize>)> = Vec::new();
    for (index, row) in table.rows().enumerate() {
        let office = &row[office_col];
        match groups.iter().position(|(key, _)| *key == office) {
            Some(pos) => groups[pos].1.push(index),
            None => groups.push((office, vec![index])),
        }
    }

    let mut partition = Partition::default();
    for (office, indices) in groups {
        let complete = indices
            .iter()
            .filter_map(|&i| table.row(i))
            .all(|row| !row[departure_col].is_missing());

        if complete {
            partition.eligible.push(OfficeGroup {
                office: office.clone(),
                table: table.select_rows(&indices),
            });
        } else {
            tracing::debug!(
                "Office '{}' held back: missing '{}'",
                office,
                rules.departure_date_column
            );
            partition.pending.push(office.to_string());
        }
    }

    Ok(partition)
}

/// Number of rows without a departure date.
fn count_missing_departures(table: &RecordTable, rules: &ProcessingRules) -> Result<usize> {
    let departure_col = table.require_column(&rules.departure_date_column)?;
    Ok(table
        .column_values(departure_col)
        .filter(|v| v.is_missing())
        .count())
}

/// Gate used when the table is emitted whole: every row needs a departure date.
pub fn check_complete(table: &RecordTable, rules: &ProcessingRules) -> Result<()> {
    match count_missing_departures(table, rules)? {
        0 => Ok(()),
        missing_rows => Err(WorkflowError::IncompleteData {
            column: rules.departure_date_column.clone(),
            missing_rows,
        }),
    }
}
