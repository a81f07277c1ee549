use crate::domain::model::{RecordTable, Value};
use crate::domain::rules::ProcessingRules;
use crate::utils::error::Result;

/// Replaces the "not categorized" label with its numeric sentinel and drops rows
/// flagged as awaiting a designation note. Row order is kept.
pub fn normalize(table: &RecordTable, rules: &ProcessingRules) -> Result<RecordTable> {
    let category = table.require_column(&rules.category_column)?;
    let departure = table.require_column(&rules.departure_date_column)?;

    let mut out = RecordTable::new(table.columns().to_vec());
    let mut substituted = 0usize;
    let mut dropped = 0usize;

    for row in table.rows() {
        if row[departure].as_text() == Some(rules.designation_note_label.as_str()) {
            dropped += 1;
            continue;
        }

        let mut row = row.to_vec();
        if row[category].as_text() == Some(rules.not_categorized_label.as_str()) {
            row[category] = Value::Number(rules.not_categorized_value);
            substituted += 1;
        }
        out.push_row(row)?;
    }

    tracing::debug!(
        "Normalized {} rows: {} category substitutions, {} designation-note rows dropped",
        table.row_count(),
        substituted,
        dropped
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::WorkflowError;
    use chrono::NaiveDate;

    fn table(rows: Vec<(&str, &str, Value)>) -> RecordTable {
        let columns = vec![
            "Name".to_string(),
            "Category".to_string(),
            "Departure Date of Position".to_string(),
        ];
        let rows = rows
            .into_iter()
            .map(|(name, category, departure)| {
                vec![Value::text(name), Value::text(category), departure]
            })
            .collect();
        RecordTable::from_rows(columns, rows).unwrap()
    }

    fn date() -> Value {
        Value::Date(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap())
    }

    #[test]
    fn replaces_not_categorized_with_sentinel() {
        let input = table(vec![
            ("Ana", "NOT CATEGORIZED", date()),
            ("Luis", "A", date()),
        ]);

        let out = normalize(&input, &ProcessingRules::default()).unwrap();

        assert_eq!(out.get(0, "Category"), Some(&Value::Number(999.0)));
        assert_eq!(out.get(1, "Category"), Some(&Value::text("A")));
    }

    #[test]
    fn drops_designation_note_rows_and_keeps_order() {
        let input = table(vec![
            ("Ana", "A", date()),
            ("Luis", "B", Value::text("Send designation note")),
            ("Eva", "C", Value::Missing),
        ]);

        let out = normalize(&input, &ProcessingRules::default()).unwrap();

        assert_eq!(out.row_count(), 2);
        assert_eq!(out.get(0, "Name"), Some(&Value::text("Ana")));
        assert_eq!(out.get(1, "Name"), Some(&Value::text("Eva")));
        // a missing departure date is not the sentinel; it survives normalization
        assert_eq!(out.get(1, "Departure Date of Position"), Some(&Value::Missing));
    }

    #[test]
    fn leaves_input_untouched() {
        let input = table(vec![("Ana", "NOT CATEGORIZED", date())]);
        let before = input.clone();
        let _ = normalize(&input, &ProcessingRules::default()).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn requires_category_column() {
        let input = RecordTable::new(vec!["Departure Date of Position".to_string()]);
        let err = normalize(&input, &ProcessingRules::default()).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingColumn { column } if column == "Category"));
    }
}
