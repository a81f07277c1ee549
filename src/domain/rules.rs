use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};

/// Column names, sentinel labels and output layout used by every processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingRules {
    pub office_column: String,
    pub category_column: String,
    pub departure_date_column: String,
    pub not_categorized_label: String,
    pub not_categorized_value: f64,
    pub designation_note_label: String,
    pub trailing_columns: usize,
    pub date_columns: Vec<usize>,
    pub date_format: String,
    pub output_sheet_name: String,
    pub reserved_sheet: Option<String>,
}

impl Default for ProcessingRules {
    fn default() -> Self {
        Self {
            office_column: "Office".to_string(),
            category_column: "Category".to_string(),
            departure_date_column: "Departure Date of Position".to_string(),
            not_categorized_label: "NOT CATEGORIZED".to_string(),
            not_categorized_value: 999.0,
            designation_note_label: "Send designation note".to_string(),
            trailing_columns: 3,
            date_columns: vec![7, 8],
            date_format: "DD/MM/YYYY".to_string(),
            output_sheet_name: "Sheet1".to_string(),
            reserved_sheet: Some("HOJA".to_string()),
        }
    }
}

impl ProcessingRules {
    pub fn is_reserved_sheet(&self, sheet: &str) -> bool {
        self.reserved_sheet.as_deref() == Some(sheet)
    }
}

impl Validate for ProcessingRules {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("columns.office", &self.office_column)?;
        validate_non_empty_string("columns.category", &self.category_column)?;
        validate_non_empty_string("columns.departure_date", &self.departure_date_column)?;
        validate_non_empty_string("rules.date_format", &self.date_format)?;
        validate_non_empty_string("rules.output_sheet_name", &self.output_sheet_name)?;
        validate_positive_number("rules.date_columns", self.date_columns.len(), 1)?;
        // BIFF8 sheets stop at column IV
        validate_range("rules.trailing_columns", self.trailing_columns, 0, 255)?;
        for &index in &self.date_columns {
            validate_range("rules.date_columns", index, 0, 255)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let rules = ProcessingRules::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.date_columns, vec![7, 8]);
        assert_eq!(rules.trailing_columns, 3);
        assert!(rules.is_reserved_sheet("HOJA"));
        assert!(!rules.is_reserved_sheet("Hoja1"));
    }

    #[test]
    fn rejects_out_of_range_date_column() {
        let rules = ProcessingRules {
            date_columns: vec![7, 300],
            ..ProcessingRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn rejects_blank_column_name() {
        let rules = ProcessingRules {
            office_column: "  ".to_string(),
            ..ProcessingRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
