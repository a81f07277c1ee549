use crate::core::ConfigProvider;
use crate::domain::rules::ProcessingRules;
use crate::utils::error::{Result, WorkflowError};
use crate::utils::validation::{validate_path, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File configuration. Every section is optional; absent keys keep the
/// defaults of `ProcessingRules`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,

    #[serde(skip)]
    resolved: ProcessingRules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnsConfig {
    pub office: Option<String>,
    pub category: Option<String>,
    pub departure_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    pub not_categorized_label: Option<String>,
    pub not_categorized_value: Option<f64>,
    pub designation_note_label: Option<String>,
    pub trailing_columns: Option<usize>,
    pub date_columns: Option<Vec<usize>>,
    pub date_format: Option<String>,
    /// Empty string disables the reserved sheet check.
    pub reserved_sheet: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: Option<String>,
    pub sheet_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| WorkflowError::ConfigError {
                message: format!("cannot read {}: {}", path.display(), e),
            })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        let mut config: TomlConfig =
            toml::from_str(&processed_content).map_err(|e| WorkflowError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.resolved = config.build_rules();
        Ok(config)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    fn build_rules(&self) -> ProcessingRules {
        let defaults = ProcessingRules::default();
        let columns = self.columns.clone();
        let rules = self.rules.clone();

        ProcessingRules {
            office_column: columns.office.unwrap_or(defaults.office_column),
            category_column: columns.category.unwrap_or(defaults.category_column),
            departure_date_column: columns
                .departure_date
                .unwrap_or(defaults.departure_date_column),
            not_categorized_label: rules
                .not_categorized_label
                .unwrap_or(defaults.not_categorized_label),
            not_categorized_value: rules
                .not_categorized_value
                .unwrap_or(defaults.not_categorized_value),
            designation_note_label: rules
                .designation_note_label
                .unwrap_or(defaults.designation_note_label),
            trailing_columns: rules.trailing_columns.unwrap_or(defaults.trailing_columns),
            date_columns: rules.date_columns.unwrap_or(defaults.date_columns),
            date_format: rules.date_format.unwrap_or(defaults.date_format),
            output_sheet_name: self
                .output
                .sheet_name
                .clone()
                .unwrap_or(defaults.output_sheet_name),
            reserved_sheet: match rules.reserved_sheet {
                Some(sheet) if sheet.is_empty() => None,
                Some(sheet) => Some(sheet),
                None => defaults.reserved_sheet,
            },
        }
    }

    pub fn processing_rules(&self) -> &ProcessingRules {
        &self.resolved
    }

    pub fn output_path(&self) -> &str {
        self.output.path.as_deref().unwrap_or("./output")
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn output_path(&self) -> &str {
        self.output_path()
    }

    fn rules(&self) -> &ProcessingRules {
        &self.resolved
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring_enabled()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_path("output.path", self.output_path())?;
        self.resolved.validate()
    }
}
