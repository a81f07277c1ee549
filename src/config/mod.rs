pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::rules::ProcessingRules;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

pub use toml_config::TomlConfig;

pub const DEFAULT_OUTPUT_PATH: &str = "./output";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "mensualizados")]
#[command(about = "Splits monthly personnel workbooks by office into GEDO-ready .xls files")]
pub struct CliConfig {
    /// Workbook to process (.xlsx or .xls)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long, help = "Sheet to process")]
    pub sheet: Option<String>,

    #[arg(long, help = "Area (secretariat) the workbook belongs to")]
    pub area: Option<String>,

    #[arg(long, help = "Split by office even when the area does not require it")]
    pub split_by_office: bool,

    #[arg(long, help = "Directory for the generated spreadsheets [default: ./output]")]
    pub output_path: Option<String>,

    #[arg(long, help = "TOML file with column names and processing rules")]
    pub config: Option<String>,

    #[arg(long, help = "Write the run report as JSON to this file")]
    pub report: Option<String>,

    #[arg(long, help = "List the sheets of --input and exit")]
    pub list_sheets: bool,

    #[arg(long, help = "List the accepted area names and exit")]
    pub list_areas: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage after each phase")]
    pub monitor: bool,

    #[arg(long, help = "Write logs as JSON lines instead of the compact format")]
    pub json_logs: bool,

    #[arg(skip)]
    #[serde(skip)]
    pub rules: ProcessingRules,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads `--config` when given. Flags win over the file.
    pub fn load_file_config(&mut self) -> Result<()> {
        let Some(path) = self.config.clone() else {
            return Ok(());
        };

        tracing::debug!("Loading configuration from {}", path);
        let file = TomlConfig::from_file(&path)?;
        file.validate()?;

        self.rules = file.processing_rules().clone();
        if self.output_path.is_none() {
            self.output_path = file.output.path.clone();
        }
        self.monitor |= file.monitoring_enabled();
        Ok(())
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn output_path(&self) -> &str {
        self.output_path.as_deref().unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    fn rules(&self) -> &ProcessingRules {
        &self.rules
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitor
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("output_path", ConfigProvider::output_path(self))?;
        if self.list_sheets {
            crate::utils::validation::validate_required_field("input", &self.input)?;
        }
        if let Some(input) = &self.input {
            validate_path("input", input)?;
            crate::utils::validation::validate_file_extensions(
                "input",
                std::slice::from_ref(input),
                &crate::adapters::workbook::ACCEPTED_EXTENSIONS,
            )?;
        }
        self.rules.validate()
    }
}

/// Fixed configuration for hosts that embed the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    pub output_path: String,
    pub rules: ProcessingRules,
    #[serde(default)]
    pub monitoring: bool,
}

impl StaticConfig {
    pub fn new(output_path: impl Into<String>, rules: ProcessingRules) -> Self {
        Self {
            output_path: output_path.into(),
            rules,
            monitoring: false,
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_PATH, ProcessingRules::default())
    }
}

impl ConfigProvider for StaticConfig {
    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn rules(&self) -> &ProcessingRules {
        &self.rules
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring
    }
}

impl Validate for StaticConfig {
    fn validate(&self) -> Result<()> {
        validate_path("output_path", &self.output_path)?;
        self.rules.validate()
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_flags() {
        let config = CliConfig::parse_from([
            "mensualizados",
            "--input",
            "planilla.xlsx",
            "--sheet",
            "Enero",
            "--area",
            "SALUD PUBLICA",
        ]);
        assert_eq!(config.sheet.as_deref(), Some("Enero"));
        assert!(!config.split_by_office);
        assert!(!config.json_logs);
        assert_eq!(ConfigProvider::output_path(&config), "./output");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_json_logs_flag() {
        let config = CliConfig::parse_from(["mensualizados", "--list-areas", "--json-logs"]);
        assert!(config.json_logs);
        assert!(config.list_areas);
    }

    #[test]
    fn rejects_unsupported_input() {
        let config = CliConfig::parse_from(["mensualizados", "--input", "planilla.csv"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn listing_sheets_needs_an_input() {
        let config = CliConfig::parse_from(["mensualizados", "--list-sheets"]);
        assert!(matches!(
            config.validate(),
            Err(crate::utils::error::WorkflowError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn flags_win_over_file_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[columns]\noffice = \"Oficina\"\n[output]\npath = \"./desde-archivo\"\n")
            .unwrap();
        let path = file.path().display().to_string();

        let mut config = CliConfig::parse_from([
            "mensualizados",
            "--config",
            path.as_str(),
            "--output-path",
            "./desde-flag",
        ]);
        config.load_file_config().unwrap();

        assert_eq!(config.rules.office_column, "Oficina");
        assert_eq!(ConfigProvider::output_path(&config), "./desde-flag");
    }
}
