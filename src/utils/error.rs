use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Selection required: {what}")]
    MissingSelection { what: String },

    #[error("Incomplete data: {missing_rows} row(s) without '{column}'")]
    IncompleteData { column: String, missing_rows: usize },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    #[error("Required column '{column}' not found")]
    MissingColumn { column: String },

    #[error("Unknown area: '{name}'")]
    UnknownArea { name: String },

    #[error("Sheet '{sheet}' not found in workbook")]
    UnknownSheet { sheet: String },

    #[error("Sheet '{sheet}' cannot be processed")]
    ReservedSheet { sheet: String },

    #[error("Unsupported file '{file}': {reason}")]
    UnsupportedFileType { file: String, reason: String },

    #[error("Workflow is no longer usable: {reason}")]
    InvalidState { reason: String },

    #[error("Workbook read failed: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Selection,
    Data,
    Output,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl WorkflowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkflowError::MissingSelection { .. } => ErrorCategory::Selection,
            WorkflowError::IncompleteData { .. }
            | WorkflowError::InvalidArgument { .. }
            | WorkflowError::MissingColumn { .. } => ErrorCategory::Data,
            WorkflowError::SerializationError { .. } => ErrorCategory::Output,
            WorkflowError::UnknownArea { .. }
            | WorkflowError::UnknownSheet { .. }
            | WorkflowError::ReservedSheet { .. }
            | WorkflowError::UnsupportedFileType { .. }
            | WorkflowError::InvalidState { .. }
            | WorkflowError::Workbook(_) => ErrorCategory::Input,
            WorkflowError::ConfigError { .. }
            | WorkflowError::ConfigValidationError { .. }
            | WorkflowError::InvalidConfigValueError { .. }
            | WorkflowError::MissingConfigError { .. } => ErrorCategory::Configuration,
            WorkflowError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // prompts and excluded rows never abort anything on their own
            ErrorCategory::Selection => ErrorSeverity::Low,
            ErrorCategory::Data if matches!(self, WorkflowError::IncompleteData { .. }) => {
                ErrorSeverity::Low
            }
            ErrorCategory::Data | ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Output | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            WorkflowError::MissingSelection { what } => {
                format!("Select the {} before continuing", what)
            }
            WorkflowError::IncompleteData { column, .. } => format!(
                "Fill in '{}' for every row and run the process again",
                column
            ),
            WorkflowError::InvalidArgument { .. } => {
                "Check that the sheet has the expected column layout".to_string()
            }
            WorkflowError::SerializationError { .. } => {
                "The sheet needs at least the date columns expected by the output layout and must fit in a legacy .xls sheet".to_string()
            }
            WorkflowError::MissingColumn { column } => format!(
                "Add a '{}' column to the sheet or map the column name in the configuration file",
                column
            ),
            WorkflowError::UnknownArea { .. } => {
                "Run with --list-areas to see the accepted area names".to_string()
            }
            WorkflowError::UnknownSheet { .. } => {
                "Run with --list-sheets to see the sheets in the workbook".to_string()
            }
            WorkflowError::ReservedSheet { .. } => "Choose a different sheet".to_string(),
            WorkflowError::UnsupportedFileType { .. } => {
                "Upload the workbook as .xlsx or .xls".to_string()
            }
            WorkflowError::InvalidState { .. } => {
                "Start a new run with corrected input".to_string()
            }
            WorkflowError::Workbook(_) => {
                "Make sure the file is a valid, unencrypted Excel workbook".to_string()
            }
            WorkflowError::IoError(_) => {
                "Check file permissions and available disk space".to_string()
            }
            WorkflowError::ConfigError { .. }
            | WorkflowError::ConfigValidationError { .. }
            | WorkflowError::InvalidConfigValueError { .. }
            | WorkflowError::MissingConfigError { .. } => {
                "Review the configuration file and command line flags".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            WorkflowError::MissingSelection { what } => {
                let subject = match what.as_str() {
                    "area" => "el área",
                    "file" => "el archivo",
                    "sheet" => "la hoja",
                    other => other,
                };
                format!("IMPORTANTE: seleccionar {} antes de continuar", subject)
            }
            WorkflowError::ReservedSheet { .. } => "Esta hoja no puede ser procesada".to_string(),
            WorkflowError::IncompleteData { .. } => {
                "No se puede procesar el documento porque faltan completar la fecha de egreso del cargo para algunas evaluaciones.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
