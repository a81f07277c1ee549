use clap::Parser;
use mensualizados::core::ConfigProvider;
use mensualizados::utils::error::{ErrorSeverity, WorkflowError};
use mensualizados::utils::{logger, validation::Validate};
use mensualizados::{Area, CliConfig, LocalStorage, SourceWorkbook, Workflow, WorkflowReport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting mensualizados CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if config.list_areas {
        for area in Area::ALL.iter().filter(|a| a.is_selected()) {
            let marker = if area.requires_office_split() {
                " (split by office)"
            } else {
                ""
            };
            println!("{}{}", area, marker);
        }
        return Ok(());
    }

    if let Err(e) = config.load_file_config().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&config).await {
        Ok(Some(report)) => print_report(&report),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                "❌ Processing failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,      // prompt, nothing was processed
                ErrorSeverity::Medium => 2,   // bad input, fix and re-run
                ErrorSeverity::High => 1,     // output could not be produced
                ErrorSeverity::Critical => 3, // system error
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

/// Walks the workflow with the selections given on the command line.
async fn run(config: &CliConfig) -> Result<Option<WorkflowReport>, WorkflowError> {
    let mut workflow = Workflow::from_config(config);
    workflow.set_split_by_office(config.split_by_office);

    if !config.list_sheets {
        workflow.select_area_name(config.area.as_deref().unwrap_or_default())?;
    }

    let input = config
        .input
        .as_deref()
        .ok_or_else(|| WorkflowError::MissingSelection {
            what: "file".to_string(),
        })?;
    let workbook = SourceWorkbook::open(input).await?;

    if config.list_sheets {
        for sheet in workbook.sheet_names() {
            println!("{}", sheet);
        }
        return Ok(None);
    }

    workflow.accept_workbook(workbook)?;
    workflow.select_sheet(config.sheet.as_deref().unwrap_or_default())?;
    tracing::info!("Workflow {}", workflow.phase());

    let storage = LocalStorage::new(config.output_path().to_string());
    let report = workflow.run(&storage).await?;

    if let Some(path) = &config.report {
        let json = serde_json::to_string_pretty(&report).map_err(|e| {
            WorkflowError::SerializationError {
                message: format!("run report: {}", e),
            }
        })?;
        tokio::fs::write(path, json).await?;
        tracing::info!("📝 Report written to {}", path);
    }

    Ok(Some(report))
}

fn print_report(report: &WorkflowReport) {
    for blob in &report.delivered {
        println!("✅ {}: {}", blob.label, blob.location);
    }
    for diagnostic in &report.diagnostics {
        println!("⚠️  {}", diagnostic.message());
    }
    if report.delivered.is_empty() && report.diagnostics.is_empty() {
        println!("No spreadsheets were generated");
    }
}
