use clap::Parser;
use ingredient_compliance::utils::error::ErrorSeverity;
use ingredient_compliance::utils::{logger, validation::Validate};
use ingredient_compliance::{CliConfig, ComplianceConfig, ComplianceEngine, ComplianceError};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 設定檔中的日誌等級需先讀取設定檔才知道
    let config = ComplianceConfig::from_file(&cli.config);
    let log_level = config.as_ref().ok().and_then(|c| c.log_level().map(String::from));
    match config.as_ref().map(|c| c.json_logs()) {
        Ok(true) if !cli.verbose => logger::init_service_logger(log_level.as_deref()),
        _ => logger::init_cli_logger(cli.verbose, log_level.as_deref()),
    }

    tracing::info!("Starting ingredient-compliance CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match run(&cli, config).await {
        Ok(fully_compliant) => {
            if fully_compliant {
                tracing::info!("✅ All checks passed");
            } else {
                tracing::warn!("⚠️ Label needs attention, see the report above");
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Compliance run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}

async fn run(
    cli: &CliConfig,
    config: Result<ComplianceConfig, ComplianceError>,
) -> Result<bool, ComplianceError> {
    cli.validate()?;
    let config = config?;
    config.validate()?;

    let ingredients = cli.collect_ingredients()?;
    tracing::info!("📋 {}: checking {} ingredients", config.engine_name(), ingredients.len());
    let engine = ComplianceEngine::from_config(&config)?;

    if cli.warm_up {
        let entries = engine.warm_up().await?;
        tracing::info!("📚 Loaded {} reference entries", entries);
    }

    let result = engine.run(&ingredients, cli.allergen_statement.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(result.is_fully_compliant())
}
