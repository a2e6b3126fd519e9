use bird_finder::app::render;
use bird_finder::utils::error::{ErrorSeverity, FinderError};
use bird_finder::utils::{logger, validation::Validate};
use bird_finder::{build_engine, CliConfig, FinderConfig, OutputFormat, SecretStore};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, config.log_format());

    tracing::info!("Starting bird-finder");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let service_config = match &config.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            FinderConfig::from_file(path).unwrap_or_else(|e| fail(&e))
        }
        None => FinderConfig::default(),
    };
    if let Err(e) = service_config.validate() {
        fail(&e);
    }

    // 沒有 API key 就不執行任何查詢
    let keys = SecretStore::load_optional(&config.secrets)
        .and_then(|store| store.api_keys())
        .unwrap_or_else(|e| fail(&e));

    let request = config.to_request().unwrap_or_else(|e| fail(&e));
    let engine = build_engine(&service_config, keys).unwrap_or_else(|e| fail(&e));

    match engine.run(&request).await {
        Ok(report) => {
            tracing::info!("✅ Analysis complete!");
            let output = match config.format {
                OutputFormat::Text => render::render_text(&report),
                OutputFormat::Json => render::render_json(&report).unwrap_or_else(|e| fail(&e)),
            };
            println!("{}", output);
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

fn fail(e: &FinderError) -> ! {
    tracing::error!(
        "❌ Identification failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
