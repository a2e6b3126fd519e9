use bird_finder::config::secrets::{EBIRD_API_KEY, MISTRAL_API_KEY};
use bird_finder::domain::ports::{Geocoder, SpeciesSuggester};
use bird_finder::utils::logger::{self, LogFormat};
use bird_finder::utils::validation::Validate;
use bird_finder::{EbirdObservationSource, FinderConfig, MistralSuggester, NominatimGeocoder, SecretStore};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

/// 檢查三個外部服務是否可用
#[derive(Parser)]
#[command(name = "check-services")]
#[command(about = "Check API keys and connectivity to the language model, eBird and geocoding services")]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "secrets.toml")]
    secrets: PathBuf,

    /// Place to geocode
    #[arg(long, default_value = "New York, NY, USA")]
    place: String,

    /// Also spend one language model request
    #[arg(long)]
    with_llm: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let format = if args.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(args.verbose, format);

    println!("🚀 Checking bird-finder services");

    let config = match &args.config {
        Some(path) => FinderConfig::from_file(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        None => FinderConfig::default(),
    };
    config.validate()?;
    println!("✅ Configuration valid");

    let store = SecretStore::load_optional(&args.secrets)
        .with_context(|| format!("failed to read secrets file '{}'", args.secrets.display()))?;
    let mut failures = 0;

    let geocoder = NominatimGeocoder::new(&config.geocoder)?;
    match geocoder.geocode(&args.place).await {
        Ok(point) => println!("✅ Geocoder: '{}' -> {:.4}, {:.4}", args.place, point.latitude, point.longitude),
        Err(e) => {
            failures += 1;
            println!("❌ Geocoder: {}", e);
        }
    }

    match store.get(EBIRD_API_KEY) {
        Ok(key) => {
            let source = EbirdObservationSource::new(key, config.ebird.clone())?;
            match source.taxonomy().await {
                Ok(taxonomy) => println!("✅ eBird: {} taxonomy entries", taxonomy.len()),
                Err(e) => {
                    failures += 1;
                    println!("❌ eBird: {}", e);
                }
            }
        }
        Err(e) => {
            failures += 1;
            println!("❌ eBird: {}", e);
        }
    }

    match store.get(MISTRAL_API_KEY) {
        Ok(key) if args.with_llm => {
            let suggester = MistralSuggester::new(key, config.mistral.clone())?;
            match suggester
                .suggest("small brown bird with a loud song and an upturned tail", "", "")
                .await
            {
                Ok(set) => println!(
                    "✅ Mistral ({}): {} suggestions",
                    set.model_used,
                    set.candidates.len()
                ),
                Err(e) => {
                    failures += 1;
                    println!("❌ Mistral: {}", e);
                }
            }
        }
        Ok(_) => println!("✅ Mistral: key present (use --with-llm to send a request)"),
        Err(e) => {
            failures += 1;
            println!("❌ Mistral: {}", e);
        }
    }

    if failures > 0 {
        println!("\n{} check(s) failed", failures);
        std::process::exit(1);
    }
    println!("\n🎉 All services reachable");
    Ok(())
}
