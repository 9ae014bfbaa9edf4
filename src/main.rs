use std::error::Error;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mr_annotator::config::AnnotatorConfig;
use mr_annotator::errors::ConfigError;
use mr_annotator::models::AnalysisInput;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from a .env file when one is present.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cfg = AnnotatorConfig::from_env()?;

    // The analysis collaborator's output, already reduced to findings + gate.
    let report_path = std::env::var("MR_ANNOTATOR_REPORT")
        .map_err(|_| ConfigError::MissingProperty("MR_ANNOTATOR_REPORT"))?;
    let input: AnalysisInput = serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;

    mr_annotator::execute(&cfg, input).await?;

    Ok(())
}
