use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use swing_indicators::config::{self, AppConfig, SourceConfig};
use swing_indicators::export;
use swing_indicators::pipeline::Pipeline;
use swing_indicators::source::PriceSource;
use swing_indicators::source::binance::BinanceSource;
use swing_indicators::source::file::FileSource;
use swing_indicators::table::IndicatorTable;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("price source error")]
    Source,
    #[display("indicator error")]
    Indicator,
    #[display("output error")]
    Output,
}

#[derive(Parser)]
#[command(name = "swing-indicators", about = "Technical-analysis feature builder")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Write the feature table here instead of `general.output`
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    let request = config
        .source
        .history_request()
        .change_context(AppError::Config)?;
    let pipeline = Pipeline::from_config(&config).change_context(AppError::Config)?;

    let source = build_source(&config.source);
    info!(
        source = source.name(),
        symbol = %request.symbol,
        period = %request.period,
        start = %request.start,
        end = %request.end,
        "fetching price history"
    );
    let bars = source
        .fetch_bars(&request)
        .await
        .change_context(AppError::Source)?;

    let mut table = IndicatorTable::new(request.symbol.clone(), request.period, bars)
        .change_context(AppError::Source)?;
    pipeline
        .run(&mut table)
        .change_context(AppError::Indicator)?;

    let output = cli
        .output
        .or_else(|| config.general.output.as_ref().map(PathBuf::from));
    match output {
        Some(path) => {
            let file = File::create(&path)
                .change_context(AppError::Output)
                .attach_with(|| format!("path: {}", path.display()))?;
            export::write_json(&table, BufWriter::new(file)).change_context(AppError::Output)?;
            info!(path = %path.display(), rows = table.len(), "feature table written");
        }
        None => {
            export::write_json(&table, io::stdout().lock()).change_context(AppError::Output)?;
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    // stdout may carry the feature table, so logs go to stderr
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
}

fn build_source(config: &SourceConfig) -> Box<dyn PriceSource> {
    match (config.kind.as_str(), &config.path) {
        ("file", Some(path)) => Box::new(FileSource::new(path)),
        _ => Box::new(BinanceSource::new()),
    }
}
