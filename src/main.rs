use nfe_weights::{Config, EngineSettings, ParsedInvoice, parse_nfe_xml};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "nfe_weights.toml";

struct Args {
    config: Option<PathBuf>,
    files: Vec<PathBuf>,
}

/// Usage: `nfe_weights [--config <file>] <file.xml>...`
fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let mut config = None;
    let mut files = Vec::new();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or("--config requires a path")?;
                config = Some(PathBuf::from(path));
            }
            _ => files.push(PathBuf::from(arg)),
        }
    }

    if files.is_empty() {
        return Err("usage: nfe_weights [--config <file>] <file.xml>...".into());
    }
    Ok(Args { config, files })
}

fn load_config(explicit: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

async fn process_file(path: PathBuf, settings: Arc<EngineSettings>) -> Result<ParsedInvoice, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("failed to read file: {e}"))?;

    let filename = path.display().to_string();
    tokio::task::spawn_blocking(move || {
        let span = tracing::info_span!("nfe", filename = %filename);
        let _guard = span.enter();
        parse_nfe_xml(&bytes, &settings).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("worker panicked: {e}"))?
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;
    let cfg = load_config(args.config.as_deref())?;

    // init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter));
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = Arc::new(cfg.engine);
    info!(files = args.files.len(), "Processing documents");

    let handles: Vec<_> = args
        .files
        .iter()
        .cloned()
        .map(|path| tokio::spawn(process_file(path, Arc::clone(&settings))))
        .collect();

    let mut failures = 0;
    for (path, handle) in args.files.iter().zip(handles) {
        let outcome = handle.await.map_err(|e| e.to_string()).and_then(|r| r);
        match outcome {
            Ok(invoice) => {
                if invoice.products.is_empty() {
                    warn!(file = %path.display(), "No products found; layout may not be supported");
                }
                info!(
                    file = %path.display(),
                    products = invoice.products.len(),
                    audited = invoice.audited_lines(),
                    net_kg = %invoice.net_weight_kg(),
                    gross_kg = %invoice.gross_weight_kg(),
                    "Document done"
                );
                println!("{}", serde_json::to_string_pretty(&invoice)?);
            }
            Err(e) => {
                error!(file = %path.display(), error = %e, "Document failed");
                failures += 1;
            }
        }
    }

    info!(total = args.files.len(), failed = failures, "Batch complete");
    if failures > 0 {
        return Err(format!("{failures} document(s) failed").into());
    }
    Ok(())
}
