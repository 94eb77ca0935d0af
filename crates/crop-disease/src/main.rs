use std::path::PathBuf;
use std::time::SystemTime;
use anyhow::Context;
use clap::Parser;
use crop_disease::server::{self, AppState};
use crop_disease::{load_pipeline, ServiceConfig};
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use std::sync::Arc;

/// Plant leaf disease detection service
#[derive(Parser, Debug)]
#[command(name = "crop-disease", version, about)]
struct Cli {
    /// Service configuration JSON; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Classifier weights (.mpk or .pt/.pth)
    #[arg(long, env = "CROP_DISEASE_MODEL")]
    model: Option<PathBuf>,

    /// LeafNet architecture JSON
    #[arg(long)]
    model_config: Option<PathBuf>,

    /// Label file, one category per line, in classifier output order
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Disease knowledge base JSON (defaults to the bundled copy)
    #[arg(long)]
    knowledge_base: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// cpu, cuda, cuda:N or mps
    #[arg(long)]
    device: Option<String>,

    /// Diagnose a single image, print the JSON result and exit
    #[arg(long)]
    predict: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(err) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("Could not initialize logging: {err}");
    }

    if let Err(err) = run(cli) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let time = SystemTime::now();

    let config = build_config(&cli)?;
    let pipeline = load_pipeline(&config).context("Startup failed")?;

    info!("Ready in {:.2}s", time.elapsed()?.as_secs_f64());

    if let Some(image) = cli.predict {
        let result = pipeline.diagnose_file(&image);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let addr = config.socket_addr()?;
    let state = AppState {
        pipeline: Arc::new(pipeline),
        upload_dir: config.upload_dir.clone(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(addr, state, config.max_upload_bytes))?;

    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match (&cli.config, &cli.model) {
        (Some(path), _) => ServiceConfig::from_file(path)?,
        (None, Some(model)) => ServiceConfig::new(model.clone()),
        (None, None) => anyhow::bail!("No classifier artifact configured; pass --model or --config"),
    };

    if let Some(model) = &cli.model {
        config.model_path = model.clone();
    }
    if let Some(path) = &cli.model_config {
        config.model_config_path = Some(path.clone());
    }
    if let Some(path) = &cli.labels {
        config.labels_path = Some(path.clone());
    }
    if let Some(path) = &cli.knowledge_base {
        config.knowledge_base_path = Some(path.clone());
    }
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = &cli.upload_dir {
        config.upload_dir = dir.clone();
    }
    if let Some(device) = &cli.device {
        config.device = device.clone();
    }

    Ok(config)
}
