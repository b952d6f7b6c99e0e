//! fruitscand — Fruitscan daemon.
//!
//! Loads the leaf-disease model once, checks it against its class table and
//! serves `/ping` and `/predict` over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use fruitscan::model::{OnnxClassifier, OnnxOptions};
use fruitscan::server::config::Config;
use fruitscan::server::{self, ServiceState};
use fruitscan::{FruitscanError, Predictor};

/// `--version` output: package version plus git branch and commit.
static VERSION: LazyLock<String> = LazyLock::new(fruitscan::version_string);

/// Fruitscan daemon — fruit leaf disease classification service.
#[derive(Parser)]
#[command(name = "fruitscand")]
#[command(version = VERSION.as_str())]
#[command(about = "Fruit leaf disease classification daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the ONNX model (overrides the config file).
    #[arg(short, long, env = "FRUITSCAN_MODEL")]
    model: Option<PathBuf>,

    /// Address to bind to (overrides the config file).
    #[arg(short, long, env = "FRUITSCAN_ADDRESS")]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.model.path = model;
    }
    if let Some(address) = args.address {
        config.server.address = address;
    }

    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| FruitscanError::Configuration(format!("Invalid address: {e}")))?;

    info!(
        version = fruitscan::version_string(),
        built = fruitscan::version::BUILD_TIMESTAMP,
        %addr,
        "fruitscand starting"
    );

    // Model load and probe failures are fatal: nothing is served without a model.
    let predictor = build_predictor(&config)?;
    let state = ServiceState::new(predictor, &config.server)?.into_shared();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    server::serve(listener, server::router(state)).await?;

    Ok(())
}

/// Load the model and its class table, and verify they line up.
fn build_predictor(config: &Config) -> Result<Predictor, FruitscanError> {
    let model = &config.model;
    let options = OnnxOptions {
        device: model.device()?,
        intra_threads: model.intra_threads,
        output_name: model.output_name.clone(),
    };

    let classifier = OnnxClassifier::load(&model.path, &options)?;
    let labels = model.class_table()?;
    let predictor = Predictor::new(Arc::new(classifier), labels, model.preprocessor()?)
        .with_softmax(model.softmax);

    predictor.probe()?;
    info!(
        model = predictor.classifier_name(),
        classes = predictor.labels().len(),
        input_size = predictor.preprocessor().size(),
        "model ready"
    );

    Ok(predictor)
}
