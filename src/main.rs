use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use model_serve::api::types::{ModelSummary, PredictResponse};
use model_serve::config::{AppConfig, LayoutKind, ModelConfig};
use model_serve::logging::{init_logging, init_logging_simple};
use model_serve::server;
use std::path::PathBuf;
use tracing::info;

/// Regression model inference service
#[derive(Parser, Debug)]
#[command(name = "model-serve")]
#[command(author, version, about = "Serve a pre-trained regression model over HTTP")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Serve options used when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the model and serve POST /predict (default)
    Serve(ServeArgs),

    /// Print the model's kind, input width and feature names
    Inspect(ModelArgs),

    /// Run one prediction offline and print the JSON response
    Predict {
        #[command(flatten)]
        model: ModelArgs,
        /// JSON value for `features`, e.g. '[1, 2, 3]'
        #[arg(long)]
        features: String,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Directory holding default.toml and per-environment overrides
    #[arg(long, default_value = "config", env = "SERVE_CONFIG_DIR")]
    config_dir: PathBuf,
    #[arg(long)]
    model: Option<PathBuf>,
    #[arg(long)]
    schema: Option<PathBuf>,
    #[arg(long, value_enum)]
    layout: Option<LayoutKind>,
    #[arg(long)]
    input_dim: Option<usize>,
    #[arg(long)]
    host: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model artifact path
    #[arg(long)]
    model: PathBuf,
    /// Feature schema path (labeled layout)
    #[arg(long)]
    schema: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "labeled")]
    layout: LayoutKind,
    #[arg(long)]
    input_dim: Option<usize>,
}

impl ModelArgs {
    fn to_config(&self) -> ModelConfig {
        ModelConfig {
            path: self.model.clone(),
            layout: self.layout,
            schema_path: self.schema.clone(),
            input_dim: self.input_dim,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_serve(cli.serve).await,
        Some(Commands::Serve(args)) => run_serve(args).await,
        Some(Commands::Inspect(args)) => {
            init_logging_simple();
            run_inspect(&args)
        }
        Some(Commands::Predict { model, features }) => {
            init_logging_simple();
            run_predict(&model, &features)
        }
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = AppConfig::load_from(&args.config_dir)
        .with_context(|| format!("loading config from {}", args.config_dir.display()))?;

    if let Some(model) = args.model {
        config.model.path = model;
    }
    if let Some(layout) = args.layout {
        config.model.layout = layout;
    }
    if args.schema.is_some() {
        config.model.schema_path = args.schema;
    }
    if args.input_dim.is_some() {
        config.model.input_dim = args.input_dim;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    config
        .validate()
        .map_err(|errors| anyhow!("invalid configuration:\n  {}", errors.join("\n  ")))?;

    init_logging(&config.logging);
    info!(
        "model-serve {} starting (layout={})",
        env!("CARGO_PKG_VERSION"),
        config.model.layout.as_str()
    );

    server::serve(config).await?;
    Ok(())
}

fn run_inspect(args: &ModelArgs) -> Result<()> {
    let (model, layout) = server::load_model_and_layout(&args.to_config())?;
    let summary = ModelSummary::of(model.as_ref());

    println!("kind:       {}", summary.kind);
    println!("layout:     {}", layout.name());
    println!("input_dim:  {}", summary.input_dim);
    println!("output_dim: {}", summary.output_dim);
    match summary.feature_names {
        Some(names) => println!("features:   {}", names.join(", ")),
        None => println!("features:   (unnamed)"),
    }
    Ok(())
}

fn run_predict(args: &ModelArgs, features: &str) -> Result<()> {
    let (model, layout) = server::load_model_and_layout(&args.to_config())?;
    let features: serde_json::Value =
        serde_json::from_str(features).context("--features must be valid JSON")?;

    let frame = layout.assemble(&features)?;
    let prediction = model.predict(&frame)?;

    println!("{}", serde_json::to_string(&PredictResponse { prediction })?);
    Ok(())
}
