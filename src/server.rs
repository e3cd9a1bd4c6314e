//! Service bootstrap: load the model once, then serve it.

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api::types::ModelSummary;
use crate::api::{create_router, AppState};
use crate::config::{AppConfig, LayoutKind, ModelConfig};
use crate::error::{Result, ServeError};
use crate::ml::{load_model, Predictor};
use crate::schema::{FeatureSchema, InputLayout};

/// Load the schema (labeled layout) and model, and check they agree.
pub fn load_model_and_layout(cfg: &ModelConfig) -> Result<(Arc<dyn Predictor>, InputLayout)> {
    match cfg.layout {
        LayoutKind::Labeled => {
            let schema = match &cfg.schema_path {
                Some(path) => FeatureSchema::from_file(path)?,
                None => FeatureSchema::car_listing(),
            };
            let model = load_model(&cfg.path, Some(schema.len()))?;
            check_schema(&schema, model.as_ref())?;
            Ok((model, InputLayout::Labeled(schema)))
        }
        LayoutKind::Raw => {
            let model = load_model(&cfg.path, cfg.input_dim)?;
            if let Some(expected) = cfg.input_dim {
                if expected != model.input_dim() {
                    return Err(ServeError::InvalidConfig(format!(
                        "model.input_dim {expected} != model input width {}",
                        model.input_dim()
                    )));
                }
            }
            let expected = model.input_dim();
            Ok((model, InputLayout::Raw { expected }))
        }
    }
}

fn check_schema(schema: &FeatureSchema, model: &dyn Predictor) -> Result<()> {
    if schema.len() != model.input_dim() {
        return Err(ServeError::InvalidConfig(format!(
            "schema has {} columns but the model expects {} inputs",
            schema.len(),
            model.input_dim()
        )));
    }
    if let Some(names) = model.feature_names() {
        let columns = schema.names();
        if names != columns.as_slice() {
            return Err(ServeError::InvalidConfig(format!(
                "schema columns {columns:?} differ from model feature names {names:?}"
            )));
        }
    }
    Ok(())
}

/// Build the immutable service context from configuration.
pub fn load_state(config: &AppConfig) -> Result<AppState> {
    let (model, layout) = load_model_and_layout(&config.model)?;
    let summary = ModelSummary::of(model.as_ref());
    info!(
        path = %config.model.path.display(),
        kind = %summary.kind,
        input_dim = summary.input_dim,
        output_dim = summary.output_dim,
        layout = layout.name(),
        "Model loaded"
    );
    Ok(AppState::new(model, layout).with_greeting(config.server.greeting.clone()))
}

/// Serve `state` on an already-bound listener until `shutdown` resolves.
pub async fn run<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServeError::Internal(format!("API server error: {e}")))
}

/// Start the inference server
pub async fn serve(config: AppConfig) -> Result<()> {
    let state = load_state(&config)?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Inference server listening on http://{}", listener.local_addr()?);

    run(listener, state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
