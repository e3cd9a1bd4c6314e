pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod ml;
pub mod schema;
pub mod server;

pub use api::{create_router, AppState};
pub use config::{AppConfig, LayoutKind};
pub use error::{Result, ServeError, ValidationError};
pub use ml::{load_model, ModelArtifact, Predictor};
pub use schema::{FeatureFrame, FeatureSchema, InputLayout};
