use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::ml::Predictor;
use crate::schema::InputLayout;

/// Greeting served on `GET /` by labeled deployments.
pub const DEFAULT_GREETING: &str =
    "This is a model serving app for deploying an ML model for API use.";

/// Immutable service context shared by every request handler
#[derive(Clone)]
pub struct AppState {
    /// Loaded model, read-only for the life of the process
    pub model: Arc<dyn Predictor>,

    /// Mapping from request `features` to the model row
    pub layout: Arc<InputLayout>,

    /// Text for `GET /`; the route is not registered when unset
    pub greeting: Option<Arc<str>>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(model: Arc<dyn Predictor>, layout: InputLayout) -> Self {
        let greeting = layout.is_labeled().then(|| Arc::from(DEFAULT_GREETING));
        Self {
            model,
            layout: Arc::new(layout),
            greeting,
            start_time: Utc::now(),
        }
    }

    /// Override the `GET /` text; `None` keeps the layout default
    pub fn with_greeting(mut self, greeting: Option<String>) -> Self {
        if let Some(text) = greeting {
            self.greeting = Some(Arc::from(text));
        }
        self
    }

    /// Get service uptime in seconds
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
