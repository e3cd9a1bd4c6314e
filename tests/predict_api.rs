use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use model_serve::{
    api::{create_router, state::DEFAULT_GREETING, AppState},
    config::{AppConfig, LayoutKind, LoggingConfig, ModelConfig, ServerConfig},
    ml::{Activation, DenseLayer, DenseNetwork, LinearModel},
    schema::{FeatureSchema, InputLayout, CAR_LISTING_COLUMNS},
    server::load_state,
    ServeError,
};
use serde_json::{json, Value};
use std::{path::PathBuf, sync::Arc};
use tower::ServiceExt;
use uuid::Uuid;

fn raw_app(width: usize) -> Router {
    let model = LinearModel {
        coefficients: vec![1.0; width],
        intercept: 0.0,
        feature_names: None,
    };
    create_router(AppState::new(
        Arc::new(model),
        InputLayout::Raw { expected: width },
    ))
}

fn labeled_app() -> Router {
    let names: Vec<String> = CAR_LISTING_COLUMNS.iter().map(|c| c.to_string()).collect();
    let model = DenseNetwork {
        input_dim: names.len(),
        input_mean: None,
        input_std: None,
        layers: vec![DenseLayer {
            weights: vec![vec![0.5; names.len()]],
            bias: vec![100.0],
            activation: Activation::Linear,
        }],
        feature_names: Some(names),
        metadata: Value::Null,
    };
    create_router(AppState::new(
        Arc::new(model),
        InputLayout::Labeled(FeatureSchema::car_listing()),
    ))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, String) {
    let mut request_builder = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        request_builder = request_builder.header("content-type", ct);
    }
    let request = request_builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");

    (status, String::from_utf8_lossy(&bytes).to_string())
}

async fn post_json(app: &Router, body: Value) -> (StatusCode, Value) {
    let (status, text) = send(
        app,
        Method::POST,
        "/predict",
        Some("application/json"),
        &body.to_string(),
    )
    .await;
    let parsed = serde_json::from_str(&text).expect("response is not JSON");
    (status, parsed)
}

#[tokio::test]
async fn raw_five_features_return_single_prediction() {
    let app = raw_app(5);
    let (status, body) = post_json(&app, json!({"features": [1, 2, 3, 4, 5]})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"prediction": [15.0]}));
}

#[tokio::test]
async fn identical_requests_give_identical_predictions() {
    let app = labeled_app();
    let features: Vec<f64> = (0..19).map(|i| i as f64 * 3.5).collect();

    let (s1, first) = post_json(&app, json!({ "features": features })).await;
    let (s2, second) = post_json(&app, json!({ "features": features })).await;

    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(first["prediction"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn missing_features_is_a_validation_error() {
    let app = raw_app(5);
    let (status, body) = post_json(&app, json!({})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["error"], "missing required field `features`");
}

#[tokio::test]
async fn wrong_length_is_a_validation_error() {
    let app = raw_app(5);

    let (short, body) = post_json(&app, json!({"features": [1, 2, 3, 4]})).await;
    assert_eq!(short, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "expected 5 features, got 4");

    let (long, _) = post_json(&app, json!({"features": [1, 2, 3, 4, 5, 6]})).await;
    assert_eq!(long, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn non_numeric_raw_feature_is_rejected() {
    let app = raw_app(3);
    let (status, body) = post_json(&app, json!({"features": [1, "two", 3]})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn body_is_parsed_whatever_the_content_type() {
    let app = raw_app(2);
    for content_type in [None, Some("text/plain"), Some("application/x-www-form-urlencoded")] {
        let (status, text) = send(
            &app,
            Method::POST,
            "/predict",
            content_type,
            r#"{"features": [2, 3]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "content type {content_type:?}");
        assert_eq!(text, r#"{"prediction":[5.0]}"#);
    }
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = raw_app(2);
    let (status, text) = send(&app, Method::POST, "/predict", None, "features=2,3").await;
    let body: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "malformed_json");
}

#[tokio::test]
async fn labeled_variant_serves_greeting() {
    let app = labeled_app();
    for _ in 0..2 {
        let (status, text) = send(&app, Method::GET, "/", None, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, DEFAULT_GREETING);
    }
}

#[tokio::test]
async fn raw_variant_has_no_greeting_route() {
    let app = raw_app(5);
    let (status, _) = send(&app, Method::GET, "/", None, "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn greeting_can_be_configured_for_raw_variant() {
    let model = LinearModel {
        coefficients: vec![1.0],
        intercept: 0.0,
        feature_names: None,
    };
    let state = AppState::new(Arc::new(model), InputLayout::Raw { expected: 1 })
        .with_greeting(Some("hello".to_string()));
    let app = create_router(state);

    let (status, text) = send(&app, Method::GET, "/", None, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "hello");
}

#[tokio::test]
async fn labeled_variant_accepts_name_keyed_object() {
    let app = labeled_app();
    let features: serde_json::Map<String, Value> = CAR_LISTING_COLUMNS
        .iter()
        .rev()
        .map(|c| (c.to_string(), json!("2")))
        .collect();

    let (status, body) = post_json(&app, json!({ "features": features })).await;

    assert_eq!(status, StatusCode::OK);
    // 19 columns * 0.5 * 2 + 100
    assert_eq!(body, json!({"prediction": [119.0]}));
}

#[tokio::test]
async fn health_reports_model_shape() {
    let app = raw_app(5);
    let (status, text) = send(&app, Method::GET, "/health", None, "").await;
    let body: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["layout"], "raw");
    assert_eq!(body["model"]["kind"], "linear");
    assert_eq!(body["model"]["input_dim"], 5);
}

// ============================================================================
// Startup from artifacts on disk
// ============================================================================

struct ArtifactDir(PathBuf);

impl ArtifactDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("model-serve-it-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).expect("failed to create temp dir");
        Self(dir)
    }

    fn write(&self, name: &str, content: &Value) -> PathBuf {
        let path = self.0.join(name);
        std::fs::write(&path, content.to_string()).expect("failed to write artifact");
        path
    }
}

impl Drop for ArtifactDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn config_for(model: PathBuf, layout: LayoutKind, schema: Option<PathBuf>) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            greeting: None,
        },
        model: ModelConfig {
            path: model,
            layout,
            schema_path: schema,
            input_dim: None,
        },
        logging: LoggingConfig::default(),
    }
}

fn categorical(name: &str, categories: &[&str]) -> Value {
    json!({"name": name, "type": "categorical", "categories": categories})
}

fn car_listing_schema() -> Value {
    let columns: Vec<Value> = CAR_LISTING_COLUMNS
        .iter()
        .map(|name| match *name {
            "Brand" => categorical(name, &["Honda", "Toyota"]),
            "Type" => categorical(name, &["SUV", "Sedan", "Hatchback"]),
            "Transmission" => categorical(name, &["Automatic", "Manual"]),
            _ => json!({"name": name, "type": "numeric"}),
        })
        .collect();
    json!({ "columns": columns })
}

#[tokio::test]
async fn startup_from_disk_serves_form_submissions() {
    let dir = ArtifactDir::new();
    let model_path = write_omv_model(&dir);
    let schema_path = dir.write("schema.json", &car_listing_schema());

    let state = load_state(&config_for(model_path, LayoutKind::Labeled, Some(schema_path)))
        .expect("state should load");
    let app = create_router(state);

    // Shape of the price form submission: strings everywhere, keyed by column.
    let form = json!({
        "features": {
            "Brand": "Toyota", "Type": "Sedan", "Reg_year": 2020, "Reg_month": 5,
            "Days_since_registration": 1000, "Coe_left": 24, "Depreciation": "1000",
            "Mileage": "30000", "Road_Tax": "500", "Dereg_Value": "25000", "COE": "30000",
            "Engine_Capacity": "2000", "Curb_Weight": "1500", "Manufactured": "2019",
            "Transmission": "Automatic", "OMV": "35000", "ARF": "10000", "Power": "150",
            "Number_of_Owners": "1"
        }
    });
    let (status, body) = post_json(&app, form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"prediction": [36000.0]}));

    let (status, body) = post_json(
        &app,
        json!({"features": {"Brand": "Lada"}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
}

/// Writes a linear model that predicts `OMV + 1000` over the car-listing columns.
fn write_omv_model(dir: &ArtifactDir) -> PathBuf {
    let omv = CAR_LISTING_COLUMNS.iter().position(|c| *c == "OMV").unwrap();
    let mut coefficients = vec![0.0; CAR_LISTING_COLUMNS.len()];
    coefficients[omv] = 1.0;
    dir.write(
        "model.json",
        &json!({
            "kind": "linear",
            "coefficients": coefficients,
            "intercept": 1000.0,
            "feature_names": CAR_LISTING_COLUMNS,
        }),
    )
}

#[tokio::test]
async fn shipped_example_schema_accepts_default_form() {
    let dir = ArtifactDir::new();
    let model_path = write_omv_model(&dir);
    let schema_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/schema.example.json");

    let schema = FeatureSchema::from_file(&schema_path).expect("example schema should load");
    assert_eq!(schema.names(), CAR_LISTING_COLUMNS.map(String::from).to_vec());

    let state = load_state(&config_for(model_path, LayoutKind::Labeled, Some(schema_path)))
        .expect("state should load");
    let app = create_router(state);

    // The price form's initial values, posted untouched.
    let form = json!({
        "features": {
            "Brand": "Toyota",
            "Type": "Sedan",
            "Reg_year": 2020,
            "Reg_month": 5,
            "Days_since_registration": 1000,
            "Coe_left": 24,
            "Depreciation": 1000,
            "Mileage": 30000,
            "Road_Tax": 500,
            "Dereg_Value": 25000,
            "COE": 30000,
            "Engine_Capacity": 2000,
            "Curb_Weight": 1500,
            "Manufactured": 2019,
            "Transmission": "Automatic",
            "OMV": 35000,
            "ARF": 10000,
            "Power": 150,
            "Number_of_Owners": "1"
        }
    });
    let (status, body) = post_json(&app, form).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body, json!({"prediction": [36000.0]}));

    // Edited in the form: another brand, manual gearbox.
    let mut edited = json!({
        "Brand": "Honda", "Type": "SUV", "Reg_year": "2018", "Reg_month": "1",
        "Days_since_registration": "2000", "Coe_left": "4", "Depreciation": "9000",
        "Mileage": "80000", "Road_Tax": "700", "Dereg_Value": "12000", "COE": "40000",
        "Engine_Capacity": "1500", "Curb_Weight": "1200", "Manufactured": "2017",
        "Transmission": "Manual", "OMV": "20000", "ARF": "8000", "Power": "90",
        "Number_of_Owners": "2"
    });
    let (status, body) = post_json(&app, json!({ "features": edited.clone() })).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body, json!({"prediction": [21000.0]}));

    edited["Transmission"] = json!("Auto");
    let (status, body) = post_json(&app, json!({ "features": edited })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn startup_raw_layout_takes_width_from_model() {
    let dir = ArtifactDir::new();
    let model_path = dir.write(
        "model.json",
        &json!({
            "kind": "dense",
            "input_dim": 3,
            "layers": [{"weights": [[1.0, 2.0, 3.0]], "bias": [0.0]}]
        }),
    );

    let state = load_state(&config_for(model_path, LayoutKind::Raw, None)).unwrap();
    assert_eq!(state.layout.width(), 3);
    assert!(state.greeting.is_none());

    let app = create_router(state);
    let (status, body) = post_json(&app, json!({"features": [1, 1, 1]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"prediction": [6.0]}));
}

#[test]
fn startup_fails_when_model_is_missing() {
    let dir = ArtifactDir::new();
    let result = load_state(&config_for(dir.0.join("absent.json"), LayoutKind::Raw, None));
    assert!(matches!(result, Err(ServeError::Io(_))));
}

#[test]
fn startup_fails_when_model_is_corrupt() {
    let dir = ArtifactDir::new();
    let path = dir.0.join("model.json");
    std::fs::write(&path, "not a model").unwrap();

    let result = load_state(&config_for(path, LayoutKind::Raw, None));
    assert!(matches!(result, Err(ServeError::Model(_))));
}

#[test]
fn startup_fails_when_schema_width_differs_from_model() {
    let dir = ArtifactDir::new();
    let model_path = dir.write(
        "model.json",
        &json!({"kind": "linear", "coefficients": [1.0, 2.0, 3.0, 4.0, 5.0]}),
    );

    // Built-in schema has 19 columns.
    let result = load_state(&config_for(model_path, LayoutKind::Labeled, None));
    assert!(matches!(result, Err(ServeError::InvalidConfig(_))));
}
