use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::state::AppState;
use crate::pipelines::sentiment::{ClassificationResult, Sentiment};

/// Message shown when the submitted text is empty or whitespace.
pub const EMPTY_TEXT_MESSAGE: &str = "Please enter some text to analyze";

const INDEX_HTML: &str = include_str!("templates/index.html");

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    if let Err(e) = env.add_template("index.html", INDEX_HTML) {
        tracing::error!(error = %e, "Failed to compile index template");
    }
    env
});

// ============ Request / response types ============

#[derive(Debug, Deserialize)]
pub struct PredictForm {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub text: String,
    pub sentiment: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub device: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ContainerInfo {
    pub container_id: String,
    pub status: String,
}

/// What a single prediction request ended in.
#[derive(Debug)]
pub enum PredictOutcome {
    Classified {
        text: String,
        result: ClassificationResult,
    },
    /// Input validation failed; the model was not called.
    Rejected(String),
    /// Inference failed; carries the user-facing message.
    Failed(String),
}

/// Validate `text` and run it through the published engine.
///
/// Never panics and never returns an error: every failure becomes a
/// [`PredictOutcome`] variant.
pub async fn predict_text(state: &AppState, text: String) -> PredictOutcome {
    if text.trim().is_empty() {
        return PredictOutcome::Rejected(EMPTY_TEXT_MESSAGE.to_string());
    }

    let Some(engine) = state.engine() else {
        tracing::error!("Prediction requested before the model was loaded");
        return PredictOutcome::Failed("An error occurred: model is not loaded".to_string());
    };

    let input = text.clone();
    match tokio::task::spawn_blocking(move || engine.classify(&input)).await {
        Ok(Ok(result)) => PredictOutcome::Classified { text, result },
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Prediction error");
            PredictOutcome::Failed(format!("An error occurred: {e}"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Prediction task failed");
            PredictOutcome::Failed(format!("An error occurred: {e}"))
        }
    }
}

fn render_index(ctx: minijinja::Value) -> Response {
    let rendered = TEMPLATES
        .get_template("index.html")
        .and_then(|template| template.render(ctx));

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

// ============ Handlers ============

/// Render the home page.
#[instrument]
pub async fn home() -> Response {
    render_index(context! {})
}

/// Predict sentiment for the submitted form and render the result page.
#[instrument(skip(state, form))]
pub async fn predict(State(state): State<AppState>, Form(form): Form<PredictForm>) -> Response {
    match predict_text(&state, form.text).await {
        PredictOutcome::Classified { text, result } => render_index(context! {
            text => text,
            sentiment => result.label.as_str(),
            confidence => result.confidence_percent(),
        }),
        PredictOutcome::Rejected(error) => render_index(context! { error => error }),
        PredictOutcome::Failed(error) => render_index(context! { error => error }),
    }
}

/// JSON variant of [`predict`].
#[instrument(skip(state, req))]
pub async fn predict_json(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Response {
    match predict_text(&state, req.text).await {
        PredictOutcome::Classified { text, result } => Json(PredictResponse {
            text,
            sentiment: result.label.to_string(),
            confidence: result.confidence_percent(),
        })
        .into_response(),
        PredictOutcome::Rejected(error) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
        }
        PredictOutcome::Failed(error) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error })).into_response()
        }
    }
}

/// Health check endpoint. 503 with status `starting` until the model is loaded.
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let model_loaded = state.is_ready();
    let (code, status) = if model_loaded {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            model_loaded,
            device: state.device().to_string(),
        }),
    )
}

/// Which replica is serving this request.
#[instrument(skip(state))]
pub async fn container_info(State(state): State<AppState>) -> Json<ContainerInfo> {
    Json(ContainerInfo {
        container_id: state.container_id().to_string(),
        status: "serving".to_string(),
    })
}
