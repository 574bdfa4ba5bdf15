use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use athlete_features::{
    fatigue_response, injury_response, triage_response, ErrorResponse, FatigueResponse,
    FeatureSource, InjuryResponse, ModelVariant, PredictError, Prediction, TriageResponse,
};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::model::InferenceContext;
use crate::types::{
    parse_body, FatigueRequest, HealthResponse, InjuryRequest, ReloadResponse, TriageRequest,
};

pub const FATIGUE_ROUTE: &str = "/predict-fatigue";
pub const TRIAGE_ROUTE: &str = "/predict-injury";
pub const INJURY_ROUTE: &str = "/predict_injury";

// ---------- Server state ----------

/// Shared by every handler. The lock only guards publishing a new context;
/// requests clone the inner `Arc` and never hold the lock while inferring.
#[derive(Clone)]
pub struct AppState {
    ctx: Arc<RwLock<Arc<InferenceContext>>>,
    config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(ctx: InferenceContext, config: ServiceConfig) -> Self {
        Self {
            ctx: Arc::new(RwLock::new(Arc::new(ctx))),
            config: Arc::new(config),
        }
    }

    pub fn current(&self) -> Arc<InferenceContext> {
        Arc::clone(&self.ctx.read())
    }

    /// Replaces the served context. Requests already running finish on the
    /// context they started with.
    pub fn publish(&self, ctx: InferenceContext) {
        *self.ctx.write() = Arc::new(ctx);
    }

    fn run(&self, sample: &impl FeatureSource) -> Result<Prediction, ApiError> {
        let variant = sample.variant();
        let features = sample.features()?;
        let ctx = self.current();
        let engine = ctx.engine(variant).ok_or(ApiError::NotLoaded(variant))?;

        // Debug signal so feature order and values can be checked against training
        if self.config.log_predictions {
            let dump: Vec<String> = features
                .named()
                .map(|(name, v)| format!("{}={:.4}", name, v))
                .collect();
            tracing::info!(
                "recv {} in_dim={} features=[{}]",
                variant,
                features.len(),
                dump.join(", ")
            );
        }

        Ok(engine.infer(&features)?)
    }
}

// ---------- Errors ----------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error("{0} contract is not loaded")]
    NotLoaded(ModelVariant),
    #[error("reload failed: {0}")]
    Reload(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Predict(PredictError::MissingField(_))
            | ApiError::Predict(PredictError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Predict(_) | ApiError::NotLoaded(_) | ApiError::Reload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("rejected request: {}", self);
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

// ---------- Handlers ----------

pub async fn predict_fatigue(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FatigueResponse>, ApiError> {
    let sample = parse_body::<FatigueRequest>(&body)?.into_sample()?;
    let prediction = state.run(&sample)?;
    Ok(Json(fatigue_response(prediction)?))
}

pub async fn predict_triage(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TriageResponse>, ApiError> {
    let sample = parse_body::<TriageRequest>(&body)?.into_sample()?;
    let prediction = state.run(&sample)?;
    Ok(Json(triage_response(prediction)?))
}

pub async fn predict_injury(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<InjuryResponse>, ApiError> {
    let sample = parse_body::<InjuryRequest>(&body)?.into_sample()?;
    let prediction = state.run(&sample)?;
    Ok(Json(injury_response(prediction)?))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        contracts: state.current().contracts(),
    })
}

/// Rebuilds the context from the startup config's artifact paths. The old
/// context keeps serving if anything fails.
///
/// Shares the public listener and has no access control; expose the service
/// only on trusted networks.
pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let config = Arc::clone(&state.config);
    let ctx = tokio::task::spawn_blocking(move || InferenceContext::load(&config))
        .await
        .map_err(|e| ApiError::Reload(e.to_string()))?
        .map_err(|e| ApiError::Reload(format!("{:#}", e)))?;
    let contracts = ctx.contracts();
    state.publish(ctx);
    tracing::info!("reloaded model artifacts: {:?}", contracts);
    Ok(Json(ReloadResponse {
        reloaded: true,
        contracts,
    }))
}

/// Mounts one predict route per contract loaded at startup.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/admin/reload", post(reload));
    for variant in state.current().contracts() {
        app = match variant {
            ModelVariant::Fatigue => app.route(FATIGUE_ROUTE, post(predict_fatigue)),
            ModelVariant::InjuryTriage => app.route(TRIAGE_ROUTE, post(predict_triage)),
            ModelVariant::InjuryBinary => app.route(INJURY_ROUTE, post(predict_injury)),
        };
    }
    app.with_state(state)
}
