//! HTTP surface: routes, JSON shaping and error-to-status mapping.

use {
    crate::{
        error::{error_chain, ProgressError, ProvisionError},
        progress::{PoolProgress, ProgressReader},
        provision::{PoolMetadata, ProvisionOutcome, ProvisionRequest, Provisioner},
    },
    axum::{
        extract::{FromRequest, Path, Request, State},
        http::{header, StatusCode, Uri},
        response::{IntoResponse, Response},
        routing::{get, post},
        Form, Json, Router,
    },
    log::{error, info, warn},
    serde::Deserialize,
    serde_json::{json, Map, Value},
    std::{collections::HashMap, future::Future, io, net::SocketAddr, sync::Arc},
    tokio::net::TcpListener,
    tower_http::cors::CorsLayer,
};

pub const CREATE_PATH: &str = "/api/launchpad/create";
pub const PROGRESS_PATH: &str = "/api/launchpad/info/poolProgression/{config_address}";

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<Provisioner>,
    pub progress: Arc<ProgressReader>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route(CREATE_PATH, post(create_pool))
        .route(PROGRESS_PATH, get(pool_progression))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `router` on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to listen for SIGTERM: {err}");
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
    info!("shutdown signal received");
}

// ── Handlers ────────────────────────────────────────────────────────

async fn banner() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Launchpad API",
        "endpoints": {
            "createPool": "POST /api/launchpad/create",
            "getPoolInfo": "GET /api/launchpad/info/poolProgression/:configAddress",
        },
    }))
}

async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("Route {uri} not found"),
        })),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PoolDataBody {
    name: Option<String>,
    symbol: Option<String>,
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CreatePoolBody {
    feeclaimer: Option<String>,
    /// A JSON number or a numeric string.
    quote_threshold: Option<Value>,
    pool_data: Option<PoolDataBody>,
}

impl CreatePoolBody {
    /// Flat form fields, with pool metadata under `poolData[name]` and friends.
    fn from_form(mut fields: HashMap<String, String>) -> Self {
        let mut pool_field = |name: &str| fields.remove(&format!("poolData[{name}]"));
        let (name, symbol, uri) = (pool_field("name"), pool_field("symbol"), pool_field("uri"));
        let pool_data = (name.is_some() || symbol.is_some() || uri.is_some())
            .then_some(PoolDataBody { name, symbol, uri });
        Self {
            feeclaimer: fields.remove("feeclaimer"),
            quote_threshold: fields.remove("quoteThreshold").map(Value::String),
            pool_data,
        }
    }

    /// JSON, or `application/x-www-form-urlencoded` when the request says so.
    async fn extract(request: Request) -> Result<Self, String> {
        let is_form = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            Form::<HashMap<String, String>>::from_request(request, &())
                .await
                .map(|Form(fields)| Self::from_form(fields))
                .map_err(|rejection| rejection.body_text())
        } else {
            Json::<Self>::from_request(request, &())
                .await
                .map(|Json(body)| body)
                .map_err(|rejection| rejection.body_text())
        }
    }
}

impl From<CreatePoolBody> for ProvisionRequest {
    fn from(body: CreatePoolBody) -> Self {
        let quote_threshold = body.quote_threshold.and_then(|value| match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        Self {
            fee_claimer: body.feeclaimer,
            quote_threshold,
            pool_metadata: body.pool_data.map(|data| PoolMetadata {
                name: data.name.unwrap_or_default(),
                symbol: data.symbol.unwrap_or_default(),
                uri: data.uri.unwrap_or_default(),
            }),
        }
    }
}

async fn create_pool(State(state): State<AppState>, request: Request) -> Response {
    let body = match CreatePoolBody::extract(request).await {
        Ok(body) => body,
        Err(reason) => {
            warn!("rejected create request: {reason}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid request body",
                    "message": reason,
                    "kind": "validation_error",
                })),
            )
                .into_response();
        }
    };

    match state.provisioner.provision(body.into()).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome_body(&outcome))).into_response(),
        Err(err) => provision_error_response(&err),
    }
}

async fn pool_progression(
    State(state): State<AppState>,
    Path(config_address): Path<String>,
) -> Response {
    match state.progress.get_progress(&config_address).await {
        Ok(progress) => (StatusCode::OK, Json(progress_body(&progress))).into_response(),
        Err(err) => progress_error_response(&err),
    }
}

// ── Response shaping ────────────────────────────────────────────────

fn outcome_body(outcome: &ProvisionOutcome) -> Value {
    json!({
        "success": true,
        "message": "Config and pool created successfully",
        "data": {
            "wallet": outcome.wallet.to_string(),
            "feeclaimer": outcome.fee_claimer.to_string(),
            "cluster": outcome.cluster.as_str(),
            "config": {
                "config_address": outcome.config_address.to_string(),
                "transactionSignature": outcome.config_signature.to_string(),
                "explorerUrl": outcome.config_explorer_url,
            },
            "pool": {
                "address": outcome.pool_address.to_string(),
                "baseMint": outcome.base_mint.to_string(),
                "transactionSignature": outcome.pool_signature.to_string(),
                "explorerUrl": outcome.pool_explorer_url,
            },
            "solSpent": outcome.sol_spent,
        },
    })
}

fn progress_body(progress: &PoolProgress) -> Value {
    json!({
        "success": true,
        "message": "Pool progress retrieved successfully",
        "data": {
            "pool": {
                "address": progress.pool_address.to_string(),
                "progress": {
                    "progress": progress.progress,
                    "progressInPercent": progress.progress_in_percent,
                },
            },
            "metadata": {
                "timestamp": progress.timestamp,
            },
        },
    })
}

fn provision_error_response(err: &ProvisionError) -> Response {
    let details = error_chain(err);
    let mut body = Map::new();

    let status = if err.is_precondition() {
        warn!("rejected create request: {details}");
        StatusCode::BAD_REQUEST
    } else {
        error!("failed to create config and pool: {details}");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let label = match err {
        ProvisionError::Validation(_) => "Invalid request",
        ProvisionError::Credentials(_) => "Signer not configured",
        _ => "Failed to create config and pool",
    };
    body.insert("error".into(), label.into());
    body.insert("message".into(), err.to_string().into());
    body.insert("kind".into(), err.kind().as_str().into());
    if !matches!(err, ProvisionError::Validation(_)) {
        body.insert("details".into(), details.into());
    }
    if let Some(state) = err.state() {
        body.insert("state".into(), state.as_str().into());
    }

    let partial = err.partial();
    for (key, value) in [
        ("configAddress", partial.config_address.map(|a| a.to_string())),
        ("configSignature", partial.config_signature.map(|s| s.to_string())),
        ("poolAddress", partial.pool_address.map(|a| a.to_string())),
        ("baseMint", partial.base_mint.map(|a| a.to_string())),
        ("poolSignature", partial.pool_signature.map(|s| s.to_string())),
    ] {
        if let Some(value) = value {
            body.insert(key.into(), value.into());
        }
    }

    (status, Json(Value::Object(body))).into_response()
}

fn progress_error_response(err: &ProgressError) -> Response {
    let details = error_chain(err);
    let (status, label) = match err {
        ProgressError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid config address format"),
        ProgressError::NotFound(_) => (StatusCode::NOT_FOUND, "Pool not found"),
        ProgressError::Ledger(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to get pool progress",
        ),
    };
    if status.is_server_error() {
        error!("failed to get pool progress: {details}");
    } else {
        warn!("rejected progress request: {details}");
    }
    (
        status,
        Json(json!({
            "error": label,
            "message": err.to_string(),
            "details": details,
            "kind": err.kind().as_str(),
        })),
    )
        .into_response()
}
