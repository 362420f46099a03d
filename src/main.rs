use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use checklist::VisitType;
use hvn_core::{
    CoreConfig, FileVisitStore, VisitError, VisitStore, autosave_debounce_from_env_value,
    sign_and_lock,
};
use hvn_uuid::VisitId;

/// Application state shared across REST API handlers.
///
/// Holds the file-backed visit store and the optional API key the auth collaborator
/// supplies. The key is treated as an opaque credential: compared, never inspected.
#[derive(Clone)]
struct AppState {
    store: Arc<FileVisitStore>,
    api_key: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, create_visit, get_checklist, save_checklist, generate_note, sign_visit),
    components(schemas(
        HealthRes,
        CreateVisitReq,
        CreateVisitRes,
        VisitRes,
        SaveChecklistReq,
        NoteRes,
        SignRes
    ))
)]
struct ApiDoc;

#[derive(serde::Serialize, ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

#[derive(serde::Deserialize, ToSchema)]
struct CreateVisitReq {
    /// Visit type wire name, e.g. "SOC" or "InitialEval".
    visit_type: String,
}

#[derive(serde::Serialize, ToSchema)]
struct CreateVisitRes {
    visit_id: String,
}

/// The persisted shape of a visit's checklist as exposed to callers.
#[derive(serde::Serialize, ToSchema)]
struct VisitRes {
    visit_id: String,
    visit_type: String,
    locked: bool,
    fields: BTreeMap<String, String>,
    rendered_note: Option<String>,
}

#[derive(serde::Deserialize, ToSchema)]
struct SaveChecklistReq {
    /// Whole checklist replacement: every save carries the full field mapping.
    fields: BTreeMap<String, String>,
}

#[derive(serde::Serialize, ToSchema)]
struct NoteRes {
    note_text: String,
}

#[derive(serde::Serialize, ToSchema)]
struct SignRes {
    /// True when the visit had already been signed; the caller should report
    /// "already done" rather than a fresh signature.
    already_signed: bool,
    note_text: String,
}

/// Main entry point for the HVN REST server.
///
/// # Environment Variables
/// - `HVN_ADDR`: server address (default: "0.0.0.0:3000")
/// - `HVN_DATA_DIR`: directory for visit document storage (default: "/visit_data")
/// - `HVN_AUTOSAVE_MS`: autosave debounce window in milliseconds (default: 900)
/// - `API_KEY`: optional API key; when set, visit routes require an `x-api-key` header
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("hvn=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("HVN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir: PathBuf = std::env::var("HVN_DATA_DIR")
        .unwrap_or_else(|_| "/visit_data".into())
        .into();
    let debounce = autosave_debounce_from_env_value(std::env::var("HVN_AUTOSAVE_MS").ok())?;
    let config = CoreConfig::new(data_dir, debounce)?;
    let api_key = std::env::var("API_KEY").ok().filter(|key| !key.is_empty());

    tracing::info!("++ Starting HVN REST on {}", addr);
    tracing::info!("++ Visit data dir: {}", config.visit_data_dir().display());
    if api_key.is_none() {
        tracing::warn!("API_KEY not set; visit routes are open");
    }

    let state = AppState {
        store: Arc::new(FileVisitStore::new(config.visits_dir())),
        api_key,
    };

    let visit_routes = Router::new()
        .route("/visits", post(create_visit))
        .route(
            "/visits/:visit_id/checklist",
            get(get_checklist).put(save_checklist),
        )
        .route("/visits/:visit_id/note", post(generate_note))
        .route("/visits/:visit_id/sign", post(sign_visit))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    let app = Router::new()
        .route("/health", get(health))
        .merge(visit_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Checks the `x-api-key` header against the configured key.
///
/// With no key configured the routes are open; the credential itself is opaque to HVN.
async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = &state.api_key else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    if provided == Some(expected.as_str()) {
        next.run(req).await
    } else {
        (StatusCode::UNAUTHORIZED, "Invalid API key").into_response()
    }
}

/// Maps a core error to an HTTP response, logging the ones that are our fault.
fn error_response(context: &str, err: VisitError) -> (StatusCode, String) {
    let status = match &err {
        VisitError::NotFound(_) => StatusCode::NOT_FOUND,
        VisitError::Locked(_) | VisitError::AlreadyLocked(_) => StatusCode::CONFLICT,
        VisitError::UnknownVisitType(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VisitError::InvalidVisitId(_) | VisitError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("{context} error: {err:?}");
        return (status, "Internal error".to_string());
    }

    (status, err.to_string())
}

fn parse_visit_id(raw: &str) -> Result<VisitId, (StatusCode, String)> {
    VisitId::parse(raw).map_err(|e| error_response("parse visit id", e.into()))
}

fn visit_response(stored: hvn_core::StoredVisit) -> VisitRes {
    VisitRes {
        visit_id: stored.visit_id.to_string(),
        visit_type: stored.visit_type.to_string(),
        locked: stored.locked,
        fields: stored
            .fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        rendered_note: stored.rendered_note,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint used for monitoring and load balancer health checks.
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "HVN is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/visits",
    request_body = CreateVisitReq,
    responses(
        (status = 201, description = "Visit created", body = CreateVisitRes),
        (status = 422, description = "Unknown visit type"),
        (status = 500, description = "Internal server error")
    )
)]
/// Creates a new visit with an empty checklist record.
async fn create_visit(
    State(state): State<AppState>,
    Json(req): Json<CreateVisitReq>,
) -> Result<(StatusCode, Json<CreateVisitRes>), (StatusCode, String)> {
    let visit_type: VisitType = req
        .visit_type
        .parse()
        .map_err(|e: checklist::ChecklistError| error_response("create visit", e.into()))?;

    let visit_id = state
        .store
        .create(visit_type)
        .map_err(|e| error_response("create visit", e))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateVisitRes {
            visit_id: visit_id.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/visits/{visit_id}/checklist",
    params(("visit_id" = String, Path, description = "Canonical visit identifier")),
    responses(
        (status = 200, description = "Checklist and lock state", body = VisitRes),
        (status = 404, description = "Visit not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Returns the visit's checklist fields, lock flag, and last rendered note.
async fn get_checklist(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
) -> Result<Json<VisitRes>, (StatusCode, String)> {
    let visit_id = parse_visit_id(&visit_id)?;
    let stored = state
        .store
        .get(&visit_id)
        .map_err(|e| error_response("get checklist", e))?;

    Ok(Json(visit_response(stored)))
}

#[utoipa::path(
    put,
    path = "/visits/{visit_id}/checklist",
    params(("visit_id" = String, Path, description = "Canonical visit identifier")),
    request_body = SaveChecklistReq,
    responses(
        (status = 200, description = "Checklist saved", body = VisitRes),
        (status = 404, description = "Visit not found"),
        (status = 409, description = "Visit is signed and locked"),
        (status = 500, description = "Internal server error")
    )
)]
/// Replaces the visit's checklist record.
///
/// Autosave and explicit saves both land here; the store refuses the write once the
/// visit is signed. Unknown keys are dropped (and logged), declared keys absent from the
/// payload reset to empty.
async fn save_checklist(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
    Json(req): Json<SaveChecklistReq>,
) -> Result<Json<VisitRes>, (StatusCode, String)> {
    let visit_id = parse_visit_id(&visit_id)?;

    let stored = state
        .store
        .get(&visit_id)
        .map_err(|e| error_response("save checklist", e))?;
    let fields = checklist::ChecklistRecord::conform(stored.visit_type, req.fields);

    state
        .store
        .set(&visit_id, &fields)
        .map_err(|e| error_response("save checklist", e))?;

    let stored = state
        .store
        .get(&visit_id)
        .map_err(|e| error_response("save checklist", e))?;
    Ok(Json(visit_response(stored)))
}

#[utoipa::path(
    post,
    path = "/visits/{visit_id}/note",
    params(("visit_id" = String, Path, description = "Canonical visit identifier")),
    responses(
        (status = 200, description = "Rendered narrative note", body = NoteRes),
        (status = 404, description = "Visit not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Renders the narrative note from the stored checklist.
///
/// For an editable visit the note is also persisted. For a locked visit the note is
/// re-rendered from the frozen record without writing — rendering is deterministic, so
/// this always reproduces the signed note.
async fn generate_note(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
) -> Result<Json<NoteRes>, (StatusCode, String)> {
    let visit_id = parse_visit_id(&visit_id)?;

    let stored = state
        .store
        .get(&visit_id)
        .map_err(|e| error_response("generate note", e))?;
    let note = checklist::render(stored.visit_type, &stored.fields);

    if !stored.locked {
        state
            .store
            .set_rendered_note(&visit_id, &note)
            .map_err(|e| error_response("generate note", e))?;
    }

    Ok(Json(NoteRes { note_text: note }))
}

#[utoipa::path(
    post,
    path = "/visits/{visit_id}/sign",
    params(("visit_id" = String, Path, description = "Canonical visit identifier")),
    responses(
        (status = 200, description = "Visit signed (or already signed)", body = SignRes),
        (status = 404, description = "Visit not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Signs and locks the visit, freezing its checklist and note.
///
/// A visit that is already signed — including one signed by a concurrent caller during
/// this request — responds with `already_signed: true` rather than an error.
async fn sign_visit(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
) -> Result<Json<SignRes>, (StatusCode, String)> {
    let visit_id = parse_visit_id(&visit_id)?;

    let stored = state
        .store
        .get(&visit_id)
        .map_err(|e| error_response("sign visit", e))?;

    if stored.locked {
        let note_text = match stored.rendered_note {
            Some(note) => note,
            None => checklist::render(stored.visit_type, &stored.fields),
        };
        return Ok(Json(SignRes {
            already_signed: true,
            note_text,
        }));
    }

    match sign_and_lock(
        state.store.as_ref(),
        &visit_id,
        stored.visit_type,
        &stored.fields,
    ) {
        Ok(note_text) => Ok(Json(SignRes {
            already_signed: false,
            note_text,
        })),
        Err(VisitError::AlreadyLocked(_)) => {
            let stored = state
                .store
                .get(&visit_id)
                .map_err(|e| error_response("sign visit", e))?;
            let note_text = match stored.rendered_note {
                Some(note) => note,
                None => checklist::render(stored.visit_type, &stored.fields),
            };
            Ok(Json(SignRes {
                already_signed: true,
                note_text,
            }))
        }
        Err(e) => Err(error_response("sign visit", e)),
    }
}
