use std::{net::SocketAddr, str::FromStr};

use anyhow::Result;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderName, Method, Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use specta::Type;
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    CoreError,
    catalog::{
        Catalog, ExportMap, Page, PageRequest, TagRequest, TagResponse, TranslationRequest,
        TranslationResponse, TranslationSearchRequest, search,
    },
    config::SeedSection,
    error::ErrorKind,
    model::{TagId, TranslationId},
    seed::{SeedReport, Seeder},
};

const DEFAULT_LIST_PAGE_SIZE: i64 = 10;
const TOKEN_HEADER: &str = "x-api-token";

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Catalog,
    pub seed: SeedSection,
    pub auth: HttpAuth,
}

impl HttpState {
    pub fn new(catalog: Catalog, seed: SeedSection, auth: HttpAuth) -> Self {
        Self { catalog, seed, auth }
    }
}

#[derive(Debug)]
pub struct HttpServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl HttpServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    page: Option<i64>,
    size: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unauthorized(String),
    Internal(String),
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Validation => ApiError::BadRequest(message),
            ErrorKind::Conflict => ApiError::Conflict(message),
            ErrorKind::Internal => {
                error!(error = ?err, "catalog operation failed");
                ApiError::Internal(message)
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CoreError>() {
            Ok(core) => ApiError::from(core),
            Err(other) => {
                error!(error = ?other, "request failed");
                ApiError::internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[derive(Clone, Default)]
pub struct HttpAuth {
    token: Option<String>,
}

impl HttpAuth {
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    fn verify(&self, req: &Request<Body>) -> Result<(), ApiError> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };

        let matches_authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|value| value.trim() == expected)
            .unwrap_or(false);

        let matches_custom = req
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim() == expected)
            .unwrap_or(false);

        if matches_authorization || matches_custom {
            return Ok(());
        }

        warn!(path = %req.uri().path(), "rejected request without valid token");
        Err(ApiError::unauthorized("missing valid authentication token"))
    }
}

pub fn build_router(state: HttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(TOKEN_HEADER),
        ])
        .allow_origin(Any);

    let auth_state = state.auth.clone();

    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/tags", get(list_tags).post(create_tags))
        .route("/api/tags/:id", get(get_tag).put(update_tag).delete(delete_tag))
        .route("/api/translations", get(list_translations).post(create_translations))
        .route("/api/translations/search", post(search_translations))
        .route("/api/translations/export", get(export_translations))
        .route("/api/translations/status", get(get_status))
        .route(
            "/api/translations/:id",
            get(get_translation).put(update_translation).delete(delete_translation),
        )
        .route("/api/seeder/seed", post(run_seed))
        .layer(middleware::from_fn_with_state(auth_state, authenticate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn authenticate(
    State(auth): State<HttpAuth>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    auth.verify(&req)?;
    Ok(next.run(req).await)
}

pub async fn spawn_http_server(state: HttpState, addr: SocketAddr) -> Result<HttpServerHandle> {
    let router = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("HTTP server listening on {}", local_addr);

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            error!("HTTP server terminated with error: {err}");
        }
    });

    Ok(HttpServerHandle { addr: local_addr, task })
}

fn parse_id<T: From<Uuid>>(raw: &str, entity: &str) -> Result<T, ApiError> {
    Uuid::from_str(raw.trim())
        .map(T::from)
        .map_err(|_| ApiError::bad_request(format!("invalid {entity} id '{raw}'")))
}

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_status() -> &'static str {
    "working..."
}

async fn create_tags(
    State(state): State<HttpState>,
    Json(body): Json<Vec<TagRequest>>,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let created = blocking(&state.catalog, move |catalog| catalog.tags().create_tags(body)).await?;
    Ok(Json(created.into_iter().map(TagResponse::from).collect()))
}

async fn list_tags(State(state): State<HttpState>) -> Json<Vec<TagResponse>> {
    Json(state.catalog.tags().all_tags().into_iter().map(TagResponse::from).collect())
}

async fn get_tag(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Json<TagResponse>, ApiError> {
    let id: TagId = parse_id(&id, "tag")?;
    let tag = state.catalog.tags().tag(&id)?;
    Ok(Json(tag.into()))
}

async fn update_tag(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let id: TagId = parse_id(&id, "tag")?;
    let tag =
        blocking(&state.catalog, move |catalog| catalog.tags().update_tag(&id, &body.name)).await?;
    Ok(Json(tag.into()))
}

async fn delete_tag(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: TagId = parse_id(&id, "tag")?;
    if blocking(&state.catalog, move |catalog| catalog.tags().delete_tag(&id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(CoreError::TagNotFound { id }.into())
    }
}

async fn create_translations(
    State(state): State<HttpState>,
    Json(body): Json<Vec<TranslationRequest>>,
) -> Result<Json<Vec<TranslationResponse>>, ApiError> {
    let created =
        blocking(&state.catalog, move |catalog| catalog.translations().create_translations(body))
            .await?;
    Ok(Json(created))
}

async fn list_translations(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<TranslationResponse>>, ApiError> {
    let request = PageRequest::new(
        query.page.unwrap_or(0),
        query.size.unwrap_or(DEFAULT_LIST_PAGE_SIZE),
    )?;
    Ok(Json(state.catalog.translations().all_translations(request)))
}

async fn get_translation(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let id: TranslationId = parse_id(&id, "translation")?;
    Ok(Json(state.catalog.translations().translation(&id)?))
}

async fn update_translation(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Json(body): Json<TranslationRequest>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let id: TranslationId = parse_id(&id, "translation")?;
    let updated =
        blocking(&state.catalog, move |catalog| catalog.translations().update_translation(&id, body))
            .await?;
    Ok(Json(updated))
}

async fn delete_translation(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: TranslationId = parse_id(&id, "translation")?;
    blocking(&state.catalog, move |catalog| catalog.translations().delete_translation(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search_translations(
    State(state): State<HttpState>,
    Json(body): Json<TranslationSearchRequest>,
) -> Result<Json<Page<TranslationResponse>>, ApiError> {
    let (filter, page) = search::split_request(&body)?;
    Ok(Json(state.catalog.search().search(&filter, page)))
}

async fn export_translations(State(state): State<HttpState>) -> Result<Json<ExportMap>, ApiError> {
    let export = blocking(&state.catalog, |catalog| Ok(catalog.export().export_all())).await?;
    Ok(Json(export))
}

async fn run_seed(State(state): State<HttpState>) -> Result<Json<SeedReport>, ApiError> {
    let config = state.seed;
    let report = blocking(&state.catalog, move |catalog| Seeder::new(catalog).run(config)).await?;
    Ok(Json(report))
}

/// Run catalog work on the blocking pool, off the async workers.
///
/// Writes hold the store's write lock and append to the journal.
async fn blocking<R, F>(catalog: &Catalog, work: F) -> Result<R, ApiError>
where
    F: FnOnce(Catalog) -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    let catalog = catalog.clone();
    tokio::task::spawn_blocking(move || work(catalog))
        .await
        .map_err(|err| ApiError::internal(format!("catalog task failed: {err}")))?
        .map_err(ApiError::from)
}
