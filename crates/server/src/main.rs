use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use server_api::{ApiContext, UploadStore};
use shared::{
    domain::{AdminSummary, FeaturedMedia, MediaId, MediaItem, Project, ProjectId, SiteSettings},
    error::{ApiError, ErrorCode},
    protocol::{
        Credentials, FeaturedQuery, HealthResponse, MediaReorderRequest, MessageResponse,
        ProjectCreate, ProjectReorderRequest, ProjectUpdate, RegisterResponse, TokenResponse,
    },
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod auth;
mod config;

use app_state::AppState;
use auth::{hash_password, issue_token, verify_password, AdminSession, JwtConfig};
use config::{load_settings, prepare_database_url};

type ApiFailure = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<Json<T>, ApiFailure>;

const MIN_PASSWORD_LEN: usize = 6;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let state = AppState {
        api: ApiContext {
            storage,
            uploads: UploadStore::new(settings.upload_dir.clone()),
        },
        jwt: JwtConfig {
            secret: settings.jwt_secret,
            ttl_minutes: settings.token_ttl_minutes,
        },
    };
    let app = build_router(Arc::new(state), settings.max_upload_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, upload_dir = %settings.upload_dir.display(), "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let upload_root = state.api.uploads.root().to_path_buf();
    let uploads = Router::new()
        .route("/api/projects/:project_id/media", post(http_upload_media))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/projects", get(http_list_projects).post(http_create_project))
        .route("/api/projects/reorder", put(http_reorder_projects))
        .route(
            "/api/projects/:project_id",
            get(http_get_project)
                .put(http_update_project)
                .delete(http_delete_project),
        )
        .route(
            "/api/projects/:project_id/media/reorder",
            put(http_reorder_media),
        )
        .route(
            "/api/projects/:project_id/media/:media_id",
            axum::routing::delete(http_delete_media),
        )
        .route(
            "/api/projects/:project_id/media/:media_id/featured",
            put(http_set_media_featured),
        )
        .route("/api/admin/projects", get(http_list_all_projects))
        .route("/api/admin/projects/:project_id", get(http_get_any_project))
        .route("/api/featured", get(http_list_featured))
        .route("/api/settings", get(http_get_settings).put(http_save_settings))
        .merge(uploads)
        .nest_service("/uploads", ServeDir::new(upload_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(err: ApiError) -> ApiFailure {
    if err.code == ErrorCode::Internal {
        error!(message = %err.message, "request failed");
    }
    (status_for(err.code), Json(err))
}

fn internal(err: impl std::fmt::Display) -> ApiFailure {
    failure(ApiError::new(ErrorCode::Internal, err.to_string()))
}

async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    state.api.storage.health_check().await.map_err(internal)?;
    Ok(Json(HealthResponse {
        status: "healthy".into(),
    }))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Credentials>,
) -> ApiResult<RegisterResponse> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(failure(ApiError::validation("username is required")));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(failure(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ))));
    }

    let existing = state.api.storage.admin_count().await.map_err(internal)?;
    if existing > 0 {
        warn!(%username, "registration attempted after admin exists");
        return Err(failure(ApiError::new(
            ErrorCode::Forbidden,
            "registration is closed",
        )));
    }

    let password_hash = hash_password(&req.password).map_err(internal)?;
    let created = state
        .api
        .storage
        .create_first_admin(username, &password_hash)
        .await
        .map_err(internal)?;
    if created.is_none() {
        warn!(%username, "registration lost to a concurrent one");
        return Err(failure(ApiError::new(
            ErrorCode::Forbidden,
            "registration is closed",
        )));
    }
    info!(%username, "admin registered");
    Ok(Json(RegisterResponse {
        message: "admin registered".into(),
        user: AdminSummary {
            username: username.to_string(),
        },
    }))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Credentials>,
) -> ApiResult<TokenResponse> {
    let rejected = || {
        failure(ApiError::new(
            ErrorCode::Unauthorized,
            "invalid username or password",
        ))
    };
    let admin = state
        .api
        .storage
        .find_admin(req.username.trim())
        .await
        .map_err(internal)?
        .ok_or_else(rejected)?;
    if !verify_password(&req.password, &admin.password_hash).map_err(internal)? {
        return Err(rejected());
    }

    let access_token =
        issue_token(&state.jwt, admin.admin_id, &admin.username).map_err(internal)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
        user: AdminSummary {
            username: admin.username,
        },
    }))
}

async fn http_list_projects(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Project>> {
    server_api::list_projects(&state.api, false)
        .await
        .map(Json)
        .map_err(failure)
}

async fn http_list_all_projects(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
) -> ApiResult<Vec<Project>> {
    server_api::list_projects(&state.api, true)
        .await
        .map(Json)
        .map_err(failure)
}

async fn http_get_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<i64>,
) -> ApiResult<Project> {
    server_api::get_public_project(&state.api, ProjectId(project_id))
        .await
        .map(Json)
        .map_err(failure)
}

async fn http_get_any_project(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(project_id): Path<i64>,
) -> ApiResult<Project> {
    server_api::get_project(&state.api, ProjectId(project_id))
        .await
        .map(Json)
        .map_err(failure)
}

async fn http_create_project(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Json(req): Json<ProjectCreate>,
) -> ApiResult<Project> {
    server_api::create_project(&state.api, &req)
        .await
        .map(Json)
        .map_err(failure)
}

async fn http_update_project(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(project_id): Path<i64>,
    Json(req): Json<ProjectUpdate>,
) -> ApiResult<Project> {
    server_api::update_project(&state.api, ProjectId(project_id), &req)
        .await
        .map(Json)
        .map_err(failure)
}

async fn http_delete_project(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(project_id): Path<i64>,
) -> ApiResult<MessageResponse> {
    server_api::delete_project(&state.api, ProjectId(project_id))
        .await
        .map_err(failure)?;
    Ok(Json(MessageResponse::new("project deleted")))
}

async fn http_reorder_projects(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Json(req): Json<ProjectReorderRequest>,
) -> ApiResult<MessageResponse> {
    server_api::set_project_order(&state.api, &req.project_order)
        .await
        .map_err(failure)?;
    Ok(Json(MessageResponse::new("projects reordered")))
}

async fn http_upload_media(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(project_id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<MediaItem> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| failure(ApiError::validation(e.to_string())))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| failure(ApiError::validation("file part has no filename")))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| failure(ApiError::validation(e.to_string())))?;
        return server_api::upload_media(&state.api, ProjectId(project_id), &filename, &bytes)
            .await
            .map(Json)
            .map_err(failure);
    }
    Err(failure(ApiError::validation("missing 'file' part")))
}

async fn http_delete_media(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path((project_id, media_id)): Path<(i64, i64)>,
) -> ApiResult<MessageResponse> {
    server_api::delete_media(&state.api, ProjectId(project_id), MediaId(media_id))
        .await
        .map_err(failure)?;
    Ok(Json(MessageResponse::new("media deleted")))
}

async fn http_set_media_featured(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path((project_id, media_id)): Path<(i64, i64)>,
    Query(q): Query<FeaturedQuery>,
) -> ApiResult<MessageResponse> {
    server_api::set_media_featured(
        &state.api,
        ProjectId(project_id),
        MediaId(media_id),
        q.featured,
    )
    .await
    .map_err(failure)?;
    Ok(Json(MessageResponse::new("featured status updated")))
}

async fn http_reorder_media(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(project_id): Path<i64>,
    Json(req): Json<MediaReorderRequest>,
) -> ApiResult<MessageResponse> {
    server_api::set_media_order(&state.api, ProjectId(project_id), &req.media_order)
        .await
        .map_err(failure)?;
    Ok(Json(MessageResponse::new("media reordered")))
}

async fn http_list_featured(State(state): State<Arc<AppState>>) -> ApiResult<Vec<FeaturedMedia>> {
    server_api::list_featured(&state.api)
        .await
        .map(Json)
        .map_err(failure)
}

async fn http_get_settings(State(state): State<Arc<AppState>>) -> ApiResult<SiteSettings> {
    server_api::load_settings(&state.api)
        .await
        .map(Json)
        .map_err(failure)
}

async fn http_save_settings(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Json(req): Json<SiteSettings>,
) -> ApiResult<SiteSettings> {
    server_api::save_settings(&state.api, &req)
        .await
        .map(Json)
        .map_err(failure)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
