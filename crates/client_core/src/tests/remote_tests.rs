use super::*;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode as HttpStatus},
    routing::{get, post, put},
    Json, Router,
};
use shared::{
    domain::{AdminSummary, MediaKind},
    protocol::{FeaturedQuery, MessageResponse, ProjectDraft},
};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const TOKEN: &str = "secret-token";

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn push(&self, call: impl Into<String>) {
        self.calls.lock().expect("lock").push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

fn project(id: i64, title: &str) -> Project {
    let now = chrono::Utc::now();
    Project {
        id: ProjectId(id),
        title: title.to_string(),
        client: String::new(),
        date: "January 2025".into(),
        location: String::new(),
        description: String::new(),
        featured: false,
        published: true,
        order: 0,
        media: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

type Rejection = (HttpStatus, Json<ApiError>);

fn require_token(headers: &HeaderMap) -> Result<(), Rejection> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((
            HttpStatus::FORBIDDEN,
            Json(ApiError::new(ErrorCode::Forbidden, "not authenticated")),
        )),
    }
}

async fn spawn_fake_server(recorder: Recorder) -> String {
    let app = Router::new()
        .route(
            "/api/auth/login",
            post(|Json(req): Json<Credentials>| async move {
                Json(TokenResponse {
                    access_token: TOKEN.into(),
                    token_type: "bearer".into(),
                    user: AdminSummary {
                        username: req.username,
                    },
                })
            }),
        )
        .route(
            "/api/projects",
            get(|| async { Json(vec![project(1, "Public")]) }).post(
                |headers: HeaderMap, Json(req): Json<ProjectCreate>| async move {
                    require_token(&headers)?;
                    let mut created = project(5, &req.draft.title);
                    created.published = req.published;
                    Ok::<_, Rejection>(Json(created))
                },
            ),
        )
        .route(
            "/api/projects/:project_id",
            get(|Path(project_id): Path<i64>| async move {
                if project_id == 99 {
                    return Err((
                        HttpStatus::NOT_FOUND,
                        Json(ApiError::not_found("project not found")),
                    ));
                }
                Ok(Json(project(project_id, "Found")))
            }),
        )
        .route(
            "/api/projects/:project_id/media",
            post(
                |State(recorder): State<Recorder>,
                 headers: HeaderMap,
                 Path(project_id): Path<i64>,
                 mut multipart: Multipart| async move {
                    require_token(&headers)?;
                    let field = multipart
                        .next_field()
                        .await
                        .ok()
                        .flatten()
                        .ok_or((
                            HttpStatus::BAD_REQUEST,
                            Json(ApiError::validation("missing file")),
                        ))?;
                    let name = field.name().unwrap_or_default().to_string();
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let bytes = field.bytes().await.unwrap_or_default();
                    recorder.push(format!(
                        "upload {project_id} {name} {filename} {content_type} {}",
                        bytes.len()
                    ));
                    Ok::<_, Rejection>(Json(MediaItem {
                        id: MediaId(42),
                        kind: MediaKind::Image,
                        url: format!("/uploads/{filename}"),
                        alt: String::new(),
                        order: 3,
                        featured: false,
                    }))
                },
            ),
        )
        .route(
            "/api/projects/:project_id/media/reorder",
            put(
                |State(recorder): State<Recorder>,
                 headers: HeaderMap,
                 Path(project_id): Path<i64>,
                 Json(req): Json<MediaReorderRequest>| async move {
                    require_token(&headers)?;
                    let ids: Vec<String> = req
                        .media_order
                        .iter()
                        .map(|e| format!("{}:{}", e.id.0, e.order))
                        .collect();
                    recorder.push(format!("reorder {project_id} {}", ids.join(",")));
                    Ok::<_, Rejection>(Json(MessageResponse::new("media reordered")))
                },
            ),
        )
        .route(
            "/api/projects/:project_id/media/:media_id/featured",
            put(
                |State(recorder): State<Recorder>,
                 Path((project_id, media_id)): Path<(i64, i64)>,
                 Query(q): Query<FeaturedQuery>| async move {
                    recorder.push(format!("featured {project_id} {media_id} {}", q.featured));
                    Json(MessageResponse::new("featured status updated"))
                },
            ),
        )
        .route(
            "/api/featured",
            get(|| async { (HttpStatus::BAD_GATEWAY, "upstream exploded") }),
        )
        .with_state(recorder);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

#[test]
fn base_url_gains_trailing_slash_for_joins() {
    let client = HttpPortfolioClient::new("http://localhost:8001/portfolio").expect("client");
    assert_eq!(client.base_url().as_str(), "http://localhost:8001/portfolio/");
    assert_eq!(
        client.endpoint("projects").expect("endpoint").as_str(),
        "http://localhost:8001/portfolio/api/projects"
    );
    assert!(HttpPortfolioClient::new("not a url").is_err());
}

#[tokio::test]
async fn public_reads_need_no_token() {
    let base = spawn_fake_server(Recorder::default()).await;
    let client = HttpPortfolioClient::new(&base).expect("client");

    let projects = client.list_projects(false).await.expect("projects");
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].title, "Public");

    let found = client.get_project(ProjectId(4)).await.expect("project");
    assert_eq!(found.id, ProjectId(4));
}

#[tokio::test]
async fn server_error_bodies_map_to_client_errors() {
    let base = spawn_fake_server(Recorder::default()).await;
    let client = HttpPortfolioClient::new(&base).expect("client");

    let missing = client
        .get_project(ProjectId(99))
        .await
        .expect_err("missing");
    assert!(missing.is_not_found());

    let unauthenticated = client
        .create_project(&ProjectDraft {
            title: "No token".into(),
            ..ProjectDraft::default()
        }
        .into())
        .await
        .expect_err("forbidden");
    assert!(matches!(unauthenticated, ClientError::Remote(_)));
    assert!(unauthenticated.to_string().contains("not authenticated"));

    let plain = client.list_featured().await.expect_err("bad gateway");
    assert!(plain.to_string().contains("upstream exploded"));
}

#[tokio::test]
async fn login_token_authorizes_admin_calls() {
    let recorder = Recorder::default();
    let base = spawn_fake_server(recorder.clone()).await;
    let mut client = HttpPortfolioClient::new(&base).expect("client");

    let token = client.login("admin", "admin123").await.expect("login");
    assert_eq!(token.user.username, "admin");
    assert_eq!(client.token(), Some(TOKEN));

    let created = client
        .create_project(&ProjectCreate {
            draft: ProjectDraft {
                title: "Wedding".into(),
                ..ProjectDraft::default()
            },
            published: false,
        })
        .await
        .expect("create");
    assert_eq!(created.title, "Wedding");
    assert!(!created.published);

    let uploaded = client
        .upload_media(ProjectId(5), "portrait.png", vec![1, 2, 3, 4])
        .await
        .expect("upload");
    assert_eq!(uploaded.id, MediaId(42));

    client
        .set_media_order(
            ProjectId(5),
            &[
                OrderEntry { id: MediaId(8), order: 0 },
                OrderEntry { id: MediaId(7), order: 1 },
            ],
        )
        .await
        .expect("reorder");
    client
        .set_media_featured(ProjectId(5), MediaId(8), true)
        .await
        .expect("featured");

    assert_eq!(
        recorder.calls(),
        vec![
            "upload 5 file portrait.png image/png 4".to_string(),
            "reorder 5 8:0,7:1".to_string(),
            "featured 5 8 true".to_string(),
        ]
    );
}
