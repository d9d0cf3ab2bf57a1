use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{FeaturedMedia, MediaId, MediaItem, Project, ProjectId, SiteSettings},
    error::{ApiError, ErrorCode},
    protocol::{
        Credentials, HealthResponse, MediaReorderRequest, OrderEntry, ProjectCreate,
        ProjectReorderRequest, ProjectUpdate, RegisterResponse, TokenResponse,
    },
};
use tracing::{debug, info};
use url::Url;

use crate::error::{ClientError, ClientResult};

/// The portfolio server as seen by the gallery and the admin sessions.
#[async_trait]
pub trait PortfolioRemote: Send + Sync {
    async fn list_projects(&self, include_unpublished: bool) -> ClientResult<Vec<Project>>;
    /// Public lookup; unpublished projects are not found.
    async fn get_project(&self, project_id: ProjectId) -> ClientResult<Project>;
    /// Admin lookup regardless of publication.
    async fn get_any_project(&self, project_id: ProjectId) -> ClientResult<Project>;
    async fn create_project(&self, req: &ProjectCreate) -> ClientResult<Project>;
    async fn update_project(&self, project_id: ProjectId, req: &ProjectUpdate)
        -> ClientResult<Project>;
    async fn delete_project(&self, project_id: ProjectId) -> ClientResult<()>;
    async fn set_project_order(&self, entries: &[OrderEntry<ProjectId>]) -> ClientResult<()>;
    async fn upload_media(
        &self,
        project_id: ProjectId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<MediaItem>;
    async fn delete_media(&self, project_id: ProjectId, media_id: MediaId) -> ClientResult<()>;
    async fn set_media_featured(
        &self,
        project_id: ProjectId,
        media_id: MediaId,
        featured: bool,
    ) -> ClientResult<()>;
    async fn set_media_order(
        &self,
        project_id: ProjectId,
        entries: &[OrderEntry<MediaId>],
    ) -> ClientResult<()>;
    async fn list_featured(&self) -> ClientResult<Vec<FeaturedMedia>>;
    async fn load_settings(&self) -> ClientResult<SiteSettings>;
    async fn save_settings(&self, settings: &SiteSettings) -> ClientResult<SiteSettings>;
}

fn code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
        StatusCode::FORBIDDEN => ErrorCode::Forbidden,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE => ErrorCode::Validation,
        StatusCode::PRECONDITION_FAILED => ErrorCode::PreconditionFailed,
        StatusCode::CONFLICT => ErrorCode::Conflict,
        _ => ErrorCode::Internal,
    }
}

/// Turns a non-2xx response into the server's `ApiError`, or a synthesized
/// one when the body is not an error document.
async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let error = serde_json::from_str::<ApiError>(&body)
        .unwrap_or_else(|_| ApiError::new(code_for_status(status), format!("{status}: {body}")));
    debug!(%status, code = ?error.code, message = %error.message, "request failed");
    Err(error.into())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    Ok(check(response).await?.json().await?)
}

/// `reqwest` client for the `/api` routes.
#[derive(Clone)]
pub struct HttpPortfolioClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpPortfolioClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> ClientResult<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| anyhow::anyhow!("invalid server url '{base_url}': {e}"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(&format!("api/{path}"))
            .map_err(|e| ClientError::Remote(anyhow::anyhow!("invalid endpoint '{path}': {e}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        read_json(self.http.get(self.endpoint("health")?).send().await?).await
    }

    pub async fn register(&self, username: &str, password: &str) -> ClientResult<RegisterResponse> {
        let response = self
            .http
            .post(self.endpoint("auth/register")?)
            .json(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        read_json(response).await
    }

    /// Logs in and keeps the bearer token for later admin calls.
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<TokenResponse> {
        let response = self
            .http
            .post(self.endpoint("auth/login")?)
            .json(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let token: TokenResponse = read_json(response).await?;
        info!(username = %token.user.username, "logged in");
        self.token = Some(token.access_token.clone());
        Ok(token)
    }
}

#[async_trait]
impl PortfolioRemote for HttpPortfolioClient {
    async fn list_projects(&self, include_unpublished: bool) -> ClientResult<Vec<Project>> {
        let request = if include_unpublished {
            self.authorized(self.http.get(self.endpoint("admin/projects")?))
        } else {
            self.http.get(self.endpoint("projects")?)
        };
        read_json(request.send().await?).await
    }

    async fn get_project(&self, project_id: ProjectId) -> ClientResult<Project> {
        let url = self.endpoint(&format!("projects/{}", project_id.0))?;
        read_json(self.http.get(url).send().await?).await
    }

    async fn get_any_project(&self, project_id: ProjectId) -> ClientResult<Project> {
        let url = self.endpoint(&format!("admin/projects/{}", project_id.0))?;
        read_json(self.authorized(self.http.get(url)).send().await?).await
    }

    async fn create_project(&self, req: &ProjectCreate) -> ClientResult<Project> {
        let request = self.http.post(self.endpoint("projects")?).json(req);
        read_json(self.authorized(request).send().await?).await
    }

    async fn update_project(
        &self,
        project_id: ProjectId,
        req: &ProjectUpdate,
    ) -> ClientResult<Project> {
        let url = self.endpoint(&format!("projects/{}", project_id.0))?;
        read_json(self.authorized(self.http.put(url).json(req)).send().await?).await
    }

    async fn delete_project(&self, project_id: ProjectId) -> ClientResult<()> {
        let url = self.endpoint(&format!("projects/{}", project_id.0))?;
        check(self.authorized(self.http.delete(url)).send().await?).await?;
        Ok(())
    }

    async fn set_project_order(&self, entries: &[OrderEntry<ProjectId>]) -> ClientResult<()> {
        let body = ProjectReorderRequest {
            project_order: entries.to_vec(),
        };
        let request = self.http.put(self.endpoint("projects/reorder")?).json(&body);
        check(self.authorized(request).send().await?).await?;
        Ok(())
    }

    async fn upload_media(
        &self,
        project_id: ProjectId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<MediaItem> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())?;
        let url = self.endpoint(&format!("projects/{}/media", project_id.0))?;
        let request = self.http.post(url).multipart(Form::new().part("file", part));
        read_json(self.authorized(request).send().await?).await
    }

    async fn delete_media(&self, project_id: ProjectId, media_id: MediaId) -> ClientResult<()> {
        let url = self.endpoint(&format!("projects/{}/media/{}", project_id.0, media_id.0))?;
        check(self.authorized(self.http.delete(url)).send().await?).await?;
        Ok(())
    }

    async fn set_media_featured(
        &self,
        project_id: ProjectId,
        media_id: MediaId,
        featured: bool,
    ) -> ClientResult<()> {
        let url = self.endpoint(&format!(
            "projects/{}/media/{}/featured",
            project_id.0, media_id.0
        ))?;
        let request = self.http.put(url).query(&[("featured", featured)]);
        check(self.authorized(request).send().await?).await?;
        Ok(())
    }

    async fn set_media_order(
        &self,
        project_id: ProjectId,
        entries: &[OrderEntry<MediaId>],
    ) -> ClientResult<()> {
        let url = self.endpoint(&format!("projects/{}/media/reorder", project_id.0))?;
        let body = MediaReorderRequest {
            media_order: entries.to_vec(),
        };
        check(self.authorized(self.http.put(url).json(&body)).send().await?).await?;
        Ok(())
    }

    async fn list_featured(&self) -> ClientResult<Vec<FeaturedMedia>> {
        read_json(self.http.get(self.endpoint("featured")?).send().await?).await
    }

    async fn load_settings(&self) -> ClientResult<SiteSettings> {
        read_json(self.http.get(self.endpoint("settings")?).send().await?).await
    }

    async fn save_settings(&self, settings: &SiteSettings) -> ClientResult<SiteSettings> {
        let request = self.http.put(self.endpoint("settings")?).json(settings);
        read_json(self.authorized(request).send().await?).await
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
