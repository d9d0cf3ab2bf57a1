//! Admin editing sessions: the project dashboard and the project editor.

use async_trait::async_trait;
use shared::{
    domain::{MediaId, MediaItem, Project, ProjectId},
    protocol::{OrderEntry, ProjectCreate, ProjectDraft, ProjectUpdate},
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, ClientResult},
    remote::PortfolioRemote,
    reorder::{renumber, Notice, OrderStore, ReorderOutcome, ReorderSync},
};

struct ProjectOrder<'a, R: ?Sized> {
    remote: &'a R,
}

#[async_trait]
impl<'a, R> OrderStore<Project> for ProjectOrder<'a, R>
where
    R: PortfolioRemote + ?Sized,
{
    async fn submit(&self, entries: &[OrderEntry<ProjectId>]) -> ClientResult<()> {
        self.remote.set_project_order(entries).await
    }

    async fn reload(&self) -> ClientResult<Vec<Project>> {
        self.remote.list_projects(true).await
    }
}

struct MediaOrder<'a, R: ?Sized> {
    remote: &'a R,
    project_id: ProjectId,
}

#[async_trait]
impl<'a, R> OrderStore<MediaItem> for MediaOrder<'a, R>
where
    R: PortfolioRemote + ?Sized,
{
    async fn submit(&self, entries: &[OrderEntry<MediaId>]) -> ClientResult<()> {
        self.remote.set_media_order(self.project_id, entries).await
    }

    async fn reload(&self) -> ClientResult<Vec<MediaItem>> {
        Ok(self.remote.get_any_project(self.project_id).await?.media)
    }
}

/// The dashboard list of every project, drafts included.
pub struct ProjectBoard<'r, R: ?Sized> {
    remote: &'r R,
    projects: ReorderSync<Project>,
}

impl<'r, R> ProjectBoard<'r, R>
where
    R: PortfolioRemote + ?Sized,
{
    pub fn new(remote: &'r R) -> Self {
        Self {
            remote,
            projects: ReorderSync::default(),
        }
    }

    pub async fn load(&mut self) -> ClientResult<()> {
        let projects = self.remote.list_projects(true).await?;
        info!(count = projects.len(), "project board loaded");
        self.projects.replace_committed(projects);
        Ok(())
    }

    pub fn projects(&self) -> &[Project] {
        self.projects.visible()
    }

    pub fn sync(&self) -> &ReorderSync<Project> {
        &self.projects
    }

    pub async fn reorder(&mut self, from: usize, to: usize) -> ClientResult<ReorderOutcome> {
        let store = ProjectOrder {
            remote: self.remote,
        };
        self.projects.reorder(from, to, &store).await
    }

    /// Deletes on the server, then reloads the board.
    pub async fn delete(&mut self, project_id: ProjectId) -> ClientResult<()> {
        self.remote.delete_project(project_id).await?;
        info!(project_id = project_id.0, "project deleted");
        self.load().await
    }
}

/// Details-first, media-second editing of one project.
///
/// Media calls are refused locally until the project has been saved once
/// and so has an id.
pub struct ProjectEditor<'r, R: ?Sized> {
    remote: &'r R,
    project_id: Option<ProjectId>,
    draft: ProjectDraft,
    published: bool,
    media: ReorderSync<MediaItem>,
}

impl<'r, R> ProjectEditor<'r, R>
where
    R: PortfolioRemote + ?Sized,
{
    pub fn new_project(remote: &'r R) -> Self {
        Self {
            remote,
            project_id: None,
            draft: ProjectDraft::default(),
            published: true,
            media: ReorderSync::default(),
        }
    }

    pub async fn open(remote: &'r R, project_id: ProjectId) -> ClientResult<Self> {
        let project = remote.get_any_project(project_id).await?;
        let mut editor = Self::new_project(remote);
        editor.adopt(project);
        Ok(editor)
    }

    fn adopt(&mut self, project: Project) {
        self.project_id = Some(project.id);
        self.draft = ProjectDraft {
            title: project.title,
            client: project.client,
            date: project.date,
            location: project.location,
            description: project.description,
            featured: project.featured,
        };
        self.published = project.published;
        self.media.replace_committed(project.media);
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn draft(&self) -> &ProjectDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut ProjectDraft {
        &mut self.draft
    }

    pub fn published(&self) -> bool {
        self.published
    }

    pub fn set_published(&mut self, published: bool) {
        self.published = published;
    }

    pub fn media(&self) -> &[MediaItem] {
        self.media.visible()
    }

    fn require_id(&self, action: &str) -> ClientResult<ProjectId> {
        self.project_id.ok_or_else(|| {
            ClientError::precondition(format!("save the project details before you {action}"))
        })
    }

    /// Creates the project on first save, updates it afterwards.
    pub async fn save_details(&mut self) -> ClientResult<Project> {
        if self.draft.title.trim().is_empty() {
            return Err(ClientError::precondition("project title is required"));
        }
        let project = match self.project_id {
            None => {
                let req = ProjectCreate {
                    draft: self.draft.clone(),
                    published: self.published,
                };
                let project = self.remote.create_project(&req).await?;
                info!(project_id = project.id.0, "project created");
                project
            }
            Some(project_id) => {
                let mut update = ProjectUpdate::from(&self.draft);
                update.published = Some(self.published);
                self.remote.update_project(project_id, &update).await?
            }
        };
        self.adopt(project.clone());
        Ok(project)
    }

    pub async fn reload_media(&mut self) -> ClientResult<()> {
        let project_id = self.require_id("load media")?;
        let project = self.remote.get_any_project(project_id).await?;
        self.media.replace_committed(project.media);
        Ok(())
    }

    /// Uploads one file and appends the stored item.
    pub async fn upload(&mut self, filename: &str, bytes: Vec<u8>) -> ClientResult<MediaItem> {
        let project_id = self.require_id("upload media")?;
        let item = self.remote.upload_media(project_id, filename, bytes).await?;
        info!(project_id = project_id.0, media_id = item.id.0, order = item.order, "media uploaded");
        self.media.apply_local(|items| items.push(item.clone()));
        Ok(item)
    }

    async fn rollback(&mut self, project_id: ProjectId, action: &str, error: ClientError) -> Notice {
        warn!(project_id = project_id.0, %error, "{action} failed; reloading media");
        if let Err(reload_error) = self.reload_media().await {
            warn!(project_id = project_id.0, error = %reload_error, "media reload failed");
        }
        Notice::Failure(format!("Failed to {action}: {error}"))
    }

    /// Removes the item locally at once, keeping orders dense, then on the
    /// server. A server failure restores the server's list.
    pub async fn delete_media(&mut self, media_id: MediaId) -> ClientResult<Notice> {
        let project_id = self.require_id("delete media")?;
        if !self.media().iter().any(|m| m.id == media_id) {
            return Err(ClientError::NotFound(format!("media {}", media_id.0)));
        }
        self.media.apply_local(|items| {
            items.retain(|m| m.id != media_id);
            renumber(items);
        });
        match self.remote.delete_media(project_id, media_id).await {
            Ok(()) => Ok(Notice::Success("Media deleted".into())),
            Err(error) => Ok(self.rollback(project_id, "delete media", error).await),
        }
    }

    /// Flips the featured flag locally, then on the server.
    pub async fn toggle_featured(&mut self, media_id: MediaId) -> ClientResult<Notice> {
        let project_id = self.require_id("feature media")?;
        let featured = !self
            .media()
            .iter()
            .find(|m| m.id == media_id)
            .map(|m| m.featured)
            .ok_or_else(|| ClientError::NotFound(format!("media {}", media_id.0)))?;
        self.media.apply_local(|items| {
            if let Some(item) = items.iter_mut().find(|m| m.id == media_id) {
                item.featured = featured;
            }
        });
        match self
            .remote
            .set_media_featured(project_id, media_id, featured)
            .await
        {
            Ok(()) => Ok(Notice::Success(
                if featured {
                    "Added to featured"
                } else {
                    "Removed from featured"
                }
                .into(),
            )),
            Err(error) => Ok(self.rollback(project_id, "update featured status", error).await),
        }
    }

    pub async fn reorder_media(&mut self, from: usize, to: usize) -> ClientResult<ReorderOutcome> {
        let project_id = self.require_id("reorder media")?;
        let store = MediaOrder {
            remote: self.remote,
            project_id,
        };
        self.media.reorder(from, to, &store).await
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
