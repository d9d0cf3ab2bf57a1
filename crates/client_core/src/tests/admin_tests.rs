use super::*;
use anyhow::anyhow;
use chrono::Utc;
use shared::domain::{FeaturedMedia, MediaKind, SiteSettings};
use std::{collections::HashSet, sync::Mutex};

#[derive(Default)]
struct FakeState {
    projects: Vec<Project>,
    next_id: i64,
    calls: Vec<String>,
    failing: HashSet<&'static str>,
}

#[derive(Default)]
struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    fn with_project(title: &str, media: usize) -> (Self, ProjectId) {
        let remote = Self::default();
        let project_id = {
            let mut state = remote.state.lock().expect("lock");
            let project = state.new_project(title, true);
            let id = project.id;
            state.projects.push(project);
            for _ in 0..media {
                state.append_media(id, "seed.jpg");
            }
            id
        };
        (remote, project_id)
    }

    fn fail(&self, operation: &'static str) {
        self.state.lock().expect("lock").failing.insert(operation);
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().expect("lock").calls.clone()
    }

    fn server_media(&self, project_id: ProjectId) -> Vec<MediaItem> {
        let state = self.state.lock().expect("lock");
        state
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| p.media.clone())
            .unwrap_or_default()
    }

    fn enter(&self, operation: &'static str) -> ClientResult<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            return Err(ClientError::Remote(anyhow!("{operation} unavailable")));
        }
        Ok(state)
    }
}

impl FakeState {
    fn new_project(&mut self, title: &str, published: bool) -> Project {
        self.next_id += 1;
        let now = Utc::now();
        Project {
            id: ProjectId(self.next_id),
            title: title.to_string(),
            client: String::new(),
            date: String::new(),
            location: String::new(),
            description: String::new(),
            featured: false,
            published,
            order: self.projects.len() as i64,
            media: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn project_mut(&mut self, project_id: ProjectId) -> ClientResult<&mut Project> {
        self.projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| ClientError::NotFound(format!("project {}", project_id.0)))
    }

    fn append_media(&mut self, project_id: ProjectId, filename: &str) -> MediaItem {
        self.next_id += 1;
        let id = self.next_id;
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .expect("project");
        let item = MediaItem {
            id: MediaId(id),
            kind: MediaKind::Image,
            url: format!("/uploads/{id}_{filename}"),
            alt: String::new(),
            order: project.media.len() as i64,
            featured: false,
        };
        project.media.push(item.clone());
        item
    }
}

#[async_trait]
impl PortfolioRemote for FakeRemote {
    async fn list_projects(&self, include_unpublished: bool) -> ClientResult<Vec<Project>> {
        let state = self.enter("list_projects")?;
        let mut projects: Vec<Project> = state
            .projects
            .iter()
            .filter(|p| include_unpublished || p.published)
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.order);
        Ok(projects)
    }

    async fn get_project(&self, project_id: ProjectId) -> ClientResult<Project> {
        let project = self.get_any_project(project_id).await?;
        if !project.published {
            return Err(ClientError::NotFound(format!("project {}", project_id.0)));
        }
        Ok(project)
    }

    async fn get_any_project(&self, project_id: ProjectId) -> ClientResult<Project> {
        let mut state = self.enter("get_project")?;
        Ok(state.project_mut(project_id)?.clone())
    }

    async fn create_project(&self, req: &ProjectCreate) -> ClientResult<Project> {
        let mut state = self.enter("create_project")?;
        let mut project = state.new_project(&req.draft.title, req.published);
        project.client = req.draft.client.clone();
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: ProjectId,
        req: &ProjectUpdate,
    ) -> ClientResult<Project> {
        let mut state = self.enter("update_project")?;
        let project = state.project_mut(project_id)?;
        if let Some(title) = &req.title {
            project.title = title.clone();
        }
        if let Some(published) = req.published {
            project.published = published;
        }
        Ok(project.clone())
    }

    async fn delete_project(&self, project_id: ProjectId) -> ClientResult<()> {
        let mut state = self.enter("delete_project")?;
        state.projects.retain(|p| p.id != project_id);
        for (position, project) in state.projects.iter_mut().enumerate() {
            project.order = position as i64;
        }
        Ok(())
    }

    async fn set_project_order(&self, entries: &[OrderEntry<ProjectId>]) -> ClientResult<()> {
        let mut state = self.enter("set_project_order")?;
        for entry in entries {
            state.project_mut(entry.id)?.order = entry.order;
        }
        Ok(())
    }

    async fn upload_media(
        &self,
        project_id: ProjectId,
        filename: &str,
        _bytes: Vec<u8>,
    ) -> ClientResult<MediaItem> {
        let mut state = self.enter("upload_media")?;
        state.project_mut(project_id)?;
        Ok(state.append_media(project_id, filename))
    }

    async fn delete_media(&self, project_id: ProjectId, media_id: MediaId) -> ClientResult<()> {
        let mut state = self.enter("delete_media")?;
        let project = state.project_mut(project_id)?;
        project.media.retain(|m| m.id != media_id);
        renumber(&mut project.media);
        Ok(())
    }

    async fn set_media_featured(
        &self,
        project_id: ProjectId,
        media_id: MediaId,
        featured: bool,
    ) -> ClientResult<()> {
        let mut state = self.enter("set_media_featured")?;
        let project = state.project_mut(project_id)?;
        if let Some(item) = project.media.iter_mut().find(|m| m.id == media_id) {
            item.featured = featured;
        }
        Ok(())
    }

    async fn set_media_order(
        &self,
        project_id: ProjectId,
        entries: &[OrderEntry<MediaId>],
    ) -> ClientResult<()> {
        let mut state = self.enter("set_media_order")?;
        let project = state.project_mut(project_id)?;
        for entry in entries {
            if let Some(item) = project.media.iter_mut().find(|m| m.id == entry.id) {
                item.order = entry.order;
            }
        }
        project.media.sort_by_key(|m| m.order);
        Ok(())
    }

    async fn list_featured(&self) -> ClientResult<Vec<FeaturedMedia>> {
        self.enter("list_featured")?;
        Ok(Vec::new())
    }

    async fn load_settings(&self) -> ClientResult<SiteSettings> {
        self.enter("load_settings")?;
        Ok(SiteSettings::default())
    }

    async fn save_settings(&self, settings: &SiteSettings) -> ClientResult<SiteSettings> {
        self.enter("save_settings")?;
        Ok(settings.clone())
    }
}

fn ids(items: &[MediaItem]) -> Vec<i64> {
    items.iter().map(|m| m.id.0).collect()
}

#[tokio::test]
async fn upload_before_first_save_makes_no_network_call() {
    let remote = FakeRemote::default();
    let mut editor = ProjectEditor::new_project(&remote);

    let err = editor
        .upload("photo.jpg", vec![1, 2, 3])
        .await
        .expect_err("no project yet");
    assert!(matches!(err, ClientError::Precondition(_)));
    assert!(editor.media().is_empty());
    assert!(remote.calls().is_empty());

    let err = editor.reorder_media(0, 1).await.expect_err("no project yet");
    assert!(matches!(err, ClientError::Precondition(_)));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn save_details_creates_then_updates() {
    let remote = FakeRemote::default();
    let mut editor = ProjectEditor::new_project(&remote);

    let err = editor.save_details().await.expect_err("title required");
    assert!(matches!(err, ClientError::Precondition(_)));

    editor.draft_mut().title = "Coastline".into();
    editor.set_published(false);
    let created = editor.save_details().await.expect("create");
    assert_eq!(editor.project_id(), Some(created.id));
    assert!(!created.published);

    editor.draft_mut().title = "Coastline II".into();
    editor.set_published(true);
    let updated = editor.save_details().await.expect("update");
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "Coastline II");
    assert!(updated.published);
    assert_eq!(remote.calls(), vec!["create_project", "update_project"]);

    let uploaded = editor.upload("a.jpg", vec![0]).await.expect("upload");
    assert_eq!(uploaded.order, 0);
    assert_eq!(ids(editor.media()), vec![uploaded.id.0]);
}

#[tokio::test]
async fn uploads_append_in_order() {
    let (remote, project_id) = FakeRemote::with_project("Dunes", 2);
    let mut editor = ProjectEditor::open(&remote, project_id).await.expect("open");
    assert_eq!(editor.media().len(), 2);

    let item = editor.upload("c.jpg", vec![1]).await.expect("upload");
    assert_eq!(item.order, 2);
    assert_eq!(editor.media().last().map(|m| m.id), Some(item.id));
    assert_eq!(ids(editor.media()), ids(&remote.server_media(project_id)));
}

#[tokio::test]
async fn media_reorder_failure_reverts_to_server_order() {
    let (remote, project_id) = FakeRemote::with_project("Forest", 4);
    let mut editor = ProjectEditor::open(&remote, project_id).await.expect("open");
    let before = ids(editor.media());

    remote.fail("set_media_order");
    let outcome = editor.reorder_media(0, 2).await.expect("reorder");
    assert!(matches!(outcome, ReorderOutcome::RolledBack { reloaded: true, .. }));
    assert_eq!(ids(editor.media()), before);
}

#[tokio::test]
async fn media_reorder_success_is_persisted_without_refetch() {
    let (remote, project_id) = FakeRemote::with_project("Forest", 4);
    let mut editor = ProjectEditor::open(&remote, project_id).await.expect("open");
    let before = ids(editor.media());

    let outcome = editor.reorder_media(0, 2).await.expect("reorder");
    assert_eq!(outcome, ReorderOutcome::Saved);
    let expected = vec![before[1], before[2], before[0], before[3]];
    assert_eq!(ids(editor.media()), expected);
    assert_eq!(ids(&remote.server_media(project_id)), expected);
    assert_eq!(
        remote.calls(),
        vec!["get_project", "set_media_order"],
        "success must not trigger a reload"
    );
}

#[tokio::test]
async fn delete_media_is_optimistic_and_keeps_orders_dense() {
    let (remote, project_id) = FakeRemote::with_project("Harbor", 3);
    let mut editor = ProjectEditor::open(&remote, project_id).await.expect("open");
    let victim = editor.media()[0].id;

    let notice = editor.delete_media(victim).await.expect("delete");
    assert_eq!(notice, Notice::Success("Media deleted".into()));
    assert_eq!(editor.media().len(), 2);
    assert_eq!(
        editor.media().iter().map(|m| m.order).collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert_eq!(editor.media(), remote.server_media(project_id).as_slice());

    let err = editor.delete_media(victim).await.expect_err("gone");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn failed_delete_restores_the_item() {
    let (remote, project_id) = FakeRemote::with_project("Harbor", 2);
    let mut editor = ProjectEditor::open(&remote, project_id).await.expect("open");
    let before = ids(editor.media());

    remote.fail("delete_media");
    let notice = editor.delete_media(MediaId(before[1])).await.expect("delete");
    assert!(matches!(notice, Notice::Failure(_)));
    assert_eq!(ids(editor.media()), before);
}

#[tokio::test]
async fn toggle_featured_flips_and_rolls_back() {
    let (remote, project_id) = FakeRemote::with_project("Reel", 1);
    let mut editor = ProjectEditor::open(&remote, project_id).await.expect("open");
    let media_id = editor.media()[0].id;

    let notice = editor.toggle_featured(media_id).await.expect("toggle");
    assert_eq!(notice, Notice::Success("Added to featured".into()));
    assert!(editor.media()[0].featured);
    assert!(remote.server_media(project_id)[0].featured);

    remote.fail("set_media_featured");
    let notice = editor.toggle_featured(media_id).await.expect("toggle");
    assert!(matches!(notice, Notice::Failure(_)));
    assert!(editor.media()[0].featured);
}

#[tokio::test]
async fn board_reorders_and_deletes_projects() {
    let remote = FakeRemote::default();
    {
        let mut state = remote.state.lock().expect("lock");
        for title in ["a", "b", "c", "d"] {
            let project = state.new_project(title, title != "c");
            state.projects.push(project);
        }
    }
    let mut board = ProjectBoard::new(&remote);
    board.load().await.expect("load");
    let titles = |board: &ProjectBoard<'_, FakeRemote>| {
        board
            .projects()
            .iter()
            .map(|p| p.title.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(titles(&board), vec!["a", "b", "c", "d"]);

    let outcome = board.reorder(0, 2).await.expect("reorder");
    assert_eq!(outcome, ReorderOutcome::Saved);
    assert_eq!(titles(&board), vec!["b", "c", "a", "d"]);
    assert_eq!(
        board.projects().iter().map(|p| p.order).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );

    remote.fail("set_project_order");
    let outcome = board.reorder(3, 0).await.expect("reorder");
    assert!(matches!(outcome.notice(), Notice::Failure(_)));
    assert_eq!(titles(&board), vec!["b", "c", "a", "d"]);

    let doomed = board.projects()[0].id;
    board.delete(doomed).await.expect("delete");
    assert_eq!(titles(&board), vec!["c", "a", "d"]);
}
