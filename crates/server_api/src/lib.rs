use std::{collections::HashSet, hash::Hash};

use shared::{
    domain::{FeaturedMedia, MediaId, MediaItem, Project, ProjectId, SiteSettings},
    error::{ApiError, ErrorCode},
    protocol::{OrderEntry, ProjectCreate, ProjectUpdate},
};
use storage::Storage;
use tracing::info;

pub mod uploads;

pub use uploads::{media_kind_for_filename, UploadStore, UPLOAD_URL_PREFIX};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub uploads: UploadStore,
}

pub async fn list_projects(
    ctx: &ApiContext,
    include_unpublished: bool,
) -> Result<Vec<Project>, ApiError> {
    ctx.storage
        .list_projects(include_unpublished)
        .await
        .map_err(internal)
}

/// Public lookup: unpublished projects are reported as missing.
pub async fn get_public_project(ctx: &ApiContext, project_id: ProjectId) -> Result<Project, ApiError> {
    let project = get_project(ctx, project_id).await?;
    if !project.published {
        return Err(project_not_found());
    }
    Ok(project)
}

pub async fn get_project(ctx: &ApiContext, project_id: ProjectId) -> Result<Project, ApiError> {
    ctx.storage
        .load_project(project_id)
        .await
        .map_err(internal)?
        .ok_or_else(project_not_found)
}

pub async fn create_project(ctx: &ApiContext, req: &ProjectCreate) -> Result<Project, ApiError> {
    if req.draft.title.trim().is_empty() {
        return Err(ApiError::validation("project title is required"));
    }
    let project = ctx.storage.create_project(req).await.map_err(internal)?;
    info!(project_id = project.id.0, order = project.order, "project created");
    Ok(project)
}

pub async fn update_project(
    ctx: &ApiContext,
    project_id: ProjectId,
    update: &ProjectUpdate,
) -> Result<Project, ApiError> {
    if update
        .title
        .as_deref()
        .is_some_and(|title| title.trim().is_empty())
    {
        return Err(ApiError::validation("project title must not be empty"));
    }
    ctx.storage
        .update_project(project_id, update)
        .await
        .map_err(internal)?
        .ok_or_else(project_not_found)
}

pub async fn delete_project(ctx: &ApiContext, project_id: ProjectId) -> Result<(), ApiError> {
    let removed = ctx
        .storage
        .delete_project(project_id)
        .await
        .map_err(internal)?
        .ok_or_else(project_not_found)?;
    for media in &removed {
        ctx.uploads.remove(&media.url).await;
    }
    info!(
        project_id = project_id.0,
        removed_media = removed.len(),
        "project deleted"
    );
    Ok(())
}

/// Stores the file and appends it to the project's media collection.
pub async fn upload_media(
    ctx: &ApiContext,
    project_id: ProjectId,
    filename: &str,
    bytes: &[u8],
) -> Result<MediaItem, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::validation("upload body cannot be empty"));
    }
    let (kind, ext) = media_kind_for_filename(filename).ok_or_else(|| {
        ApiError::validation(format!("unsupported file type: {filename}"))
    })?;
    if !ctx
        .storage
        .project_exists(project_id)
        .await
        .map_err(internal)?
    {
        return Err(project_not_found());
    }

    let url = ctx.uploads.save(&ext, bytes).await.map_err(internal)?;
    let appended = ctx
        .storage
        .append_media(project_id, kind, &url, "")
        .await;
    match appended {
        Ok(Some(item)) => {
            info!(
                project_id = project_id.0,
                media_id = item.id.0,
                order = item.order,
                kind = kind.as_str(),
                "media uploaded"
            );
            Ok(item)
        }
        Ok(None) => {
            ctx.uploads.remove(&url).await;
            Err(project_not_found())
        }
        Err(err) => {
            ctx.uploads.remove(&url).await;
            Err(internal(err))
        }
    }
}

pub async fn delete_media(
    ctx: &ApiContext,
    project_id: ProjectId,
    media_id: MediaId,
) -> Result<(), ApiError> {
    let removed = ctx
        .storage
        .delete_media(project_id, media_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("media not found"))?;
    ctx.uploads.remove(&removed.url).await;
    Ok(())
}

pub async fn set_media_featured(
    ctx: &ApiContext,
    project_id: ProjectId,
    media_id: MediaId,
    featured: bool,
) -> Result<(), ApiError> {
    let found = ctx
        .storage
        .set_media_featured(project_id, media_id, featured)
        .await
        .map_err(internal)?;
    if !found {
        return Err(ApiError::not_found("media not found"));
    }
    Ok(())
}

pub async fn set_media_order(
    ctx: &ApiContext,
    project_id: ProjectId,
    entries: &[OrderEntry<MediaId>],
) -> Result<(), ApiError> {
    if !ctx
        .storage
        .project_exists(project_id)
        .await
        .map_err(internal)?
    {
        return Err(project_not_found());
    }
    let existing = ctx.storage.media_ids(project_id).await.map_err(internal)?;
    validate_dense_order(&existing, entries)?;
    ctx.storage
        .set_media_order(project_id, entries)
        .await
        .map_err(internal)?;
    info!(project_id = project_id.0, items = entries.len(), "media reordered");
    Ok(())
}

pub async fn set_project_order(
    ctx: &ApiContext,
    entries: &[OrderEntry<ProjectId>],
) -> Result<(), ApiError> {
    let existing = ctx.storage.project_ids().await.map_err(internal)?;
    validate_dense_order(&existing, entries)?;
    ctx.storage
        .set_project_order(entries)
        .await
        .map_err(internal)?;
    info!(items = entries.len(), "projects reordered");
    Ok(())
}

pub async fn list_featured(ctx: &ApiContext) -> Result<Vec<FeaturedMedia>, ApiError> {
    ctx.storage.list_featured().await.map_err(internal)
}

pub async fn load_settings(ctx: &ApiContext) -> Result<SiteSettings, ApiError> {
    ctx.storage.load_settings().await.map_err(internal)
}

pub async fn save_settings(
    ctx: &ApiContext,
    settings: &SiteSettings,
) -> Result<SiteSettings, ApiError> {
    if settings.brand_name.trim().is_empty() {
        return Err(ApiError::validation("brand name must not be empty"));
    }
    ctx.storage
        .save_settings(settings)
        .await
        .map_err(internal)?;
    Ok(settings.clone())
}

/// A renumbering must name every member of the collection exactly once and
/// assign the orders `0..n-1`.
pub fn validate_dense_order<I>(existing: &[I], entries: &[OrderEntry<I>]) -> Result<(), ApiError>
where
    I: Copy + Eq + Hash,
{
    if entries.len() != existing.len() {
        return Err(ApiError::validation(format!(
            "expected {} order entries, got {}",
            existing.len(),
            entries.len()
        )));
    }
    let known: HashSet<I> = existing.iter().copied().collect();
    let mut seen_ids = HashSet::with_capacity(entries.len());
    let mut seen_orders = vec![false; entries.len()];
    for entry in entries {
        if !known.contains(&entry.id) || !seen_ids.insert(entry.id) {
            return Err(ApiError::validation(
                "order entries must name each item exactly once",
            ));
        }
        let slot = usize::try_from(entry.order)
            .ok()
            .and_then(|order| seen_orders.get_mut(order));
        match slot {
            Some(seen) if !*seen => *seen = true,
            _ => {
                return Err(ApiError::validation(
                    "orders must be a permutation of 0..n-1",
                ))
            }
        }
    }
    Ok(())
}

fn project_not_found() -> ApiError {
    ApiError::not_found("project not found")
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
