use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{
        AdminId, FeaturedMedia, MediaId, MediaItem, MediaKind, Project, ProjectId, SiteSettings,
    },
    protocol::{OrderEntry, ProjectCreate, ProjectUpdate},
};

const PROJECT_COLUMNS: &str = "id, title, client, date, location, description, featured, published, sort_order, created_at, updated_at";
const MEDIA_COLUMNS: &str = "id, project_id, kind, url, alt_text, sort_order, featured";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredAdmin {
    pub admin_id: AdminId,
    pub username: String,
    pub password_hash: String,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn admin_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts the admin only while the table is empty, in a single
    /// statement. `None` when an admin already exists.
    pub async fn create_first_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<AdminId>> {
        let rec = sqlx::query(
            "INSERT INTO admins (username, password_hash) \
             SELECT ?, ? WHERE NOT EXISTS (SELECT 1 FROM admins) RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to create admin '{username}'"))?;
        Ok(rec.map(|r| AdminId(r.get::<i64, _>(0))))
    }

    pub async fn find_admin(&self, username: &str) -> Result<Option<StoredAdmin>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM admins WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| StoredAdmin {
            admin_id: AdminId(r.get::<i64, _>(0)),
            username: r.get::<String, _>(1),
            password_hash: r.get::<String, _>(2),
        }))
    }

    pub async fn create_project(&self, req: &ProjectCreate) -> Result<Project> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let next_order: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&mut *tx)
            .await?;
        let rec = sqlx::query(
            "INSERT INTO projects (title, client, date, location, description, featured, published, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&req.draft.title)
        .bind(&req.draft.client)
        .bind(&req.draft.date)
        .bind(&req.draft.location)
        .bind(&req.draft.description)
        .bind(req.draft.featured)
        .bind(req.published)
        .bind(next_order)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert project")?;
        tx.commit().await?;

        Ok(Project {
            id: ProjectId(rec.get::<i64, _>(0)),
            title: req.draft.title.clone(),
            client: req.draft.client.clone(),
            date: req.draft.date.clone(),
            location: req.draft.location.clone(),
            description: req.draft.description.clone(),
            featured: req.draft.featured,
            published: req.published,
            order: next_order,
            media: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn update_project(
        &self,
        project_id: ProjectId,
        update: &ProjectUpdate,
    ) -> Result<Option<Project>> {
        let result = sqlx::query(
            "UPDATE projects SET
                title = COALESCE(?, title),
                client = COALESCE(?, client),
                date = COALESCE(?, date),
                location = COALESCE(?, location),
                description = COALESCE(?, description),
                featured = COALESCE(?, featured),
                published = COALESCE(?, published),
                updated_at = ?
             WHERE id = ?",
        )
        .bind(update.title.as_deref())
        .bind(update.client.as_deref())
        .bind(update.date.as_deref())
        .bind(update.location.as_deref())
        .bind(update.description.as_deref())
        .bind(update.featured)
        .bind(update.published)
        .bind(Utc::now())
        .bind(project_id.0)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.load_project(project_id).await
    }

    /// Removes the project and its media, returning the removed media so the
    /// caller can release the uploaded files. Remaining projects are renumbered.
    pub async fn delete_project(&self, project_id: ProjectId) -> Result<Option<Vec<MediaItem>>> {
        let mut tx = self.pool.begin().await?;
        let media_rows = sqlx::query(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE project_id = ? ORDER BY sort_order ASC, id ASC"
        ))
        .bind(project_id.0)
        .fetch_all(&mut *tx)
        .await?;
        let removed = media_rows
            .iter()
            .map(media_from_row)
            .collect::<Result<Vec<_>>>()?;

        sqlx::query("DELETE FROM media WHERE project_id = ?")
            .bind(project_id.0)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let remaining: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM projects ORDER BY sort_order ASC, id ASC")
                .fetch_all(&mut *tx)
                .await?;
        for (order, id) in remaining.into_iter().enumerate() {
            sqlx::query("UPDATE projects SET sort_order = ? WHERE id = ?")
                .bind(order as i64)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(Some(removed))
    }

    pub async fn load_project(&self, project_id: ProjectId) -> Result<Option<Project>> {
        let row = sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
            .bind(project_id.0)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut project = project_from_row(&row)?;
        project.media = self.list_media(project_id).await?;
        Ok(Some(project))
    }

    pub async fn project_exists(&self, project_id: ProjectId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM projects WHERE id = ?")
            .bind(project_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn list_projects(&self, include_unpublished: bool) -> Result<Vec<Project>> {
        let sql = if include_unpublished {
            format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY sort_order ASC, id ASC")
        } else {
            format!(
                "SELECT {PROJECT_COLUMNS} FROM projects WHERE published = 1 ORDER BY sort_order ASC, id ASC"
            )
        };
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut projects = rows
            .iter()
            .map(project_from_row)
            .collect::<Result<Vec<_>>>()?;

        let media_rows = sqlx::query(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media ORDER BY project_id ASC, sort_order ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        let mut by_project: HashMap<i64, Vec<MediaItem>> = HashMap::new();
        for row in &media_rows {
            let project_id = row.get::<i64, _>(1);
            by_project
                .entry(project_id)
                .or_default()
                .push(media_from_row(row)?);
        }
        for project in &mut projects {
            project.media = by_project.remove(&project.id.0).unwrap_or_default();
        }
        Ok(projects)
    }

    pub async fn list_media(&self, project_id: ProjectId) -> Result<Vec<MediaItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE project_id = ? ORDER BY sort_order ASC, id ASC"
        ))
        .bind(project_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(media_from_row).collect()
    }

    /// Appends a media item at `order = count` of the project's collection.
    pub async fn append_media(
        &self,
        project_id: ProjectId,
        kind: MediaKind,
        url: &str,
        alt: &str,
    ) -> Result<Option<MediaItem>> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM projects WHERE id = ?")
            .bind(project_id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }
        let next_order: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media WHERE project_id = ?")
            .bind(project_id.0)
            .fetch_one(&mut *tx)
            .await?;
        let rec = sqlx::query(
            "INSERT INTO media (project_id, kind, url, alt_text, sort_order, featured, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)
             RETURNING id",
        )
        .bind(project_id.0)
        .bind(kind.as_str())
        .bind(url)
        .bind(alt)
        .bind(next_order)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert media")?;
        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(project_id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(MediaItem {
            id: MediaId(rec.get::<i64, _>(0)),
            kind,
            url: url.to_string(),
            alt: alt.to_string(),
            order: next_order,
            featured: false,
        }))
    }

    /// Deletes one media item and closes the gap it leaves in the order
    /// sequence so the remaining items stay a permutation of `0..n-1`.
    pub async fn delete_media(
        &self,
        project_id: ProjectId,
        media_id: MediaId,
    ) -> Result<Option<MediaItem>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE id = ? AND project_id = ?"
        ))
        .bind(media_id.0)
        .bind(project_id.0)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let removed = media_from_row(&row)?;

        sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(media_id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE media SET sort_order = sort_order - 1 WHERE project_id = ? AND sort_order > ?",
        )
        .bind(project_id.0)
        .bind(removed.order)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(removed))
    }

    pub async fn set_media_featured(
        &self,
        project_id: ProjectId,
        media_id: MediaId,
        featured: bool,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE media SET featured = ? WHERE id = ? AND project_id = ?")
            .bind(featured)
            .bind(media_id.0)
            .bind(project_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Applies a full renumbering atomically. Callers validate that `entries`
    /// covers the collection exactly; any unknown id aborts the transaction.
    pub async fn set_media_order(
        &self,
        project_id: ProjectId,
        entries: &[OrderEntry<MediaId>],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            let result =
                sqlx::query("UPDATE media SET sort_order = ? WHERE id = ? AND project_id = ?")
                    .bind(entry.order)
                    .bind(entry.id.0)
                    .bind(project_id.0)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() != 1 {
                bail!(
                    "media {} does not belong to project {}",
                    entry.id.0,
                    project_id.0
                );
            }
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_project_order(&self, entries: &[OrderEntry<ProjectId>]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            let result = sqlx::query("UPDATE projects SET sort_order = ? WHERE id = ?")
                .bind(entry.order)
                .bind(entry.id.0)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() != 1 {
                bail!("project {} not found", entry.id.0);
            }
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn media_ids(&self, project_id: ProjectId) -> Result<Vec<MediaId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM media WHERE project_id = ?")
            .bind(project_id.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(MediaId).collect())
    }

    pub async fn project_ids(&self) -> Result<Vec<ProjectId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM projects")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(ProjectId).collect())
    }

    /// Items of published projects that are featured themselves or belong to a
    /// featured project, in project order then media order.
    pub async fn list_featured(&self) -> Result<Vec<FeaturedMedia>> {
        let rows = sqlx::query(
            "SELECT m.id, m.project_id, m.kind, m.url, m.alt_text, m.sort_order, m.featured, p.title
             FROM media m
             INNER JOIN projects p ON p.id = m.project_id
             WHERE p.published = 1 AND (p.featured = 1 OR m.featured = 1)
             ORDER BY p.sort_order ASC, p.id ASC, m.sort_order ASC, m.id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| -> Result<FeaturedMedia> {
                Ok(FeaturedMedia {
                    project_id: ProjectId(r.get::<i64, _>(1)),
                    project_title: r.get::<String, _>(7),
                    media: media_from_row(r)?,
                })
            })
            .collect()
    }

    pub async fn load_settings(&self) -> Result<SiteSettings> {
        let row = sqlx::query(
            "SELECT brand_name, logo_url, about_title, about_content, contact_email, contact_phone, instagram_url, clients_list
             FROM site_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|r| SiteSettings {
                brand_name: r.get::<String, _>(0),
                logo_url: r.get::<String, _>(1),
                about_title: r.get::<String, _>(2),
                about_content: r.get::<String, _>(3),
                contact_email: r.get::<String, _>(4),
                contact_phone: r.get::<String, _>(5),
                instagram_url: r.get::<String, _>(6),
                clients_list: r.get::<String, _>(7),
            })
            .unwrap_or_default())
    }

    pub async fn save_settings(&self, settings: &SiteSettings) -> Result<()> {
        sqlx::query(
            "INSERT INTO site_settings (id, brand_name, logo_url, about_title, about_content, contact_email, contact_phone, instagram_url, clients_list, updated_at)
             VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                brand_name=excluded.brand_name,
                logo_url=excluded.logo_url,
                about_title=excluded.about_title,
                about_content=excluded.about_content,
                contact_email=excluded.contact_email,
                contact_phone=excluded.contact_phone,
                instagram_url=excluded.instagram_url,
                clients_list=excluded.clients_list,
                updated_at=excluded.updated_at",
        )
        .bind(&settings.brand_name)
        .bind(&settings.logo_url)
        .bind(&settings.about_title)
        .bind(&settings.about_content)
        .bind(&settings.contact_email)
        .bind(&settings.contact_phone)
        .bind(&settings.instagram_url)
        .bind(&settings.clients_list)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed to save site settings")?;
        Ok(())
    }
}

fn project_from_row(r: &SqliteRow) -> Result<Project> {
    Ok(Project {
        id: ProjectId(r.try_get::<i64, _>(0)?),
        title: r.try_get::<String, _>(1)?,
        client: r.try_get::<String, _>(2)?,
        date: r.try_get::<String, _>(3)?,
        location: r.try_get::<String, _>(4)?,
        description: r.try_get::<String, _>(5)?,
        featured: r.try_get::<bool, _>(6)?,
        published: r.try_get::<bool, _>(7)?,
        order: r.try_get::<i64, _>(8)?,
        media: Vec::new(),
        created_at: r.try_get::<DateTime<Utc>, _>(9)?,
        updated_at: r.try_get::<DateTime<Utc>, _>(10)?,
    })
}

fn media_from_row(r: &SqliteRow) -> Result<MediaItem> {
    let raw_kind = r.try_get::<String, _>(2)?;
    let Some(kind) = MediaKind::parse(&raw_kind) else {
        bail!("unknown media kind '{raw_kind}'");
    };
    Ok(MediaItem {
        id: MediaId(r.try_get::<i64, _>(0)?),
        kind,
        url: r.try_get::<String, _>(3)?,
        alt: r.try_get::<String, _>(4)?,
        order: r.try_get::<i64, _>(5)?,
        featured: r.try_get::<bool, _>(6)?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
