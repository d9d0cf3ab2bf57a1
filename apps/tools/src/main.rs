use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::ProjectId,
    protocol::{ProjectCreate, ProjectDraft, ProjectUpdate},
};
use storage::Storage;

/// Operator commands against the portfolio database.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/portfolio.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists every project, drafts included, in display order.
    ListProjects,
    CreateProject {
        title: String,
        #[arg(long, default_value = "")]
        client: String,
        #[arg(long, default_value = "")]
        date: String,
        #[arg(long)]
        draft: bool,
    },
    Publish {
        project_id: i64,
    },
    Unpublish {
        project_id: i64,
    },
    /// Prints the homepage reel in display order.
    ListFeatured,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::ListProjects => {
            for project in storage.list_projects(true).await? {
                println!(
                    "{:>3}  #{:<4} {:<6} {} ({} media)",
                    project.order,
                    project.id.0,
                    if project.published { "" } else { "DRAFT" },
                    project.title,
                    project.media.len()
                );
            }
        }
        Command::CreateProject {
            title,
            client,
            date,
            draft,
        } => {
            let project = storage
                .create_project(&ProjectCreate {
                    draft: ProjectDraft {
                        title,
                        client,
                        date,
                        ..ProjectDraft::default()
                    },
                    published: !draft,
                })
                .await?;
            println!("created project_id={} order={}", project.id.0, project.order);
        }
        Command::Publish { project_id } => set_published(&storage, project_id, true).await?,
        Command::Unpublish { project_id } => set_published(&storage, project_id, false).await?,
        Command::ListFeatured => {
            for entry in storage.list_featured().await? {
                println!(
                    "{:<24} #{:<4} {}",
                    entry.project_title, entry.media.id.0, entry.media.url
                );
            }
        }
    }

    Ok(())
}

async fn set_published(storage: &Storage, project_id: i64, published: bool) -> Result<()> {
    let update = ProjectUpdate {
        published: Some(published),
        ..ProjectUpdate::default()
    };
    if storage
        .update_project(ProjectId(project_id), &update)
        .await?
        .is_none()
    {
        bail!("project {project_id} not found");
    }
    println!("project_id={project_id} published={published}");
    Ok(())
}
