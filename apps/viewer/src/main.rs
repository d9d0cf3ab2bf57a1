use anyhow::Result;
use clap::Parser;
use client_core::{
    ClientError, Gallery, GalleryItem, HttpDimensionProbe, HttpPortfolioClient, ListIdentity,
    PortfolioRemote, Slide,
};
use shared::domain::{FeaturedMedia, MediaItem, ProjectId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Steps through a project's media, or the featured reel, from the terminal.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8001")]
    server_url: String,
    /// Project to open; the featured reel when omitted.
    #[arg(long)]
    project: Option<i64>,
    /// Viewport width used to pick the device class.
    #[arg(long, default_value_t = 1440)]
    width: u32,
}

enum Command {
    Next,
    Prev,
    Goto(usize),
    Reload,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "n" | "next" | "right" => Some(Command::Next),
        "p" | "prev" | "left" => Some(Command::Prev),
        "g" | "goto" => parts
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .map(|n| Command::Goto(n.saturating_sub(1))),
        "r" | "reload" => Some(Command::Reload),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

fn describe(item: &MediaItem) -> String {
    let kind = if item.is_video() { "video" } else { "image" };
    format!("[{kind} #{}] {}", item.id.0, item.url)
}

fn render<T: GalleryItem>(gallery: &Gallery<T>, caption: impl Fn(&T) -> Option<String>) {
    let Some(slide) = gallery.current_slide() else {
        println!("(no media)");
        return;
    };
    let (position, total) = gallery.counter().unwrap_or((0, 0));
    match slide {
        Slide::Single { item, .. } => {
            println!("{position} / {total}  {}", describe(item.media()));
            if let Some(caption) = caption(item) {
                println!("    {caption}");
            }
        }
        Slide::Pair { first, second, .. } => {
            println!(
                "{position} / {total}  {}  |  {}",
                describe(first.media()),
                describe(second.media())
            );
        }
    }
}

async fn load_project(
    client: &HttpPortfolioClient,
    project_id: ProjectId,
) -> Result<Option<Vec<MediaItem>>> {
    match client.get_project(project_id).await {
        Ok(project) => {
            println!("{}  {} / {} / {}", project.title, project.client, project.date, project.location);
            Ok(Some(project.media))
        }
        Err(ClientError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn run<T: GalleryItem>(
    mut gallery: Gallery<T>,
    identity: ListIdentity,
    probe: &HttpDimensionProbe,
    source: impl ListSource<T>,
    caption: impl Fn(&T) -> Option<String>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let classified = gallery.classify_pending(probe).await;
        if classified > 0 {
            info!(classified, "orientations resolved");
        }
        render(&gallery, &caption);

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match parse_command(&line) {
            Some(Command::Next) => gallery.advance(),
            Some(Command::Prev) => gallery.retreat(),
            Some(Command::Goto(index)) => gallery.goto(index),
            Some(Command::Reload) => {
                let items = source.fetch().await?;
                gallery.set_list(identity.clone(), &items);
            }
            Some(Command::Quit) => return Ok(()),
            None => println!("commands: n(ext), p(rev), g(oto) N, r(eload), q(uit)"),
        }
    }
}

trait ListSource<T> {
    async fn fetch(&self) -> Result<Vec<T>>;
}

struct ProjectSource<'a> {
    client: &'a HttpPortfolioClient,
    project_id: ProjectId,
}

impl ListSource<MediaItem> for ProjectSource<'_> {
    async fn fetch(&self) -> Result<Vec<MediaItem>> {
        Ok(load_project(self.client, self.project_id)
            .await?
            .unwrap_or_default())
    }
}

struct FeaturedSource<'a> {
    client: &'a HttpPortfolioClient,
}

impl ListSource<FeaturedMedia> for FeaturedSource<'_> {
    async fn fetch(&self) -> Result<Vec<FeaturedMedia>> {
        Ok(self.client.list_featured().await?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let args = Args::parse();

    let client = HttpPortfolioClient::new(&args.server_url)?;
    let probe = HttpDimensionProbe::new(client.base_url().clone());
    if let Err(error) = client.health().await {
        warn!(%error, server_url = %args.server_url, "health check failed");
    }

    match args.project {
        Some(id) => {
            let project_id = ProjectId(id);
            let mut gallery = Gallery::<MediaItem>::default();
            gallery.set_viewport_width(args.width);
            let source = ProjectSource {
                client: &client,
                project_id,
            };
            let Some(media) = load_project(&client, project_id).await? else {
                println!("project {id} not found");
                return Ok(());
            };
            let identity = ListIdentity::Project(project_id);
            gallery.set_list(identity.clone(), &media);
            run(gallery, identity, &probe, source, |item: &MediaItem| {
                (!item.alt.is_empty()).then(|| item.alt.clone())
            })
            .await
        }
        None => {
            let mut gallery = Gallery::<FeaturedMedia>::default();
            gallery.set_viewport_width(args.width);
            let source = FeaturedSource { client: &client };
            let identity = ListIdentity::FeaturedReel;
            gallery.set_list(identity.clone(), &source.fetch().await?);
            run(gallery, identity, &probe, source, |item: &FeaturedMedia| {
                Some(item.project_title.clone())
            })
            .await
        }
    }
}
