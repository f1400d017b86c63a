use std::path::PathBuf;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use folio_common::config::FolioConfig;
use folio_common::post::Post;
use folio_common::schema;
use folio_common::store::{JsonFilePostStore, PostStore};
use folio_common::telemetry::{self, TelemetryConfig};
use folio_common::{extract_title, lifecycle};
use folio_renderer::{prefetch_embeds, render_static};
use miette::{IntoDiagnostic, Result};

#[derive(Parser)]
#[command(version, about = "Folio - write, check and render blog posts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Post directory (overrides FOLIO_POSTS_DIR)
    #[arg(long, global = true)]
    posts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a post to HTML
    Render {
        /// Post id or slug
        post: String,

        /// Wrap the body in a complete HTML page titled after the post
        #[arg(long)]
        page: bool,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print a post's title
    Title {
        /// Post id or slug
        post: String,
    },
    /// List posts, newest first
    List {
        /// Include drafts
        #[arg(short, long)]
        all: bool,
    },
    /// Create an empty draft, or show the existing one
    New {
        /// Post id, also used as the initial slug
        id: String,
    },
    /// Fix posts whose document does not start with a title heading
    Repair {
        /// Only report what would change
        #[arg(long)]
        dry_run: bool,
    },
    /// Publish a post
    Publish {
        /// Post id or slug
        post: String,
    },
    /// Turn a published post back into a draft
    Unpublish {
        /// Post id or slug
        post: String,
    },
    /// Change a post's slug
    Slug {
        /// Post id or slug
        post: String,

        /// The new slug
        slug: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    dotenvy::dotenv().ok();
    telemetry::init(TelemetryConfig::from_env("folio-cli"));

    let cli = Cli::parse();
    let mut config = FolioConfig::from_env()?;
    if let Some(dir) = cli.posts_dir {
        config.posts_dir = dir;
    }
    let store = JsonFilePostStore::new(config.posts_dir.clone());

    match cli.command {
        Commands::Render { post, page, out } => {
            let post = find_post(&store, &post).await?;
            let fetcher = folio_resolve::embed_fetcher(&config);
            let embeds = prefetch_embeds(&post.content, &fetcher).await;
            tracing::debug!(id = %post.id, embeds = embeds.len(), "prefetched embeds");
            let body = render_static(&post.content, &embeds);
            let html = if page {
                standalone_page(&extract_title(&post.content), &body)
            } else {
                body
            };
            match out {
                Some(path) => {
                    tokio::fs::write(&path, html).await.into_diagnostic()?;
                    println!("✓ Rendered {} to {}", post.id, path.display());
                }
                None => print!("{html}"),
            }
        }
        Commands::Title { post } => {
            let post = find_post(&store, &post).await?;
            println!("{}", post.title());
        }
        Commands::List { all } => {
            let posts = lifecycle::listing(&store, all).await?;
            if posts.is_empty() {
                println!("No posts in {}", config.posts_dir.display());
            }
            for post in &posts {
                println!("{}", listing_line(post));
            }
        }
        Commands::New { id } => {
            let post = lifecycle::open_or_create(&store, &id).await?;
            let path = config.posts_dir.join(format!("{}.json", post.id));
            println!("✓ Draft {} at {}", post.id, path.display());
        }
        Commands::Repair { dry_run } => {
            repair_all(&store, dry_run).await?;
        }
        Commands::Publish { post } => {
            let post = find_post(&store, &post).await?;
            let post = lifecycle::publish(&store, &post.id).await?;
            println!("✓ Published {} as /{}", post.id, post.slug);
        }
        Commands::Unpublish { post } => {
            let post = find_post(&store, &post).await?;
            let post = lifecycle::unpublish(&store, &post.id).await?;
            println!("✓ {} is a draft again", post.id);
        }
        Commands::Slug { post, slug } => {
            let post = find_post(&store, &post).await?;
            let post = lifecycle::change_slug(&store, &post.id, &slug).await?;
            println!("✓ {} is now at /{}", post.id, post.slug);
        }
    }

    Ok(())
}

/// Look a post up by id first, then by slug.
async fn find_post(store: &JsonFilePostStore, key: &str) -> Result<Post> {
    if let Some(post) = store.get(key).await? {
        return Ok(post);
    }
    match store.get_by_slug(key).await? {
        Some(post) => {
            tracing::debug!(slug = key, id = %post.id, "found post by slug");
            Ok(post)
        }
        None => Err(miette::miette!(
            help = "run `folio list --all` to see every post",
            "no post with id or slug `{key}`"
        )),
    }
}

async fn repair_all(store: &JsonFilePostStore, dry_run: bool) -> Result<()> {
    let mut fixed = 0;
    for post in store.list_all().await? {
        let mut content = post.content.clone();
        let Some(violation) = schema::repair(&mut content) else {
            continue;
        };
        fixed += 1;
        if dry_run {
            println!("{}: {violation:?}", post.id);
            continue;
        }
        lifecycle::save_content(store, &post.id, content).await?;
        println!("✓ Repaired {} ({violation:?})", post.id);
    }

    if fixed == 0 {
        println!("All posts start with a title");
    } else if dry_run {
        println!("{fixed} post(s) need repair");
    }
    Ok(())
}

fn listing_line(post: &Post) -> String {
    let date = match post.metadata.published_at {
        Some(at) => DateTime::from_timestamp(at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        None => "draft".to_string(),
    };
    let title = post.title();
    let title = if title.is_empty() { "(untitled)" } else { &title };
    format!("{date:<10}  {:<24}  {title}", post.slug)
}

fn standalone_page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<article>\n{body}</article>\n</body>\n</html>\n",
        html_escape::encode_text(title)
    )
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
