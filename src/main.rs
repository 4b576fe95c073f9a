use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use glob::glob;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blinko_clipper::config::Config;
use blinko_clipper::extractor::is_post_container;
use blinko_clipper::{
    extract_post, format_note, BackgroundWorker, BlinkoClient, ClipError, ContentScript, Document,
    FileSettingsStore, PostExtractor, SettingsForm, SettingsStore,
};

#[derive(Parser)]
#[command(name = "blinko-clipper")]
#[command(about = "Clip posts from saved pages into Blinko notes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the Blinko base URL and access token
    Configure {
        #[arg(long)]
        base_url: String,
        #[arg(long)]
        token: String,
    },

    /// Show the stored Blinko settings
    Settings,

    /// Preview the notes for every post in pages matching a glob pattern
    Scan {
        pattern: String,

        /// URL the pages were loaded from
        #[arg(long)]
        url: Option<String>,
    },

    /// Save posts from a page to Blinko
    Save {
        file: PathBuf,

        /// URL the page was loaded from
        #[arg(long)]
        url: Option<String>,

        /// 1-based post number (defaults to the first post)
        #[arg(long, conflicts_with = "all")]
        post: Option<usize>,

        /// Save every post on the page
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let store = Arc::new(FileSettingsStore::new(&config.settings_path));

    match cli.command {
        Commands::Configure { base_url, token } => {
            let mut form = SettingsForm::load(&*store)?;
            form.base_url = base_url;
            form.token = token;
            let now = Instant::now();
            let saved = form.save(&*store, now)?;
            if let Some(status) = form.status(now) {
                println!("{}", status.text);
            }
            if !saved {
                bail!("settings were not saved");
            }
        }
        Commands::Settings => {
            let settings = store.get()?;
            println!("settings file: {}", store.path().display());
            println!("base URL:      {}", or_unset(&settings.base_url));
            println!("token:         {}", or_unset(&mask(&settings.token)));
        }
        Commands::Scan { pattern, url } => {
            let page_url = url.unwrap_or_else(|| config.default_page_url.clone());
            let mut pages = 0;
            for entry in glob(&pattern).context("Invalid glob pattern")? {
                match entry {
                    Ok(path) => {
                        scan_file(&path, &page_url)?;
                        pages += 1;
                    }
                    Err(e) => warn!(error = %e, "Unreadable glob entry"),
                }
            }
            info!(pages, "Scan finished");
        }
        Commands::Save {
            file,
            url,
            post,
            all,
        } => {
            let page_url = url.unwrap_or_else(|| config.default_page_url.clone());
            let doc = load_page(&file, &page_url)?;

            let client = BlinkoClient::new(config.note_type)?;
            let sender = BackgroundWorker::spawn(client);
            let script = ContentScript::start(
                doc,
                PostExtractor::new(config.icon_url.clone()),
                store.clone(),
                sender,
            );

            let triggers = script.triggers();
            if triggers.is_empty() {
                bail!("no posts with a save control found in {}", file.display());
            }
            let selected = if all {
                triggers
            } else {
                let index = post.unwrap_or(1);
                match index.checked_sub(1).and_then(|i| triggers.get(i)) {
                    Some(trigger) => vec![trigger.clone()],
                    None => bail!("post {} not found; page has {} posts", index, triggers.len()),
                }
            };

            let mut failures = 0;
            for trigger in &selected {
                // A toast from an earlier post hides once its deadline has passed
                script.tick(Instant::now());
                match script.click(trigger).await {
                    Ok(result) => {
                        if !result.success {
                            failures += 1;
                        }
                        if let Some(text) = script.toast().text() {
                            println!("{text}");
                        }
                    }
                    Err(ClipError::MissingSettings) => {
                        for alert in script.alerts() {
                            eprintln!("{alert}");
                        }
                        bail!("run `blinko-clipper configure` first");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            if failures > 0 {
                bail!("{} of {} posts failed to save", failures, selected.len());
            }
        }
    }

    Ok(())
}

fn load_page(file_path: &Path, page_url: &str) -> Result<Document> {
    let html = fs::read_to_string(file_path)
        .with_context(|| format!("couldn't open {}", file_path.display()))?;
    Ok(Document::parse(&html, page_url))
}

fn scan_file(file_path: &Path, page_url: &str) -> Result<()> {
    info!(file = %file_path.display(), "Processing page");
    let doc = load_page(file_path, page_url)?;

    let now = Utc::now();
    let posts = doc.query_all(is_post_container);
    println!("{}: {} posts", file_path.display(), posts.len());
    for (index, post) in posts.iter().enumerate() {
        let record = extract_post(post, page_url, now);
        println!("\n--- post {} ---\n{}", index + 1, format_note(&record));
    }
    Ok(())
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "*".repeat(token.chars().count())
    } else {
        format!("{visible}…")
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blinko_clipper=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    // Logs go to stderr so note previews on stdout stay clean
    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
