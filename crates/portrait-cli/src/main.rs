//! `portrait` command-line front end
//!
//! Turns arguments into a scrape request, runs the session in the
//! background, prints the progress stream and the final summary. Ctrl-C
//! cancels the session cooperatively.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use portrait_core::{
    ClientConfig, EVENT_TARGET, EventLevel, Platform, ProgressEvent, QueryPlanner, ScrapeConfig,
    ScrapeRequest, ScrapeSummary, SessionState, spawn_session,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portrait")]
#[command(version, about = "Find and download profile pictures of a person")]
struct Cli {
    /// Full name of the person
    name: String,

    /// LinkedIn profile URL or slug
    #[arg(long)]
    linkedin: Option<String>,

    /// Twitter/X handle or profile URL
    #[arg(long)]
    twitter: Option<String>,

    /// GitHub username or profile URL
    #[arg(long)]
    github: Option<String>,

    /// Personal website
    #[arg(long)]
    website: Option<String>,

    /// Results page to scan for avatars
    #[arg(long)]
    search_page: Option<String>,

    /// Company or title appended to search queries
    #[arg(long)]
    qualifier: Option<String>,

    /// Maximum number of images (1-100)
    #[arg(short = 'n', long, default_value_t = 10)]
    max_images: u32,

    /// Destination folder
    #[arg(short, long, default_value = "profile_images")]
    out: PathBuf,

    /// Skip the HEAD probe before downloading
    #[arg(long)]
    no_validate: bool,

    /// Pause between sources in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,

    /// Smallest image kept, in bytes
    #[arg(long, default_value_t = 1024)]
    min_bytes: u64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    /// Do not write scraping_results.json
    #[arg(long)]
    no_manifest: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn request(&self) -> ScrapeRequest {
        let identifiers = [
            (Platform::LinkedIn, &self.linkedin),
            (Platform::Twitter, &self.twitter),
            (Platform::GitHub, &self.github),
            (Platform::Website, &self.website),
            (Platform::SearchPage, &self.search_page),
        ];

        let mut request = ScrapeRequest::new(self.name.clone(), self.out.clone())
            .with_max_images(self.max_images)
            .with_validation(!self.no_validate);
        for (platform, identifier) in identifiers {
            if let Some(identifier) = identifier {
                request = request.with_identifier(platform, identifier.clone());
            }
        }
        if let Some(qualifier) = &self.qualifier {
            request = request.with_qualifier(qualifier.clone());
        }
        request
    }

    fn config(&self) -> ScrapeConfig {
        ScrapeConfig::default()
            .with_adapter_delay(Duration::from_millis(self.delay_ms))
            .with_min_image_bytes(self.min_bytes)
            .with_manifest(!self.no_manifest)
            .with_client(ClientConfig {
                timeout_secs: self.timeout,
                ..ClientConfig::default()
            })
    }
}

/// Default log directives; progress events are printed directly, so their
/// tracing mirror stays off
fn default_directives(verbose: bool) -> String {
    let base = if verbose { "warn,portrait=debug,portrait_core=debug" } else { "warn" };
    format!("{},{}=off", base, EVENT_TARGET)
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn render_event(event: &ProgressEvent) -> String {
    let tag = match event.level {
        EventLevel::Info => "INFO",
        EventLevel::Success => " OK ",
        EventLevel::Warning => "WARN",
        EventLevel::Error => "FAIL",
    };
    format!(
        "[{}] {} {}",
        event.timestamp.format("%H:%M:%S"),
        tag,
        event.message
    )
}

fn render_summary(summary: &ScrapeSummary) -> String {
    let status = match summary.final_state {
        SessionState::Cancelled => "cancelled",
        _ => "finished",
    };
    let mut out = format!(
        "{} {}: {} downloaded, {} failed, {} candidates",
        summary.person_name, status, summary.downloaded, summary.failed, summary.candidates
    );
    for file in &summary.files {
        out.push_str(&format!("\n  {} ({} bytes)", file.path.display(), file.byte_size));
    }
    if let Some(manifest) = &summary.manifest {
        out.push_str(&format!("\n  manifest: {}", manifest.display()));
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let planner =
        Arc::new(QueryPlanner::new(cli.config()).context("failed to initialize HTTP client")?);
    let mut session = spawn_session(planner, cli.request());

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current step");
            cancel.cancel();
        }
    });

    while let Some(event) = session.next_event().await {
        println!("{}", render_event(&event));
    }

    let summary = session.wait().await.context("scrape session failed")?;
    println!("{}", render_summary(&summary));
    Ok(())
}
