use std::path::PathBuf;

use clap::Parser;
use miette::Result;

use kestrel_core::KestrelConfig;
use kestrel_diff::filter::ExclusionFilter;
use kestrel_diff::parser::parse_unified_diff;
use kestrel_review::event::{EventKind, WebhookEvent};
use kestrel_review::github::GitHubClient;
use kestrel_review::llm::LlmClient;
use kestrel_review::pipeline::ReviewPipeline;

#[derive(Parser)]
#[command(
    name = "kestrel",
    version,
    about = "AI pull-request reviewer",
    long_about = "Kestrel reviews GitHub pull requests with a language model.\n\n\
                   Designed to run inside a GitHub Actions workflow: it reads the\n\
                   triggering webhook payload, fetches the relevant diff, asks the\n\
                   completion service to critique each hunk, and posts the findings\n\
                   back as one line-anchored review.\n\n\
                   Examples:\n  \
                     kestrel                              Run against $GITHUB_EVENT_PATH\n  \
                     kestrel --event-path event.json      Run against a saved payload\n  \
                     kestrel --dry-run                    Print comments instead of posting"
)]
struct Cli {
    /// Path to the webhook event payload (default: $GITHUB_EVENT_PATH)
    #[arg(long)]
    event_path: Option<PathBuf>,

    /// Path to configuration file (default: .kestrel.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the full pipeline but print comments instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => KestrelConfig::from_file(path)?,
        None => {
            let default_path = std::path::Path::new(".kestrel.toml");
            if default_path.exists() {
                KestrelConfig::from_file(default_path)?
            } else {
                KestrelConfig::default()
            }
        }
    };
    config.apply_env();

    if cli.verbose {
        eprintln!("model: {}", config.llm.model);
        eprintln!("exclude patterns: {:?}", config.review.exclude);
    }

    let event_path = cli
        .event_path
        .clone()
        .or_else(|| std::env::var_os("GITHUB_EVENT_PATH").map(PathBuf::from));
    let Some(event_path) = event_path else {
        miette::bail!(miette::miette!(
            help = "Set GITHUB_EVENT_PATH (the Actions runner does this) or pass --event-path",
            "No event payload available"
        ));
    };

    let event = WebhookEvent::from_file(&event_path)?;

    let kind = event.kind();
    if let EventKind::Unsupported(name) = &kind {
        eprintln!("Event not supported: {name}");
        return Ok(());
    }

    let (owner, repo, number) = event.coordinates()?;

    if config.llm.api_key.is_none() {
        miette::bail!(miette::miette!(
            help = "Provide the openai-api-key input or set OPENAI_API_KEY",
            "No API key configured for the completion service"
        ));
    }

    let github = GitHubClient::new(None)?;
    let pr = github.get_pull_request(&owner, &repo, number).await?;

    let diff_text = match &kind {
        EventKind::Opened => {
            eprintln!("Handling opened event for {pr}");
            github.get_pr_diff(&owner, &repo, number).await?
        }
        EventKind::Synchronize { before, after } => {
            eprintln!("Handling synchronize event for {pr} ({before}..{after})");
            github.compare_diff(&owner, &repo, before, after).await?
        }
        EventKind::Unsupported(_) => unreachable!(),
    };

    if diff_text.trim().is_empty() {
        eprintln!("No diff data available.");
        return Ok(());
    }

    let files = parse_unified_diff(&diff_text);
    let filtered = ExclusionFilter::new(&config.review.exclude).filter(files);
    for skip in &filtered.skipped {
        eprintln!("skipping {} ({})", skip.path.display(), skip.reason);
    }
    if filtered.kept.is_empty() {
        eprintln!("Nothing to review after filtering.");
        return Ok(());
    }

    let llm = LlmClient::new(&config.llm)?;
    let pipeline = ReviewPipeline::new(llm);
    let outcome = pipeline.review(&filtered.kept, &pr).await;

    eprintln!(
        "Reviewed {} chunks across {} files ({} failed); {} findings, {} dropped",
        outcome.stats.chunks_reviewed,
        outcome.stats.files_reviewed,
        outcome.stats.failed_chunks,
        outcome.stats.findings_received,
        outcome.stats.findings_dropped,
    );

    if outcome.comments.is_empty() {
        eprintln!("No review comments to post.");
        return Ok(());
    }

    if cli.dry_run {
        print!("{outcome}");
        return Ok(());
    }

    github
        .post_review(&owner, &repo, number, &outcome.comments)
        .await?;
    eprintln!("Posted {} review comments to {pr}", outcome.comments.len());

    Ok(())
}
