//! Command-line front end for thread digests.
//!
//! Status lines and logs go to stderr; the report or JSON goes to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use openai_client::OpenAIClient;
use std::path::{Path, PathBuf};
use thread_digest::summarize::KNOWN_MODELS;
use thread_digest::{
    Config, DigestReport, FileSettingsStore, HttpPageSource, Progress, Settings, SummaryResult,
    ThreadDigest, MAX_PAGES,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(name = "digest")]
#[command(about = "Summarize a multi-page forum thread with OpenAI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect a thread and summarize it
    Summarize {
        url: String,
        /// Use this saved HTML as page 1 instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
        #[arg(long)]
        max_pages: Option<u32>,
        /// Override the saved model for this run
        #[arg(long)]
        model: Option<String>,
        /// Print a JSON result instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Collect a thread and print it as JSON
    Collect {
        url: String,
        #[arg(long)]
        html: Option<PathBuf>,
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Show or change saved settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the saved settings
    Show,

    /// Update the saved settings
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Read the prompt template from a file
        #[arg(long, conflicts_with = "reset_template")]
        prompt_template_file: Option<PathBuf>,
        /// Go back to the built-in prompt template
        #[arg(long)]
        reset_template: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,thread_digest=info,openai_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Summarize {
            url,
            html,
            max_pages,
            model,
            json,
        } => cmd_summarize(&url, html.as_deref(), max_pages, model.as_deref(), json).await,
        Commands::Collect {
            url,
            html,
            max_pages,
        } => cmd_collect(&url, html.as_deref(), max_pages).await,
        Commands::Settings(SettingsCommand::Show) => cmd_settings_show().await,
        Commands::Settings(SettingsCommand::Set {
            api_key,
            model,
            prompt_template_file,
            reset_template,
        }) => {
            cmd_settings_set(
                api_key.as_deref(),
                model.as_deref(),
                prompt_template_file.as_deref(),
                reset_template,
            )
            .await
        }
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

// ============================================================================
// Setup
// ============================================================================

fn settings_store(config: &Config) -> Result<FileSettingsStore> {
    match &config.settings_path {
        Some(path) => Ok(FileSettingsStore::new(path)),
        None => FileSettingsStore::default_location().context("Failed to locate settings file"),
    }
}

fn build_digest(config: &Config, max_pages: Option<u32>) -> Result<ThreadDigest<HttpPageSource>> {
    let forum_url = Url::parse(&format!("https://{}/", config.forum_host))
        .with_context(|| format!("Invalid forum host {:?}", config.forum_host))?;
    let source = HttpPageSource::new(config.forum_cookie.as_deref(), &forum_url)
        .context("Failed to build forum HTTP client")?;
    let client = OpenAIClient::new("").with_base_url(&config.openai_base_url);
    let page_budget = max_pages.unwrap_or(config.max_pages).clamp(1, MAX_PAGES);

    Ok(ThreadDigest::new(source, client)
        .with_forum_host(&config.forum_host)
        .with_page_budget(page_budget))
}

async fn read_html(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map(Some)
            .with_context(|| format!("Failed to read HTML file {}", path.display())),
        None => Ok(None),
    }
}

fn status(message: &str) {
    eprintln!("{}", message.bright_blue());
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_summarize(
    url: &str,
    html: Option<&Path>,
    max_pages: Option<u32>,
    model: Option<&str>,
    json: bool,
) -> Result<()> {
    let outcome = run_summary(url, html, max_pages, model, !json).await;

    if json {
        let result = json_result(outcome);
        print_json(&result)?;
        if !result.ok {
            std::process::exit(1);
        }
        return Ok(());
    }

    let report = outcome?;
    eprintln!("{}", "Done.".bright_green().bold());
    println!("{}", report);
    Ok(())
}

/// Everything from configuration to summary, so that `--json` can report
/// any failure as a result object.
async fn run_summary(
    url: &str,
    html: Option<&Path>,
    max_pages: Option<u32>,
    model: Option<&str>,
    verbose: bool,
) -> Result<DigestReport> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let store = settings_store(&config)?;
    let mut settings = Settings::load(&store)
        .await
        .context("Failed to load settings")?
        .with_fallback_api_key(config.openai_api_key.as_deref());
    if let Some(model) = model {
        settings.set_model(model);
    }

    let digest = build_digest(&config, max_pages)?;
    let first_page = read_html(html).await?;

    let report = digest
        .run_with_progress(url, first_page, &settings, |event| {
            if verbose {
                report_progress(&event, &settings.model);
            }
        })
        .await?;

    Ok(report)
}

fn report_progress(event: &Progress, model: &str) {
    match event {
        Progress::Collecting => status("Collecting thread pages..."),
        Progress::Summarizing {
            posts,
            scanned_pages,
            total_pages,
        } => status(&format!(
            "Collected {} posts from {}/{} pages, generating summary with {}...",
            posts, scanned_pages, total_pages, model
        )),
    }
}

fn json_result(outcome: Result<DigestReport>) -> SummaryResult {
    SummaryResult::from(
        outcome
            .map(|report| report.summary)
            .map_err(|e| format!("{:#}", e)),
    )
}

async fn cmd_collect(url: &str, html: Option<&Path>, max_pages: Option<u32>) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let digest = build_digest(&config, max_pages)?;
    let first_page = read_html(html).await?;

    status("Collecting thread pages...");
    let snapshot = digest.collect_only(url, first_page).await?;

    print_json(&snapshot)
}

async fn cmd_settings_show() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let store = settings_store(&config)?;
    let settings = Settings::load(&store)
        .await
        .context("Failed to load settings")?;

    let key_source = if settings.has_api_key() {
        "saved"
    } else if config.openai_api_key.is_some() {
        "OPENAI_API_KEY"
    } else {
        "missing"
    };

    println!("{} {}", "Settings file:".bold(), store.path().display());
    println!(
        "{} {} ({})",
        "API key:".bold(),
        settings.redacted_api_key(),
        key_source
    );
    println!(
        "{} {} ({})",
        "Model:".bold(),
        settings.model,
        if settings.is_custom_model() { "custom" } else { "preset" }
    );
    println!(
        "{} {}",
        "Prompt template:".bold(),
        if settings.uses_default_template() {
            "default".to_string()
        } else {
            format!("custom ({} chars)", settings.prompt_template.chars().count())
        }
    );
    println!("{} {}", "Preset models:".bold(), KNOWN_MODELS.join(", "));

    Ok(())
}

async fn cmd_settings_set(
    api_key: Option<&str>,
    model: Option<&str>,
    prompt_template_file: Option<&Path>,
    reset_template: bool,
) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let store = settings_store(&config)?;
    let mut settings = Settings::load(&store)
        .await
        .context("Failed to load settings")?;

    if let Some(key) = api_key {
        settings.set_api_key(key);
    }
    if let Some(model) = model {
        settings.set_model(model);
    }
    if let Some(path) = prompt_template_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read template file {}", path.display()))?;
        settings.set_prompt_template(&template);
    }
    if reset_template {
        settings.set_prompt_template("");
    }

    settings
        .save(&store)
        .await
        .context("Failed to save settings")?;

    println!(
        "{} {}",
        "✓ Settings saved to".bright_green(),
        store.path().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use thread_digest::{DigestError, ThreadSnapshot};

    #[test]
    fn test_json_result_reports_setup_failures() {
        let outcome: Result<DigestReport> = Err(anyhow::anyhow!("missing file"))
            .context("Failed to read HTML file page.html");

        let result = json_result(outcome);

        assert!(!result.ok);
        assert_eq!(
            result.error.as_deref(),
            Some("Failed to read HTML file page.html: missing file")
        );
    }

    #[test]
    fn test_json_result_reports_digest_failures() {
        let outcome: Result<DigestReport> = Err(DigestError::EmptyResult.into());

        let result = json_result(outcome);

        assert_eq!(result, SummaryResult::failure("AI returned an empty summary"));
    }

    #[test]
    fn test_json_result_carries_summary() {
        let report = DigestReport {
            snapshot: ThreadSnapshot {
                title: "Thread".into(),
                total_pages: 1,
                scanned_pages: 1,
                posts: vec!["post".into()],
                truncated: false,
            },
            summary: "Summary.".into(),
        };

        assert_eq!(json_result(Ok(report)), SummaryResult::success("Summary."));
    }
}
