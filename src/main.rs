//! ProstoKit flags - command line front end
//!
//! Drives the same flag provider and lead-capture clients the landing page
//! uses, against a configured API host.
//!
//! # Execution Flow
//!
//! 1. Load `prostokit.yaml` from the config directory, then environment overrides
//! 2. Initialize logging (daily rotating file, optional stderr)
//! 3. Create the tokio runtime
//! 4. Create the [`FlagProvider`] over an HTTP flag source
//! 5. Run the subcommand
//! 6. Cancel any in-flight attempt, log metrics, shut the runtime down
//!
//! # Subcommands
//!
//! - `status`: first load, then print the banner, sections and flags
//! - `reload`: first load plus one explicit reload
//! - `watch`: reload on an interval and print every change
//! - `newsletter`, `feedback`: submit a lead-capture form

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use prostokit_flags::config::ConfigManager;
use prostokit_flags::models::ApiSettings;
use prostokit_flags::services::{HttpFlagFetcher, LeadClient, cancel_pair};
use prostokit_flags::ui::{
    FeedbackController, LandingSection, NewsletterController, SectionView, StatusBanner,
    reload_every, render_section, spawn_banner_watcher,
};
use prostokit_flags::{APP_NAME, FlagProvider, FormStatus, LoadOutcome, VERSION};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "prostokit-flags")]
#[command(about = "Feature flags and lead capture for the ProstoKit landing page")]
#[command(version)]
struct Args {
    /// Directory containing prostokit.yaml
    #[arg(long, default_value = "config")]
    config_dir: Utf8PathBuf,

    /// Enable debug logging (overrides logging.debug)
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load flags once and print what the landing page would show
    Status,

    /// Load flags, then reload once more
    Reload,

    /// Reload periodically and print every change
    Watch {
        /// Seconds between reloads
        #[arg(long, default_value = "30")]
        interval: u64,

        /// Stop after this many reloads (runs until Ctrl-C when omitted)
        #[arg(long)]
        count: Option<u32>,
    },

    /// Subscribe an email address to the newsletter
    Newsletter {
        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        name: String,
    },

    /// Send a feedback request
    Feedback {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        message: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let mut config = config_manager.load()?;
    if args.debug {
        config.logging.debug = true;
    }

    // Held until exit so buffered log lines are flushed
    let _guard = prostokit_flags::logging::setup_from_settings(&config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("prostokit-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let fetcher = HttpFlagFetcher::new(&config.api)?;
    tracing::info!("Feature flags source: {}", fetcher.url());

    let provider = FlagProvider::new(
        Arc::new(fetcher),
        config.flags.default_set(),
        runtime.handle().clone(),
    );

    let result = runtime.block_on(run(args.command, &provider, &config.api));

    provider.shutdown();
    provider.metrics().log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Shutdown complete");
    result
}

async fn run(command: Command, provider: &FlagProvider, api: &ApiSettings) -> Result<()> {
    match command {
        Command::Status => {
            let outcome = provider.initialize().await.context("Flag load task failed")?;
            tracing::debug!("Initial load: {:?}", outcome);
            print_status(provider);
        }
        Command::Reload => {
            provider.initialize().await.context("Flag load task failed")?;
            let outcome = provider.reload_and_wait().await;
            println!("Reload: {}", describe(&outcome));
            print_status(provider);
        }
        Command::Watch { interval, count } => watch(provider, interval, count).await?,
        Command::Newsletter { email, name } => {
            let client = LeadClient::new(api)?;
            let mut controller = NewsletterController::new();
            controller.set_email(email);
            controller.set_name(name);

            if let Err(e) = controller.form().validate() {
                anyhow::bail!("{}", e);
            }
            report(controller.submit(&client).await, "Subscribed to the newsletter")?;
        }
        Command::Feedback {
            name,
            email,
            message,
        } => {
            let client = LeadClient::new(api)?;
            let mut controller = FeedbackController::new();
            controller.set_name(name);
            controller.set_email(email);
            controller.set_message(message);

            if let Err(e) = controller.form().validate() {
                anyhow::bail!("{}", e);
            }
            report(controller.submit(&client).await, "Feedback request sent")?;
        }
    }

    Ok(())
}

async fn watch(provider: &FlagProvider, interval: u64, count: Option<u32>) -> Result<()> {
    let watcher = spawn_banner_watcher(provider, |change, banner| {
        println!("{:?}", change);
        println!("  {}", banner);
    });

    provider.initialize().await.context("Flag load task failed")?;

    let (stop, stop_signal) = cancel_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping watch");
            stop.cancel();
        }
    });

    let period = Duration::from_secs(interval.max(1));
    let last = reload_every(provider, period, count, stop_signal).await;
    interrupt.abort();
    watcher.abort();

    if let Some(outcome) = last? {
        println!("Last reload: {}", describe(&outcome));
        println!("  {}", StatusBanner::from_state(&provider.get_state()));
    }
    Ok(())
}

fn describe(outcome: &LoadOutcome) -> String {
    match outcome {
        LoadOutcome::Applied => "applied".to_string(),
        LoadOutcome::Failed(message) => format!("failed: {}", message),
        LoadOutcome::Superseded => "superseded by a newer reload".to_string(),
    }
}

fn print_status(provider: &FlagProvider) {
    let state = provider.get_state();
    let banner = StatusBanner::from_state(&state);

    println!("{}", banner);
    if banner.shows_retry() {
        println!("  (run `reload` to retry)");
    }

    println!();
    for section in LandingSection::ALL {
        let view = match render_section(&state, section) {
            SectionView::Shown => "shown".to_string(),
            SectionView::Hidden => "hidden".to_string(),
            SectionView::Placeholder => "placeholder".to_string(),
            SectionView::Disabled { notice } => format!("disabled - {}", notice),
        };
        println!("{:<24} {}", section.title(), view);
    }

    println!();
    for (name, enabled) in state.flags.iter() {
        println!("{:<24} {}", name, if enabled { "on" } else { "off" });
    }
    println!("Enabled: {}", state.flags.enabled_names().join(", "));
}

fn report(status: &FormStatus, success: &str) -> Result<()> {
    match status {
        FormStatus::Success => {
            println!("{}", success);
            Ok(())
        }
        FormStatus::Error(message) => anyhow::bail!("{}", message),
        other => anyhow::bail!("Form ended in unexpected state: {:?}", other),
    }
}
