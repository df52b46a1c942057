use clap::{Parser, Subcommand};
use gramflow::agent::LlmAgent;
use gramflow::config::{Config, Credentials};
use gramflow::engage::{self, daily, explore, feed};
use gramflow::progress::ProgressStore;
use gramflow::timing::{batch_schedule, TimingPolicy};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "gramflow")]
#[command(about = "Agent-driven Instagram engagement automation")]
#[command(version)]
struct Cli {
    /// Config file (YAML)
    config: PathBuf,

    #[command(subcommand)]
    command: Command,

    /// Run the browser in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the config without launching a browser
    Check,
    /// Print today's batch schedule without running anything
    Schedule,
    /// Engage posts from the home feed
    Feed,
    /// Collect and engage posts from the configured hashtags
    Explore,
    /// Run the full daily follow/like/comment batches
    Daily,
}

#[tokio::main]
async fn main() -> gramflow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = Config::load(&cli.config)?;
    if cli.headless {
        config.browser.headless = true;
    }

    match cli.command {
        Command::Check => {
            println!("Config valid: {}", config.name);
            println!("  Hashtags: {}", config.hashtags.len());
            println!("  Competitors: {}", config.competitors.len());
            println!(
                "  Daily caps: {} follows / {} likes / {} comments over {} batches",
                config.limits.max_follows_per_day,
                config.limits.max_likes_per_day,
                config.limits.max_comments_per_day,
                config.limits.batches_per_day
            );
            println!("  Progress file: {}", config.progress_file.display());
            Ok(())
        }
        Command::Schedule => {
            let batches = config.limits.batches_per_day as usize;
            println!("Schedule for {} ({} batches):", config.name, batches);
            println!(
                "  Follows:  {:?}",
                batch_schedule(config.limits.max_follows_per_day, batches)
            );
            println!(
                "  Likes:    {:?}",
                batch_schedule(config.limits.max_likes_per_day, batches)
            );
            println!(
                "  Comments: {:?}",
                batch_schedule(config.limits.max_comments_per_day, batches)
            );
            Ok(())
        }
        Command::Feed => run_live(&config, Workflow::Feed).await,
        Command::Explore => run_live(&config, Workflow::Explore).await,
        Command::Daily => run_live(&config, Workflow::Daily).await,
    }
}

enum Workflow {
    Feed,
    Explore,
    Daily,
}

async fn run_live(config: &Config, workflow: Workflow) -> gramflow::Result<()> {
    let credentials = Credentials::from_env()?;
    let store = ProgressStore::new(&config.progress_file);
    let timing = TimingPolicy::from_config(&config.timing);

    println!("Running: {}", config.name);
    let (browser, page) = gramflow::browser::launch(&config.browser).await?;
    let agent = LlmAgent::from_config(&config.agent, &page)?;

    let result: gramflow::Result<()> = async {
        engage::ensure_logged_in(&agent, &credentials, config.agent.step_budget).await?;
        match workflow {
            Workflow::Feed => {
                let summary = feed::run(&agent, config, &store, &timing).await?;
                println!();
                println!("✓ Feed run finished");
                println!("  Engaged: {}", summary.posts_engaged);
                println!("  Skipped: {}", summary.posts_skipped);
                println!("  Failed:  {}", summary.posts_failed);
            }
            Workflow::Explore => {
                let summary = explore::run(&agent, config, &store, &timing).await?;
                println!();
                println!("✓ Explore run finished");
                println!("  Hashtags explored: {}", summary.hashtags_explored);
                println!("  Posts collected:   {}", summary.posts_collected);
                println!("  Posts engaged:     {}", summary.posts_engaged);
            }
            Workflow::Daily => {
                let stats = daily::run(&agent, config, &store, &timing).await?;
                println!();
                println!("✓ Daily run finished ({})", stats.date);
                println!("  Follows:  {}", stats.follows);
                println!("  Likes:    {}", stats.likes);
                println!("  Comments: {}", stats.comments);
                println!("  Failures: {}", stats.failures);
            }
        }
        Ok(())
    }
    .await;

    browser.close().await?;

    if let Err(e) = result {
        eprintln!("✗ Failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
