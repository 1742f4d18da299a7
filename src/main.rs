//! Clonebot - Entry Point
//!
//! Runs the agent against a dry-run transport. Inbound events are read from
//! stdin as newline-delimited JSON, for example:
//!
//! ```text
//! {"kind":"mention","id":"1","author":"alice","text":"@clone hi"}
//! {"kind":"follow","handle":"bob"}
//! ```

use clonebot::{dispatch, CloneBot, Config, CorpusLoader, DryRunTransport, EventHandler, InboundEvent};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let json_logs = args.iter().any(|a| a == "--json" || a == "-j");
    let once = args.iter().any(|a| a == "--once" || a == "-1");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode {
        println!("Clonebot v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: clonebot [OPTIONS] < events.ndjson");
        println!();
        println!("Options:");
        println!("  --json, -j     Log to stderr as JSON");
        println!("  --once, -1     Exit once stdin is exhausted and pending actions ran");
        println!("  --help, -h     Show this help");
        println!();
        println!("Default: dry run, every outbound call is logged instead of sent");
        println!();
        println!("Environment variables:");
        println!("  CLONEBOT_USERNAME     The bot's own handle (required)");
        println!("  CLONEBOT_OWNER        Owner receiving alerts");
        println!("  CLONEBOT_BLACKLIST    Comma-separated handles to ignore");
        println!("  CLONEBOT_FOLLOWS      'all' to follow back everyone");
        println!("  CLONEBOT_FREQUENCY    Posting interval (default: 25m)");
        println!("  CLONEBOT_MODEL        Model id, loaded from model/<id>.model");
        println!("  CLONEBOT_MODEL_PATH   Explicit corpus path");
        println!("  CLONEBOT_DELAY_MIN    Minimum action delay in seconds (default: 1)");
        println!("  CLONEBOT_DELAY_MAX    Maximum action delay in seconds (default: 6)");
        println!("  CLONEBOT_SEED         Seed for reproducible decisions");
        println!("  CLONEBOT_DRY_RUN_FOLLOWERS");
        println!("                        Handles treated as following the owner; with an owner");
        println!("                        set, favorites for anyone else become unfollows");
        return Ok(());
    }

    // Setup logging based on mode
    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(if json_logs { Level::INFO } else { Level::DEBUG });

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Clonebot v{} (dry run)", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let loader = CorpusLoader::new(config.model_path.clone()).with_seed(config.seed);
    let transport = Arc::new(DryRunTransport::new().with_followers(config.dry_run_followers.clone()));
    let bot = CloneBot::new(config, transport, Box::new(loader));

    bot.configure().await?;
    info!("Running as @{}", bot.config().username);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match serde_json::from_str::<InboundEvent>(&line) {
                        Ok(event) => {
                            info!("Event: {}", event.as_str());
                            dispatch(&bot, &event).await;
                        }
                        Err(e) => warn!("Skipping malformed event: {}", e),
                    },
                    None => {
                        info!("Input exhausted");
                        stdin_open = false;
                        if once {
                            break;
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    bot.schedule().disarm().await;
    bot.deferrer().wait_idle().await;
    Ok(())
}
