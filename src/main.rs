//! Binary entrypoint for the ksaekvat CLI.
//!
//! Commands:
//! - `start` - run the bot with the console transport, health endpoint and maintenance tick
//! - `init` - write a starter `config.toml`
//! - `status` - print configuration and ledger summary
//! - `export <path>` / `import <path>` - dump or load every user record as JSON
//!
//! See the library crate docs for module-level details: `ksaekvat::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use fs2::FileExt;
use log::{info, warn};
use std::fs::File;
use std::io::Write as _;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use ksaekvat::bot::{BotServer, InboundEvent, Outbound, ReactionEvent, TextEvent};
use ksaekvat::config::Config;
use ksaekvat::economy::EconomyStore;

const CONSOLE_CHANNEL: &str = "console";
const PID_FILE: &str = "ksaekvat.pid";

#[derive(Parser)]
#[command(name = "ksaekvat")]
#[command(about = "Economy, gambling, hunting and battle chat bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Start {
        /// Disable the stdin console transport
        #[arg(long)]
        no_console: bool,
    },
    /// Write a default configuration file
    Init,
    /// Show configuration and ledger statistics
    Status,
    /// Export every user record to a JSON file
    Export { path: String },
    /// Import user records from a JSON file (existing ids are overwritten)
    Import { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok().map(|mut c| {
            c.apply_env_overrides();
            c
        }),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { no_console } => {
            let config = match pre_config {
                Some(c) => c,
                None => load_config(&cli.config).await?,
            };
            info!("Starting ksaekvat v{}", env!("CARGO_PKG_VERSION"));
            tokio::fs::create_dir_all(&config.storage.data_dir).await?;
            let _pid_guard = acquire_pid_lock(&Path::new(&config.storage.data_dir).join(PID_FILE))?;

            if config.health.enabled {
                if let Err(e) = ksaekvat::bot::health::spawn(&config.health).await {
                    warn!("Health endpoint disabled: {}", e);
                }
            }

            let console_user = config.bot.console_user.clone();
            let mut bot = BotServer::new(config).await?;
            if !no_console {
                let (in_tx, in_rx) = mpsc::unbounded_channel();
                let (out_tx, out_rx) = mpsc::unbounded_channel();
                bot.attach_transport(in_rx, out_tx);
                tokio::spawn(console_reader(console_user, in_tx));
                tokio::spawn(console_writer(out_rx));
                info!("Console transport attached; type commands as user {}", bot.config().bot.console_user);
            }
            bot.run().await?;
        }
        Commands::Init => {
            if Path::new(&cli.config).exists() {
                return Err(anyhow!("{} already exists; refusing to overwrite", cli.config));
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = match pre_config {
                Some(c) => c,
                None => load_config(&cli.config).await?,
            };
            let pid_path = Path::new(&config.storage.data_dir).join(PID_FILE);
            let running = is_locked(&pid_path);
            println!("ksaekvat v{}", env!("CARGO_PKG_VERSION"));
            println!("Bot name:     {}", config.bot.name);
            println!("Prefixes:     {}", config.bot.prefixes.join(", "));
            println!("Admins:       {}", config.bot.admin_ids.len());
            println!("Data dir:     {}", config.storage.data_dir);
            println!(
                "Health:       {}",
                if config.health.enabled {
                    format!("{}:{}", config.health.host, config.health.port)
                } else {
                    "disabled".to_string()
                }
            );
            println!("Running:      {}", if running { "yes" } else { "no" });
            // sled holds its own lock while the bot runs
            if !running {
                let store = EconomyStore::open(config.storage.db_path())?;
                println!("Users:        {}", store.user_count());
            }
        }
        Commands::Export { path } => {
            let config = match pre_config {
                Some(c) => c,
                None => load_config(&cli.config).await?,
            };
            let store = EconomyStore::open(config.storage.db_path())?;
            let n = store.export_json(&path)?;
            info!("Exported {} user record(s) to {}", n, path);
        }
        Commands::Import { path } => {
            let config = match pre_config {
                Some(c) => c,
                None => load_config(&cli.config).await?,
            };
            let store = EconomyStore::open(config.storage.db_path())?;
            let n = store.import_json(&path)?;
            warn!(target: "security", "IMPORT of {} user record(s) from {}", n, path);
            info!("Imported {} user record(s) from {}", n, path);
        }
    }

    Ok(())
}

async fn load_config(path: &str) -> Result<Config> {
    let mut config = Config::load(path)
        .await
        .map_err(|e| anyhow!("Failed to load {}: {} (run `ksaekvat init` first)", path, e))?;
    config.apply_env_overrides();
    Ok(config)
}

/// Hold an exclusive lock on the PID file for the life of the process.
fn acquire_pid_lock(path: &Path) -> Result<File> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    file.try_lock_exclusive().map_err(|_| {
        anyhow!(
            "Another instance holds {}; refusing to start",
            path.display()
        )
    })?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;
    Ok(file)
}

fn is_locked(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    match FileExt::try_lock_shared(&file) {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(_) => true,
    }
}

/// Read stdin lines as messages from `user`. `:react <emoji>` sends a reaction instead.
async fn console_reader(user: String, tx: mpsc::UnboundedSender<InboundEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let event = match line.trim().strip_prefix(":react ") {
                    Some(emoji) => InboundEvent::Reaction(ReactionEvent {
                        user_id: user.clone(),
                        channel: CONSOLE_CHANNEL.to_string(),
                        emoji: emoji.trim().to_string(),
                    }),
                    None => InboundEvent::Text(TextEvent::new(user.clone(), CONSOLE_CHANNEL, line)),
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Console read error: {}", e);
                break;
            }
        }
    }
}

async fn console_writer(mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(out) = rx.recv().await {
        println!("[{}] {}\n", out.target(), out.text());
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());

    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Foreground runs mirror the file to the console.
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if record.target() == "security" {
                    append_security_line(security_path.as_deref(), &line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if record.target() == "security" {
                    append_security_line(security_path.as_deref(), &line);
                }
                writeln!(fmt, "{}", line)
            });
        }
    }
    let _ = builder.try_init();
}

fn append_security_line(path: Option<&str>, line: &str) {
    let Some(path) = path else {
        return;
    };
    if let Ok(mut sf) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        let _ = writeln!(sf, "{}", line);
    }
}
