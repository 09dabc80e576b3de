use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::commands::{self, CommandContext};
use super::maintenance::{MaintenanceReport, MaintenanceScheduler};
use super::pending::PendingBook;
use super::platform::{InboundEvent, Outbound, ReactionEvent, Signal, TextEvent};
use super::public::{CommandParser, CooldownState};
use super::registry::{self, CommandSpec};
use super::roles::AdminList;
use super::sec_log;
use crate::config::Config;
use crate::economy::{AnimalCatalog, EconomyError, EconomyStore, Ledger, StatKind};
use crate::logutil::escape_log;
use crate::metrics;

/// Reply for any failure that is not the user's fault.
pub const GENERIC_ERROR_REPLY: &str =
    "There was an error executing this command. Please try again later.";

/// Commands whose first argument may be `all`, meaning the whole balance up to the bet cap.
const WAGER_COMMANDS: [&str; 4] = ["coinflip", "dice", "slots", "fight"];

/// How long cooldown entries are kept after their last use.
const COOLDOWN_RETENTION: Duration = Duration::from_secs(3600);

/// # Bot Server
///
/// Owns the ledger store, the species catalog and all in-memory dispatch state
/// (cooldowns, pending duel and reset prompts, maintenance dedupe), and drives them
/// from a single task:
///
/// ```text
/// ┌──────────────┐  InboundEvent  ┌──────────────┐  Outbound  ┌──────────────┐
/// │  Transport   │───────────────→│  BotServer   │───────────→│  Transport   │
/// │  (platform / │                │  (dispatch,  │            │  (replies,   │
/// │   console)   │                │   1s tick)   │            │   DMs, mod)  │
/// └──────────────┘                └──────────────┘            └──────────────┘
///                                        │
///                                 ┌──────────────┐
///                                 │ EconomyStore │
///                                 └──────────────┘
/// ```
///
/// Events are processed one at a time, so each command's read-modify-write of a user
/// record is never interleaved with another command's.
///
/// ## Usage
///
/// ```rust,no_run
/// use ksaekvat::bot::BotServer;
/// use ksaekvat::config::Config;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load("config.toml").await?;
///     let mut server = BotServer::new(config).await?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct BotServer {
    config: Config,
    store: EconomyStore,
    catalog: AnimalCatalog,
    parser: CommandParser,
    cooldowns: CooldownState,
    pending: PendingBook,
    admins: AdminList,
    maintenance: MaintenanceScheduler,
    rng: StdRng,
    started_at: Instant,
    inbound_rx: Option<mpsc::UnboundedReceiver<InboundEvent>>,
    outgoing_tx: Option<mpsc::UnboundedSender<Outbound>>,
    test_messages: Vec<(String, String)>,
}

impl BotServer {
    pub async fn new(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.storage.data_dir)
            .await
            .map_err(|e| anyhow!("Failed to create data dir {}: {}", config.storage.data_dir, e))?;
        let db_path = config.storage.db_path();
        let store = EconomyStore::open(&db_path)
            .map_err(|e| anyhow!("Failed to open store at {}: {}", db_path.display(), e))?;
        let catalog = match &config.storage.catalog_path {
            Some(path) => AnimalCatalog::load(path)
                .map_err(|e| anyhow!("Failed to load catalog {}: {}", path, e))?,
            None => AnimalCatalog::embedded()?,
        };
        info!(
            "Loaded {} species, {} user record(s)",
            catalog.species_count(),
            store.user_count()
        );

        let admins = AdminList::new(&config.bot.admin_ids);
        if admins.is_empty() {
            warn!("No admin ids configured; admin commands are unreachable");
        } else {
            info!("{} admin id(s) loaded", admins.len());
        }
        let parser = CommandParser::new(&config.bot.prefixes, &config.bot.short_prefixes);
        let maintenance = MaintenanceScheduler::new(config.maintenance.clone());

        Ok(Self {
            store,
            catalog,
            parser,
            cooldowns: CooldownState::new(),
            pending: PendingBook::new(),
            admins,
            maintenance,
            rng: StdRng::from_entropy(),
            started_at: Instant::now(),
            inbound_rx: None,
            outgoing_tx: None,
            test_messages: Vec::new(),
            config,
        })
    }

    /// Wire the server to a transport. Without one, outbound actions are only recorded.
    pub fn attach_transport(
        &mut self,
        inbound_rx: mpsc::UnboundedReceiver<InboundEvent>,
        outgoing_tx: mpsc::UnboundedSender<Outbound>,
    ) {
        self.inbound_rx = Some(inbound_rx);
        self.outgoing_tx = Some(outgoing_tx);
    }

    /// Replace the random source with a seeded one (deterministic games in tests).
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn store(&self) -> &EconomyStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[doc(hidden)]
    pub fn test_messages(&self) -> &Vec<(String, String)> {
        &self.test_messages
    }

    pub async fn run(&mut self) -> Result<()> {
        info!(
            "{} started with prefixes {:?}",
            self.config.bot.name, self.config.bot.prefixes
        );

        // Housekeeping tick: pending expiry, cooldown pruning, maintenance sweeps.
        let mut periodic = tokio::time::interval(Duration::from_secs(1));
        periodic.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = periodic.tick() => {
                    if let Err(e) = self.tick(Utc::now(), Instant::now()).await {
                        warn!("Housekeeping tick error: {e:?}");
                    }
                }

                event = async {
                    if let Some(ref mut rx) = self.inbound_rx {
                        rx.recv().await
                    } else {
                        std::future::pending().await
                    }
                } => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.route_event(event).await {
                                warn!("route_event error: {e:?}");
                            }
                        }
                        None => {
                            info!("Inbound channel closed; shutting down");
                            break;
                        }
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.store.flush()?;
        let snap = metrics::snapshot();
        info!(
            "{} stopped after {} event(s): {} sent, {} failed, {} cooldown rejection(s)",
            self.config.bot.name,
            snap.events_received,
            snap.outbound_sent,
            snap.outbound_failed,
            snap.cooldown_rejections
        );
        Ok(())
    }

    pub async fn route_event(&mut self, event: InboundEvent) -> Result<()> {
        metrics::inc_events_received();
        match event {
            InboundEvent::Text(ev) => self.handle_text(ev, Utc::now(), Instant::now()).await,
            InboundEvent::Reaction(ev) => self.handle_reaction(ev, Utc::now(), Instant::now()).await,
        }
    }

    /// Dispatch one channel message at the given clock readings.
    pub async fn handle_text(
        &mut self,
        ev: TextEvent,
        now: DateTime<Utc>,
        instant: Instant,
    ) -> Result<()> {
        if ev.author_is_bot || ev.is_direct {
            trace!("Ignoring message from {} (bot or direct)", ev.author_id);
            return Ok(());
        }
        let Some(mut parsed) = self.parser.parse(&ev.content) else {
            return Ok(());
        };
        let Some(spec) = registry::lookup(&parsed.name) else {
            debug!("Unknown command '{}' from {}", parsed.name, ev.author_id);
            return Ok(());
        };
        debug!(
            "Command {} from {} in {}: {}",
            spec.name,
            ev.author_id,
            ev.channel,
            escape_log(&ev.content)
        );

        if spec.admin_only && !self.admins.is_admin(&ev.author_id) {
            sec_log!("DENIED {} for {} in {}", spec.name, ev.author_id, ev.channel);
            self.reply(
                &ev.channel,
                "❌ Access Denied: you don't have permission to use this command.",
            )
            .await;
            return Ok(());
        }

        if let Some(cooldown) = self.config.cooldowns.for_command(spec.name) {
            if let Err(remaining) =
                self.cooldowns
                    .check_and_arm(&ev.author_id, spec.name, cooldown, instant)
            {
                metrics::inc_cooldown_rejections();
                self.reply(
                    &ev.channel,
                    &format!(
                        "⏰ Please wait {:.1} more second(s) before using `{}` again.",
                        remaining.as_secs_f64(),
                        spec.name
                    ),
                )
                .await;
                return Ok(());
            }
        }

        if WAGER_COMMANDS.contains(&spec.name) {
            self.expand_all_in(&ev.author_id, &mut parsed.args)?;
        }

        metrics::record_command(spec.name);
        let result = self.dispatch(spec, &parsed.args, &ev.author_id, &ev.channel, now, instant);
        match result {
            Ok(outbound) => {
                let ledger = Ledger::at(&self.store, now);
                if let Err(e) = ledger.update_stats(&ev.author_id, StatKind::Command, 1) {
                    warn!("Failed to count command for {}: {}", ev.author_id, e);
                }
                for out in outbound {
                    self.send(out).await;
                }
            }
            Err(e) => self.report_failure(spec, &ev.channel, e).await,
        }
        Ok(())
    }

    /// Route an accept/decline reaction to the reacting user's pending prompt.
    pub async fn handle_reaction(
        &mut self,
        ev: ReactionEvent,
        now: DateTime<Utc>,
        instant: Instant,
    ) -> Result<()> {
        let Some(signal) = Signal::from_emoji(&ev.emoji) else {
            return Ok(());
        };
        if !self.pending.contains(&ev.user_id) {
            trace!("Reaction from {} with nothing pending", ev.user_id);
            return Ok(());
        }
        let spec = match signal {
            Signal::Accept => registry::lookup("accept"),
            Signal::Decline => registry::lookup("decline"),
        }
        .ok_or_else(|| anyhow!("signal commands missing from registry"))?;
        match self.dispatch(spec, &[], &ev.user_id, &ev.channel, now, instant) {
            Ok(outbound) => {
                for out in outbound {
                    self.send(out).await;
                }
            }
            Err(e) => self.report_failure(spec, &ev.channel, e).await,
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        spec: &CommandSpec,
        args: &[String],
        author: &str,
        channel: &str,
        now: DateTime<Utc>,
        instant: Instant,
    ) -> commands::CommandResult {
        let mut ctx = CommandContext {
            config: &self.config,
            store: &self.store,
            catalog: &self.catalog,
            pending: &mut self.pending,
            admins: &self.admins,
            rng: &mut self.rng,
            author,
            channel,
            now,
            instant,
            started_at: self.started_at,
            latency: instant.elapsed(),
        };
        let result = commands::execute(spec, args, &mut ctx);
        metrics::observe_dispatch_latency(instant.elapsed());
        result
    }

    /// Rewrite a leading `all` into the author's balance, capped at the bet maximum.
    fn expand_all_in(&self, author: &str, args: &mut [String]) -> Result<(), EconomyError> {
        if let Some(first) = args.first_mut() {
            if first.eq_ignore_ascii_case("all") {
                let balance = self.store.get_user(author)?.balance;
                *first = balance.min(self.config.economy.max_bet).to_string();
            }
        }
        Ok(())
    }

    async fn report_failure(&mut self, spec: &CommandSpec, channel: &str, err: EconomyError) {
        let user_facing = err.is_user_facing();
        metrics::record_command_failure(spec.name, user_facing);
        if user_facing {
            debug!("{} rejected: {}", spec.name, err);
            self.reply(channel, &format!("❌ {}", err.user_message())).await;
        } else {
            error!("Error executing {}: {}", spec.name, err);
            self.reply(channel, GENERIC_ERROR_REPLY).await;
        }
    }

    /// Housekeeping at the given clock readings.
    pub async fn tick(&mut self, now: DateTime<Utc>, instant: Instant) -> Result<MaintenanceReport> {
        for (responder, decision) in self.pending.drain_expired(instant) {
            debug!("Pending decision for {} expired", responder);
            match commands::expire_decision(decision) {
                Ok(out) => self.send(out).await,
                Err(e) => warn!("Failed to expire decision for {}: {}", responder, e),
            }
        }
        self.cooldowns.prune_expired(COOLDOWN_RETENTION, instant);

        let report = self.maintenance.tick(&self.store, now)?;
        if report.ran_anything() {
            metrics::record_sweep(
                report.daily_reset.is_some(),
                report.weekly_reset.is_some(),
                report.boosters_expired.unwrap_or(0),
            );
        }
        Ok(report)
    }

    async fn reply(&mut self, channel: &str, text: &str) {
        self.send(Outbound::Reply {
            channel: channel.to_string(),
            text: text.to_string(),
        })
        .await;
    }

    /// Hand an action to the transport. Failures are logged and otherwise ignored.
    pub async fn send(&mut self, out: Outbound) {
        let target = out.target();
        debug!("Sent to {}: {}", target, escape_log(&out.text()));
        self.test_messages.push((target, out.text()));
        match &self.outgoing_tx {
            Some(tx) => {
                if let Err(e) = tx.send(out) {
                    metrics::inc_outbound_failed();
                    warn!("Failed to deliver outbound action: {}", e);
                } else {
                    metrics::inc_outbound_sent();
                }
            }
            None => metrics::inc_outbound_sent(),
        }
    }
}
