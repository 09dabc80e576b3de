//! User command handlers.
//!
//! Every handler receives a [CommandContext] and the argument words, performs its ledger
//! mutation through the store as one read-modify-write, and returns the outbound
//! messages to send. Validation and insufficient-funds failures come back as
//! user-facing [EconomyError]s before anything is written.
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;

use crate::bot::pending::{PendingBook, PendingDecision, Taken};
use crate::bot::platform::{Outbound, Signal};
use crate::bot::public::{mention, parse_user_arg};
use crate::bot::registry::{self, Category, CommandSpec};
use crate::bot::roles::AdminList;
use crate::config::Config;
use crate::economy::{
    AnimalCatalog, BoosterKind, EconomyError, EconomyStore, ItemSlot, LevelChange, UserRecord,
};
use crate::games::battle::{CombatStats, Side};
use crate::games::gambling::{self, CoinSide};
use crate::games::hunt::{self, HuntOutcome};
use crate::games::{items, rewards, Duel, DuelReport};

pub type CommandResult = Result<Vec<Outbound>, EconomyError>;

pub struct CommandContext<'a> {
    pub config: &'a Config,
    pub store: &'a EconomyStore,
    pub catalog: &'a AnimalCatalog,
    pub pending: &'a mut PendingBook,
    pub admins: &'a AdminList,
    pub rng: &'a mut StdRng,
    pub author: &'a str,
    pub channel: &'a str,
    pub now: DateTime<Utc>,
    pub instant: Instant,
    pub started_at: Instant,
    /// Time between the event reaching the server and dispatch.
    pub latency: Duration,
}

impl CommandContext<'_> {
    pub fn reply(&self, text: impl Into<String>) -> Outbound {
        Outbound::Reply {
            channel: self.channel.to_string(),
            text: text.into(),
        }
    }

    fn currency(&self) -> &str {
        &self.config.bot.currency
    }

    fn prefix(&self) -> &str {
        self.config
            .bot
            .prefixes
            .first()
            .map(String::as_str)
            .unwrap_or("k")
    }

    fn usage(&self, spec_name: &str) -> String {
        match registry::lookup(spec_name) {
            Some(spec) => format!("usage: `{}{}`", self.prefix(), spec.usage),
            None => String::from("invalid usage"),
        }
    }

    /// Resolve an optional user argument, defaulting to the author.
    fn target_or_author(&self, arg: Option<&String>) -> Result<String, EconomyError> {
        match arg {
            Some(raw) => parse_user_arg(raw).ok_or_else(|| {
                EconomyError::InvalidArgument("mention a valid user or give their user id".into())
            }),
            None => Ok(self.author.to_string()),
        }
    }
}

/// Format an amount with thousands separators.
pub fn fmt_num(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn level_line(exp: &LevelChange) -> Option<String> {
    exp.leveled_up
        .then(|| format!("🎉 Level up! You reached level **{}**!", exp.new_level))
}

fn parse_stake(arg: Option<&String>, balance: u64, max_bet: u64) -> Result<u64, EconomyError> {
    let raw = arg.ok_or_else(|| EconomyError::InvalidAmount("please provide a bet amount".into()))?;
    if raw.eq_ignore_ascii_case("all") {
        let stake = balance.min(max_bet);
        if stake == 0 {
            return Err(EconomyError::InsufficientFunds {
                needed: 1,
                available: balance,
            });
        }
        return Ok(stake);
    }
    raw.parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| EconomyError::InvalidAmount("bet must be a positive number or \"all\"".into()))
}

pub fn execute(spec: &CommandSpec, args: &[String], ctx: &mut CommandContext<'_>) -> CommandResult {
    match spec.name {
        "help" => help(ctx, args),
        "info" => info(ctx),
        "ping" => Ok(vec![ctx.reply(format!(
            "🏓 Pong! Dispatch latency: {}ms",
            ctx.latency.as_millis()
        ))]),
        "balance" => balance(ctx, args),
        "daily" => daily(ctx),
        "weekly" => weekly(ctx),
        "work" => work(ctx),
        "pay" => pay(ctx, args),
        "profile" => profile(ctx, args),
        "coinflip" => coinflip(ctx, args),
        "dice" => dice(ctx, args),
        "slots" => slots(ctx, args),
        "hunt" => hunt_cmd(ctx),
        "sell" => sell(ctx, args),
        "zoo" => zoo(ctx, args),
        "duel" => duel(ctx, args),
        "accept" => resolve_signal(ctx, Signal::Accept),
        "decline" => resolve_signal(ctx, Signal::Decline),
        "fight" => fight(ctx, args),
        "inv" => inventory(ctx, args),
        "player" => player(ctx, args),
        _ => crate::bot::admin::execute(spec, args, ctx),
    }
}

fn help(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let is_admin = ctx.admins.is_admin(ctx.author);
    if let Some(word) = args.first() {
        let spec = registry::lookup(word)
            .filter(|s| !s.admin_only || is_admin)
            .ok_or_else(|| EconomyError::NotFound(format!("no command named '{}'", word)))?;
        let mut text = format!(
            "📖 **{}**\n{}\nUsage: `{}{}`",
            spec.name,
            spec.description,
            ctx.prefix(),
            spec.usage
        );
        if !spec.aliases.is_empty() {
            text.push_str(&format!("\nAliases: {}", spec.aliases.join(", ")));
        }
        if let Some(cd) = ctx.config.cooldowns.for_command(spec.name) {
            text.push_str(&format!("\nCooldown: {}s", cd.as_secs_f64()));
        }
        return Ok(vec![ctx.reply(text)]);
    }
    let mut lines = vec![format!(
        "📚 **{} commands** (prefix `{}`)",
        ctx.config.bot.name,
        ctx.prefix()
    )];
    for category in Category::ALL {
        if category == Category::Admin && !is_admin {
            continue;
        }
        let names: Vec<&str> = registry::in_category(category).map(|c| c.name).collect();
        lines.push(format!("{}: {}", category.title(), names.join(", ")));
    }
    lines.push(format!("Use `{}help <command>` for details.", ctx.prefix()));
    Ok(vec![ctx.reply(lines.join("\n"))])
}

fn info(ctx: &mut CommandContext<'_>) -> CommandResult {
    let uptime = ctx.instant.saturating_duration_since(ctx.started_at).as_secs();
    let text = format!(
        "🤖 **{}** v{}\nUptime: {}h {}m {}s\nCommands: {}\nPlayers: {}",
        ctx.config.bot.name,
        env!("CARGO_PKG_VERSION"),
        uptime / 3600,
        (uptime % 3600) / 60,
        uptime % 60,
        registry::COMMANDS.len(),
        ctx.store.user_count()
    );
    Ok(vec![ctx.reply(text)])
}

fn balance(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let target = ctx.target_or_author(args.first())?;
    let user = ctx.store.get_user(&target)?;
    let mut lines = vec![format!(
        "💰 {} has **{}** {}",
        mention(&target),
        fmt_num(user.balance),
        ctx.currency()
    )];
    for kind in [BoosterKind::Money, BoosterKind::Exp] {
        if let Some(b) = user.active_booster(kind, ctx.now) {
            lines.push(format!(
                "🚀 {} booster x{} ({} min left)",
                kind.as_str(),
                b.multiplier,
                b.minutes_left(ctx.now)
            ));
        }
    }
    Ok(vec![ctx.reply(lines.join("\n"))])
}

fn claim_reply(ctx: &CommandContext<'_>, title: &str, claim: &rewards::Claim) -> String {
    let cur = ctx.currency();
    let mut lines = vec![
        title.to_string(),
        format!("Reward: **+{}** {}", fmt_num(claim.total), cur),
        format!("Base: {} {}", fmt_num(claim.base), cur),
    ];
    if claim.level_bonus > 0 {
        lines.push(format!("Level bonus: +{} {}", fmt_num(claim.level_bonus), cur));
    }
    if let Some(m) = claim.booster_multiplier {
        lines.push(format!("Money booster (x{}): applied", m));
    }
    if let Some(kind) = claim.bonus_booster {
        lines.push(format!("🎁 Bonus: a {} booster x2!", kind.as_str()));
    }
    lines.push(format!("New balance: **{}** {}", fmt_num(claim.balance), cur));
    lines.push(format!("⭐ +{} XP", claim.exp.gained));
    lines.extend(level_line(&claim.exp));
    lines.join("\n")
}

fn daily(ctx: &mut CommandContext<'_>) -> CommandResult {
    let (cfg, now, rng) = (&ctx.config.economy, ctx.now, &mut *ctx.rng);
    let claim = ctx
        .store
        .update_user(ctx.author, |u| rewards::claim_daily(u, cfg, now, rng))?;
    Ok(vec![ctx.reply(claim_reply(ctx, "🎁 **Daily reward claimed!**", &claim))])
}

fn weekly(ctx: &mut CommandContext<'_>) -> CommandResult {
    let (cfg, now, rng) = (&ctx.config.economy, ctx.now, &mut *ctx.rng);
    let claim = ctx
        .store
        .update_user(ctx.author, |u| rewards::claim_weekly(u, cfg, now, rng))?;
    Ok(vec![ctx.reply(claim_reply(ctx, "📅 **Weekly reward claimed!**", &claim))])
}

fn work(ctx: &mut CommandContext<'_>) -> CommandResult {
    let (cfg, now, rng) = (&ctx.config.economy, ctx.now, &mut *ctx.rng);
    let shift = ctx
        .store
        .update_user(ctx.author, |u| Ok(rewards::work(u, cfg, now, rng)))?;
    let title = format!(
        "{} You worked as a **{}** and {}!",
        shift.emoji, shift.job, shift.action
    );
    let mut text = claim_reply(ctx, &title, &shift.claim);
    if shift.tip > 0 {
        text.push_str(&format!("\n💵 Tip: +{} {}", fmt_num(shift.tip), ctx.currency()));
    }
    Ok(vec![ctx.reply(text)])
}

fn pay(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    if args.len() < 2 {
        return Err(EconomyError::InvalidArgument(ctx.usage("pay")));
    }
    let target = parse_user_arg(&args[0]).ok_or_else(|| {
        EconomyError::InvalidArgument("mention a valid user or give their user id".into())
    })?;
    if target == ctx.author {
        return Err(EconomyError::InvalidArgument(
            "you cannot pay yourself! That would be silly.".into(),
        ));
    }
    let mut sender = ctx.store.get_user(ctx.author)?;
    let mut recipient = ctx.store.get_user(&target)?;
    let amount = rewards::parse_payment(&args[1], sender.balance)?;
    let payment = rewards::pay(&mut sender, &mut recipient, amount, &ctx.config.economy, ctx.now)?;
    ctx.store.put_user(sender)?;
    ctx.store.put_user(recipient)?;

    let cur = ctx.currency().to_string();
    Ok(vec![
        ctx.reply(format!(
            "💸 {} paid {} **{}** {}\nYour balance: {} {}\nTheir balance: {} {}",
            mention(ctx.author),
            mention(&target),
            fmt_num(payment.amount),
            cur,
            fmt_num(payment.sender_balance),
            cur,
            fmt_num(payment.recipient_balance),
            cur
        )),
        Outbound::Direct {
            user_id: target,
            text: format!(
                "💰 {} sent you {} {}. New balance: {} {}",
                mention(ctx.author),
                fmt_num(payment.received),
                cur,
                fmt_num(payment.recipient_balance),
                cur
            ),
        },
    ])
}

fn profile(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let target = ctx.target_or_author(args.first())?;
    let u = ctx.store.get_user(&target)?;
    let into_level = u.experience % crate::economy::EXPERIENCE_PER_LEVEL;
    let rarest = u
        .rarest_tier()
        .map(|r| r.display_name())
        .unwrap_or("None");
    let text = format!(
        "👤 **Profile of {}**\nLevel **{}** ({}/{} XP, {} total)\nBalance: {} {}\nAnimals: {} found, {} owned, rarest {}\nGambling: {} wagered, net {}, win rate {:.1}%\nCommands used: {}\nMember for {} day(s)",
        mention(&target),
        u.level,
        into_level,
        crate::economy::EXPERIENCE_PER_LEVEL,
        u.experience,
        fmt_num(u.balance),
        ctx.currency(),
        u.total_animals_found,
        u.animal_count(),
        rarest,
        fmt_num(u.total_gambled),
        u.net_gambling(),
        u.win_rate(),
        u.commands_used,
        (ctx.now - u.joined_at).num_days()
    );
    Ok(vec![ctx.reply(text)])
}

fn coinflip(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    // Amount and side may come in either order ("cf 100 t" or the short form "t 100").
    let side_pos = args.iter().position(|a| CoinSide::parse(a).is_some());
    let choice = side_pos
        .and_then(|i| CoinSide::parse(&args[i]))
        .unwrap_or(CoinSide::Heads);
    let amount_arg = args
        .iter()
        .enumerate()
        .find(|(i, _)| Some(*i) != side_pos)
        .map(|(_, a)| a);

    let cfg = &ctx.config.gambling;
    let (now, rng) = (ctx.now, &mut *ctx.rng);
    let report = ctx.store.update_user(ctx.author, |u| {
        let stake = parse_stake(amount_arg, u.balance, cfg.coinflip.max_bet)?;
        gambling::play_coinflip(u, stake, choice, cfg, now, rng)
    })?;
    let cur = ctx.currency();
    let mut lines = vec![format!(
        "🪙 You bet **{}** {} on **{}**. The coin landed on **{}**!",
        fmt_num(report.stake),
        cur,
        report.choice.as_str(),
        report.result.as_str()
    )];
    if report.won {
        lines.push(format!("🎉 You won **{}** {}!", fmt_num(report.payout), cur));
    } else {
        lines.push(format!("😢 You lost **{}** {}.", fmt_num(report.stake), cur));
    }
    lines.push(format!("Balance: {} {}", fmt_num(report.balance), cur));
    if let Some(exp) = &report.exp {
        lines.extend(level_line(exp));
    }
    Ok(vec![ctx.reply(lines.join("\n"))])
}

fn dice(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let choice = args.get(1).and_then(|raw| gambling::parse_dice_choice(raw));
    let cfg = &ctx.config.gambling;
    let (now, rng) = (ctx.now, &mut *ctx.rng);
    let report = ctx.store.update_user(ctx.author, |u| {
        let stake = parse_stake(args.first(), u.balance, cfg.dice.max_bet)?;
        gambling::play_dice(u, stake, choice, cfg, now, rng)
    })?;
    let cur = ctx.currency();
    let mut lines = vec![format!(
        "🎲 You picked **{}** and rolled **{}**.",
        report.choice, report.roll
    )];
    if report.multiplier > 0 {
        lines.push(format!(
            "🎉 {}x win! +{} {}",
            report.multiplier,
            fmt_num(report.payout),
            cur
        ));
    } else {
        lines.push(format!("😢 You lost **{}** {}.", fmt_num(report.stake), cur));
    }
    lines.push(format!("Balance: {} {}", fmt_num(report.balance), cur));
    if let Some(exp) = &report.exp {
        lines.extend(level_line(exp));
    }
    Ok(vec![ctx.reply(lines.join("\n"))])
}

fn slots(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let cfg = &ctx.config.gambling;
    let (now, rng) = (ctx.now, &mut *ctx.rng);
    let report = ctx.store.update_user(ctx.author, |u| {
        let stake = parse_stake(args.first(), u.balance, cfg.slots.max_bet)?;
        gambling::play_slots(u, stake, cfg, now, rng)
    })?;
    let cur = ctx.currency();
    let mut lines = vec![
        format!("🎰 [ {} ]", report.spin.reels()),
        format!("**{}**", report.spin.tier.label),
    ];
    match report.spin.tier.multiplier {
        0 => lines.push(format!("You lost **{}** {}.", fmt_num(report.stake), cur)),
        1 => lines.push(format!("Your {} {} came back.", fmt_num(report.stake), cur)),
        m => lines.push(format!("{}x win! +{} {}", m, fmt_num(report.payout), cur)),
    }
    lines.push(format!("Balance: {} {}", fmt_num(report.balance), cur));
    if let Some(exp) = &report.exp {
        lines.extend(level_line(exp));
    }
    Ok(vec![ctx.reply(lines.join("\n"))])
}

fn hunt_cmd(ctx: &mut CommandContext<'_>) -> CommandResult {
    let (cfg, catalog, now, rng) = (&ctx.config.hunting, ctx.catalog, ctx.now, &mut *ctx.rng);
    let outcome = ctx
        .store
        .update_user(ctx.author, |u| hunt::hunt(u, catalog, cfg, now, rng))?;
    let text = match outcome {
        HuntOutcome::Distracted { emoji, text } => {
            format!("{} You {} and came back empty-handed.", emoji, text)
        }
        HuntOutcome::Found(find) => {
            let mut lines = vec![
                format!(
                    "🏹 You found a **{} {}** ({})!",
                    find.emoji,
                    find.name,
                    find.rarity.display_name()
                ),
                format!("+{} {} · +{} XP", fmt_num(find.coins), ctx.currency(), find.exp.gained),
            ];
            if let Some(kind) = find.bonus_booster {
                lines.push(format!("🍀 Lucky find! You got a {} booster x2 for an hour.", kind.as_str()));
            }
            lines.extend(level_line(&find.exp));
            lines.join("\n")
        }
    };
    Ok(vec![ctx.reply(text)])
}

fn sell(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    if args.is_empty() {
        return Err(EconomyError::InvalidArgument(ctx.usage("sell")));
    }
    let catalog = ctx.catalog;
    let query = args.join(" ");
    let sale = ctx.store.update_user(ctx.author, |u| {
        if query.eq_ignore_ascii_case("all") {
            hunt::sell_all(u, catalog)
        } else {
            hunt::sell_one(u, catalog, &query)
        }
    })?;
    let what = match &sale.species {
        Some(name) => format!("your **{}**", name),
        None => format!("**{}** animals", sale.animals_sold),
    };
    Ok(vec![ctx.reply(format!(
        "💰 You sold {} for **{}** {}.\nBalance: {} {}",
        what,
        fmt_num(sale.value),
        ctx.currency(),
        fmt_num(sale.balance),
        ctx.currency()
    ))])
}

fn zoo(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let target = ctx.target_or_author(args.first())?;
    let user = ctx.store.get_user(&target)?;
    let summary = hunt::zoo_summary(&user, ctx.catalog);
    if summary.total_animals == 0 {
        return Ok(vec![ctx.reply(format!(
            "🏞️ {}'s zoo is empty. Use `{}hunt` to find animals!",
            mention(&target),
            ctx.prefix()
        ))]);
    }
    let mut lines = vec![format!("🏞️ **Zoo of {}**", mention(&target))];
    for tier in &summary.tiers {
        let owned = user.animals.get(&tier.rarity);
        let listing: Vec<String> = owned
            .into_iter()
            .flatten()
            .filter(|(_, c)| **c > 0)
            .map(|(key, count)| {
                let label = ctx
                    .catalog
                    .get(tier.rarity, key)
                    .map(|s| format!("{} {}", s.emoji, s.name))
                    .unwrap_or_else(|| key.clone());
                format!("{} x{}", label, count)
            })
            .collect();
        lines.push(format!(
            "**{}** ({} · {} {}): {}",
            tier.rarity.display_name(),
            tier.count,
            fmt_num(tier.value),
            ctx.currency(),
            listing.join(", ")
        ));
    }
    lines.push(format!(
        "Total: {} animals, {} species, worth {} {}",
        summary.total_animals,
        summary.unique_species,
        fmt_num(summary.total_value),
        ctx.currency()
    ));
    if !summary.achievements.is_empty() {
        lines.push(format!("Achievements: {}", summary.achievements.join(" · ")));
    }
    Ok(vec![ctx.reply(lines.join("\n"))])
}

fn duel(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let target = args
        .first()
        .and_then(|a| parse_user_arg(a))
        .ok_or_else(|| EconomyError::InvalidArgument(ctx.usage("duel")))?;
    let bet = match args.get(1) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| EconomyError::InvalidAmount("bet must be a whole number".into()))?,
        None => 0,
    };
    if ctx.pending.involves(ctx.author) || ctx.pending.involves(&target) {
        return Err(EconomyError::InvalidArgument(
            "one of you already has a duel or confirmation pending".into(),
        ));
    }
    let challenger = ctx.store.get_user(ctx.author)?;
    let defender = ctx.store.get_user(&target)?;
    let proposal = Duel::propose(&challenger, &defender, bet, ctx.now)?;
    let window = Duration::from_secs(ctx.config.battle.duel_response_secs);
    ctx.pending.insert(
        &target,
        PendingDecision::Duel {
            duel: proposal,
            channel: ctx.channel.to_string(),
        },
        window,
        ctx.instant,
    )?;
    let c = CombatStats::for_user(&challenger);
    let d = CombatStats::for_user(&defender);
    let mut text = format!(
        "⚔️ {} challenges {} to a duel!\n{}: Lv{} ATK {} DEF {} HP {}\n{}: Lv{} ATK {} DEF {} HP {}",
        mention(ctx.author),
        mention(&target),
        mention(ctx.author),
        challenger.level,
        c.attack,
        c.defense,
        c.health,
        mention(&target),
        defender.level,
        d.attack,
        d.defense,
        d.health
    );
    if bet > 0 {
        text.push_str(&format!(
            "\nBet: {} {} · winner takes {}",
            fmt_num(bet),
            ctx.currency(),
            fmt_num(bet * 2)
        ));
    }
    text.push_str(&format!(
        "\n{}, react ✅ or ⚔️ (or type `{}accept`) within {}s to accept, ❌ (`{}decline`) to decline.",
        mention(&target),
        ctx.prefix(),
        window.as_secs(),
        ctx.prefix()
    ));
    Ok(vec![ctx.reply(text)])
}

/// Apply an accept/decline signal from the author to their pending decision.
pub fn resolve_signal(ctx: &mut CommandContext<'_>, signal: Signal) -> CommandResult {
    let taken = ctx
        .pending
        .take(ctx.author, ctx.instant)
        .ok_or_else(|| EconomyError::InvalidArgument("you have nothing pending to answer".into()))?;
    let decision = match taken {
        Taken::Late(decision) => return expire_decision(decision).map(|o| vec![o]),
        Taken::InTime(decision) => decision,
    };
    match (decision, signal) {
        (PendingDecision::Duel { mut duel, channel }, Signal::Accept) => {
            duel.accept()?;
            let mut challenger = ctx.store.get_user(&duel.challenger)?;
            let mut defender = ctx.store.get_user(&duel.defender)?;
            let report = duel.run(
                &mut challenger,
                &mut defender,
                &ctx.config.battle,
                ctx.now,
                &mut *ctx.rng,
            )?;
            ctx.store.put_user(challenger)?;
            ctx.store.put_user(defender)?;
            Ok(vec![Outbound::Reply {
                channel,
                text: duel_summary(ctx, &duel, &report),
            }])
        }
        (PendingDecision::Duel { mut duel, channel }, Signal::Decline) => {
            duel.decline()?;
            Ok(vec![Outbound::Reply {
                channel,
                text: format!(
                    "❌ {} declined the duel from {}.",
                    mention(&duel.defender),
                    mention(&duel.challenger)
                ),
            }])
        }
        (decision @ PendingDecision::Reset { .. }, signal) => {
            crate::bot::admin::resolve_reset(ctx, decision, signal)
        }
    }
}

/// Terminal branch for a decision whose window closed without an answer.
pub fn expire_decision(decision: PendingDecision) -> Result<Outbound, EconomyError> {
    match decision {
        PendingDecision::Duel { mut duel, channel } => {
            duel.expire()?;
            Ok(Outbound::Reply {
                channel,
                text: format!(
                    "⏰ The duel challenge from {} to {} expired.",
                    mention(&duel.challenger),
                    mention(&duel.defender)
                ),
            })
        }
        PendingDecision::Reset {
            target_id, channel, ..
        } => Ok(Outbound::Reply {
            channel,
            text: format!("⏰ Reset of {} was not confirmed in time and was cancelled.", mention(&target_id)),
        }),
    }
}

fn duel_summary(ctx: &CommandContext<'_>, duel: &Duel, report: &DuelReport) -> String {
    let mut lines = vec![format!(
        "⚔️ **Duel finished after {} round(s)!**",
        report.log.rounds
    )];
    let tail = report.log.strikes.len().saturating_sub(4);
    for strike in &report.log.strikes[tail..] {
        let who = match strike.attacker {
            Side::First => &duel.challenger,
            Side::Second => &duel.defender,
        };
        lines.push(format!("R{}: {} hits for {}", strike.round, mention(who), strike.damage));
    }
    lines.push(format!("🏆 Winner: {}", mention(&report.winner)));
    if report.bet > 0 {
        lines.push(format!(
            "{} takes **{}** {}",
            mention(&report.winner),
            fmt_num(report.payout),
            ctx.currency()
        ));
    }
    lines.push(format!(
        "XP: {} +{}, {} +{}",
        mention(&report.winner),
        report.winner_exp.gained,
        mention(&report.loser),
        report.loser_exp.gained
    ));
    lines.extend(level_line(&report.winner_exp));
    lines.join("\n")
}

fn fight(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let bet = match args.first() {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| EconomyError::InvalidAmount("bet must be a positive number".into()))?,
        None => 0,
    };
    let (cfg, now, rng) = (&ctx.config.battle, ctx.now, &mut *ctx.rng);
    let report = ctx
        .store
        .update_user(ctx.author, |u| crate::games::battle::fight(u, bet, cfg, now, rng))?;
    let cur = ctx.currency();
    let mut lines = vec![
        format!(
            "{} A wild **{}** (Lv{}) appears! ATK {} DEF {} HP {}",
            report.enemy.emoji,
            report.enemy.name,
            report.enemy.level,
            report.enemy.stats.attack,
            report.enemy.stats.defense,
            report.enemy.stats.health
        ),
        format!(
            "You: ATK {} DEF {} HP {} · {} round(s)",
            report.player_stats.attack,
            report.player_stats.defense,
            report.player_stats.health,
            report.log.rounds
        ),
    ];
    if report.won {
        lines.push(format!("🏆 Victory! +{} {}", fmt_num(report.reward), cur));
    } else {
        lines.push("💀 Defeat!".to_string());
        if report.bet > 0 {
            lines.push(format!("You lost your bet of {} {}.", fmt_num(report.bet), cur));
        }
    }
    lines.push(format!("⭐ +{} XP", report.exp.gained));
    if let Some(item) = &report.drop {
        lines.push(format!(
            "🎁 Drop: {} **{}** [{}] {}",
            item.slot.emoji(),
            item.name,
            item.short_id(),
            item.bonus.describe()
        ));
    }
    lines.push(format!("Balance: {} {}", fmt_num(report.balance), cur));
    lines.extend(level_line(&report.exp));
    Ok(vec![ctx.reply(lines.join("\n"))])
}

fn inventory(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let sub = args.first().map(|s| s.to_ascii_lowercase());
    match sub.as_deref() {
        Some("equip") => {
            let id = args
                .get(1)
                .ok_or_else(|| EconomyError::InvalidArgument(ctx.usage("inv")))?
                .clone();
            let (item, replaced) = ctx.store.update_user(ctx.author, |u| items::equip(u, &id))?;
            let mut text = format!(
                "✅ Equipped {} **{}** {}",
                item.slot.emoji(),
                item.name,
                item.bonus.describe()
            );
            if let Some(old) = replaced {
                text.push_str(&format!("\n↩️ {} went back to your inventory.", old.name));
            }
            Ok(vec![ctx.reply(text)])
        }
        Some("unequip") => {
            let slot = args
                .get(1)
                .ok_or_else(|| EconomyError::InvalidArgument(ctx.usage("inv")))?
                .clone();
            let item = ctx
                .store
                .update_user(ctx.author, |u| items::unequip(u, &slot))?;
            Ok(vec![ctx.reply(format!("↩️ Unequipped **{}**.", item.name))])
        }
        other => {
            let page = other.and_then(|p| p.parse::<usize>().ok()).unwrap_or(1);
            let user = ctx.store.get_user(ctx.author)?;
            let mut lines = vec!["🎒 **Equipped**".to_string()];
            for slot in ItemSlot::ALL {
                match user.equipped.get(&slot) {
                    Some(item) => lines.push(format!(
                        "{} {}: {} {}",
                        slot.emoji(),
                        slot,
                        item.name,
                        item.bonus.describe()
                    )),
                    None => lines.push(format!("{} {}: (empty)", slot.emoji(), slot)),
                }
            }
            let (page_items, pages) = items::inventory_page(&user, page);
            lines.push(format!("📦 **Inventory** (page {}/{})", page.clamp(1, pages), pages));
            if page_items.is_empty() {
                lines.push("Nothing yet. Win fights to find equipment!".to_string());
            }
            for item in page_items {
                lines.push(format!(
                    "`{}` {} {} {}",
                    item.short_id(),
                    item.slot.emoji(),
                    item.name,
                    item.bonus.describe()
                ));
            }
            Ok(vec![ctx.reply(lines.join("\n"))])
        }
    }
}

fn player(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let target = ctx.target_or_author(args.first())?;
    let u: UserRecord = ctx.store.get_user(&target)?;
    let base = CombatStats::base(&u);
    let total = CombatStats::for_user(&u);
    let bonus = u.equipment_bonus();
    let text = format!(
        "🛡️ **{}** (Lv{})\nATK {} (+{}) = {}\nDEF {} (+{}) = {}\nHP {} (+{}) = {}\nLUCK {} (+{}) = {}\nWagered {} · won {} · lost {}",
        mention(&target),
        u.level,
        base.attack,
        bonus.attack,
        total.attack,
        base.defense,
        bonus.defense,
        total.defense,
        base.health,
        bonus.hp,
        total.health,
        base.luck,
        bonus.luck,
        total.luck,
        fmt_num(u.total_gambled),
        fmt_num(u.total_won),
        fmt_num(u.total_lost)
    );
    Ok(vec![ctx.reply(text)])
}
