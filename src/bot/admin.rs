//! Admin-only command handlers.
//!
//! The server rejects non-admins before these run. Every state change made here is written
//! to the `security` log target.
use chrono::Duration as ChronoDuration;
use log::info;
use std::time::Duration;

use super::commands::{fmt_num, CommandContext, CommandResult};
use super::pending::PendingDecision;
use super::platform::{Moderation, Outbound, Signal};
use super::public::{mention, parse_user_arg};
use super::registry::CommandSpec;
use super::sec_log;
use crate::economy::{BoosterKind, EconomyError, Ledger, Rarity};

const MAX_LEVEL: u32 = 500;
const MAX_PET_GRANT: u64 = 100;
const MAX_CLEAR: u32 = 100;
const BOOSTER_MULTIPLIER: f64 = 2.0;
const DEFAULT_BOOSTER_MINUTES: i64 = 60;
const MAX_BOOSTER_MINUTES: i64 = 1440;

pub fn execute(spec: &CommandSpec, args: &[String], ctx: &mut CommandContext<'_>) -> CommandResult {
    match spec.name {
        "giveitem" => give_item(ctx, args),
        "givepet" => give_pet(ctx, args),
        "setbal" => set_balance(ctx, args),
        "setlvl" => set_level(ctx, args),
        "reset" => request_reset(ctx, args),
        "ban" | "kick" => moderate_member(ctx, spec.name, args),
        "clear" => clear(ctx, args),
        other => Err(EconomyError::Internal(format!("no handler for command '{}'", other))),
    }
}

fn target(args: &[String], usage: &str) -> Result<String, EconomyError> {
    args.first()
        .and_then(|a| parse_user_arg(a))
        .ok_or_else(|| EconomyError::InvalidArgument(format!("usage: `{}`", usage)))
}

fn positive(raw: Option<&String>, what: &str) -> Result<u64, EconomyError> {
    raw.and_then(|r| r.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| EconomyError::InvalidAmount(format!("{} must be a positive number", what)))
}

fn give_item(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let usage = "giveitem <@user> <money|exp|money_booster|exp_booster> [amount]";
    let user_id = target(args, usage)?;
    let kind = args
        .get(1)
        .map(|s| s.to_ascii_lowercase())
        .ok_or_else(|| EconomyError::InvalidArgument(format!("usage: `{}`", usage)))?;
    let now = ctx.now;

    let text = match kind.as_str() {
        "money" | "coins" | "balance" => {
            let amount = positive(args.get(2), "amount")?;
            let balance = Ledger::at(ctx.store, now).grant(&user_id, amount)?;
            sec_log!("GIVEITEM money by {}: {} +{}", ctx.author, user_id, amount);
            format!(
                "✅ Gave {} {} to {}. New balance: {} {}",
                fmt_num(amount),
                ctx.config.bot.currency,
                mention(&user_id),
                fmt_num(balance),
                ctx.config.bot.currency
            )
        }
        "exp" | "experience" | "xp" => {
            let amount = positive(args.get(2), "amount")?;
            let change = Ledger::at(ctx.store, now).add_experience(&user_id, amount)?;
            sec_log!("GIVEITEM exp by {}: {} +{}", ctx.author, user_id, change.gained);
            format!(
                "✅ Gave {} XP to {}. Level {}{}",
                change.gained,
                mention(&user_id),
                change.new_level,
                if change.leveled_up { " (level up!)" } else { "" }
            )
        }
        "money_booster" | "moneybooster" | "exp_booster" | "expbooster" | "xp_booster" => {
            let booster = if kind.starts_with("money") {
                BoosterKind::Money
            } else {
                BoosterKind::Exp
            };
            let minutes = match args.get(2) {
                Some(raw) => raw
                    .parse::<i64>()
                    .ok()
                    .filter(|m| (1..=MAX_BOOSTER_MINUTES).contains(m))
                    .ok_or_else(|| {
                        EconomyError::InvalidAmount(format!(
                            "booster duration must be 1-{} minutes",
                            MAX_BOOSTER_MINUTES
                        ))
                    })?,
                None => DEFAULT_BOOSTER_MINUTES,
            };
            Ledger::at(ctx.store, now).add_booster(
                &user_id,
                booster,
                BOOSTER_MULTIPLIER,
                ChronoDuration::minutes(minutes),
            )?;
            sec_log!(
                "GIVEITEM {} booster by {}: {} for {}m",
                booster.as_str(),
                ctx.author,
                user_id,
                minutes
            );
            format!(
                "✅ Gave {} a {} booster x{} for {} minutes.",
                mention(&user_id),
                booster.as_str(),
                BOOSTER_MULTIPLIER,
                minutes
            )
        }
        other => {
            return Err(EconomyError::InvalidArgument(format!(
                "unknown item type '{}': use money, exp, money_booster or exp_booster",
                other
            )))
        }
    };
    Ok(vec![ctx.reply(text)])
}

fn give_pet(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let usage = "givepet <@user> <rarity> <animal> [amount]";
    let user_id = target(args, usage)?;
    let rarity = args
        .get(1)
        .and_then(|r| Rarity::parse(r))
        .ok_or_else(|| {
            let names: Vec<&str> = Rarity::ALL.iter().map(|r| r.as_str()).collect();
            EconomyError::InvalidArgument(format!("rarity must be one of: {}", names.join(", ")))
        })?;
    let query = args
        .get(2)
        .ok_or_else(|| EconomyError::InvalidArgument(format!("usage: `{}`", usage)))?;
    let (key, species) = ctx
        .catalog
        .tier(rarity)
        .and_then(|tier| {
            tier.iter().find(|(key, sp)| {
                key.eq_ignore_ascii_case(query) || sp.name.eq_ignore_ascii_case(query)
            })
        })
        .map(|(k, sp)| (k.clone(), sp.clone()))
        .ok_or_else(|| {
            EconomyError::NotFound(format!(
                "no {} animal named '{}'",
                rarity.display_name(),
                query
            ))
        })?;
    let count = match args.get(3) {
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|n| (1..=MAX_PET_GRANT).contains(n))
            .ok_or_else(|| {
                EconomyError::InvalidAmount(format!("amount must be 1-{}", MAX_PET_GRANT))
            })?,
        None => 1,
    };
    Ledger::at(ctx.store, ctx.now).add_animal(&user_id, rarity, &key, count)?;
    sec_log!(
        "GIVEPET by {}: {} +{} {}/{}",
        ctx.author,
        user_id,
        count,
        rarity.as_str(),
        key
    );
    Ok(vec![ctx.reply(format!(
        "✅ Gave {} {}x {} {} ({}).",
        mention(&user_id),
        count,
        species.emoji,
        species.name,
        rarity.display_name()
    ))])
}

fn set_balance(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let user_id = target(args, "setbal <@user> <amount>")?;
    let amount = args
        .get(1)
        .and_then(|a| a.parse::<u64>().ok())
        .ok_or_else(|| EconomyError::InvalidAmount("balance must be 0 or more".into()))?;
    let previous = ctx.store.update_user(&user_id, |u| {
        Ok(std::mem::replace(&mut u.balance, amount))
    })?;
    sec_log!("SETBAL by {}: {} {} -> {}", ctx.author, user_id, previous, amount);
    Ok(vec![ctx.reply(format!(
        "✅ Set {}'s balance to {} {} (was {}).",
        mention(&user_id),
        fmt_num(amount),
        ctx.config.bot.currency,
        fmt_num(previous)
    ))])
}

fn set_level(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let user_id = target(args, "setlvl <@user> <level>")?;
    let level = args
        .get(1)
        .and_then(|a| a.parse::<u32>().ok())
        .filter(|l| (1..=MAX_LEVEL).contains(l))
        .ok_or_else(|| EconomyError::InvalidAmount(format!("level must be 1-{}", MAX_LEVEL)))?;
    let previous = ctx.store.update_user(&user_id, |u| {
        let old = u.level;
        u.set_level(level);
        Ok(old)
    })?;
    sec_log!("SETLVL by {}: {} {} -> {}", ctx.author, user_id, previous, level);
    Ok(vec![ctx.reply(format!(
        "✅ Set {}'s level to {} (was {}).",
        mention(&user_id),
        level,
        previous
    ))])
}

fn request_reset(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let user_id = target(args, "reset <@user>")?;
    if ctx.admins.is_admin(&user_id) {
        return Err(EconomyError::PermissionDenied(
            "admin accounts cannot be reset".into(),
        ));
    }
    let window = Duration::from_secs(ctx.config.battle.reset_confirm_secs);
    ctx.pending.insert(
        ctx.author,
        PendingDecision::Reset {
            admin_id: ctx.author.to_string(),
            target_id: user_id.clone(),
            channel: ctx.channel.to_string(),
        },
        window,
        ctx.instant,
    )?;
    info!("Reset of {} requested by {}", user_id, ctx.author);
    let prefix = ctx.config.bot.prefixes.first().cloned().unwrap_or_default();
    Ok(vec![ctx.reply(format!(
        "⚠️ This will wipe ALL data for {}: balance, level, animals, items and statistics.\nReact ✅ (or type `{}accept`) within {}s to confirm, ❌ (`{}decline`) to cancel.",
        mention(&user_id),
        prefix,
        window.as_secs(),
        prefix
    ))])
}

/// Finish an admin reset once the requesting admin answered in time.
pub fn resolve_reset(
    ctx: &mut CommandContext<'_>,
    decision: PendingDecision,
    signal: Signal,
) -> CommandResult {
    let PendingDecision::Reset {
        admin_id,
        target_id,
        channel,
    } = decision
    else {
        return Err(EconomyError::Internal("expected a reset confirmation".into()));
    };
    let text = match signal {
        Signal::Accept => {
            ctx.store.reset_user(&target_id)?;
            sec_log!("RESET by {}: {}", admin_id, target_id);
            format!("✅ {} has been reset to defaults.", mention(&target_id))
        }
        Signal::Decline => format!("❌ Reset of {} cancelled.", mention(&target_id)),
    };
    Ok(vec![Outbound::Reply { channel, text }])
}

fn moderate_member(ctx: &mut CommandContext<'_>, action: &str, args: &[String]) -> CommandResult {
    let user_id = target(args, &format!("{} <@user> [reason]", action))?;
    if user_id == ctx.author {
        return Err(EconomyError::InvalidArgument(format!("you cannot {} yourself", action)));
    }
    if ctx.admins.is_admin(&user_id) {
        return Err(EconomyError::PermissionDenied(format!(
            "admins cannot {} other admins",
            action
        )));
    }
    let reason = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        String::from("No reason provided")
    };
    sec_log!("{} by {}: {} ({})", action.to_uppercase(), ctx.author, user_id, reason);
    let moderation = if action == "ban" {
        Moderation::Ban {
            user_id: user_id.clone(),
            reason: reason.clone(),
        }
    } else {
        Moderation::Kick {
            user_id: user_id.clone(),
            reason: reason.clone(),
        }
    };
    let verb = if action == "ban" { "banned" } else { "kicked" };
    Ok(vec![
        Outbound::Moderate(moderation),
        ctx.reply(format!("🔨 {} was {}. Reason: {}", mention(&user_id), verb, reason)),
    ])
}

fn clear(ctx: &mut CommandContext<'_>, args: &[String]) -> CommandResult {
    let count = args
        .first()
        .and_then(|a| a.parse::<u32>().ok())
        .filter(|n| (1..=MAX_CLEAR).contains(n))
        .ok_or_else(|| EconomyError::InvalidAmount(format!("amount must be 1-{}", MAX_CLEAR)))?;
    let user_id = match args.get(1) {
        Some(raw) => Some(parse_user_arg(raw).ok_or_else(|| {
            EconomyError::InvalidArgument("mention a valid user or give their user id".into())
        })?),
        None => None,
    };
    sec_log!(
        "CLEAR by {}: {} message(s) in {}{}",
        ctx.author,
        count,
        ctx.channel,
        user_id
            .as_deref()
            .map(|u| format!(" from {}", u))
            .unwrap_or_default()
    );
    Ok(vec![
        Outbound::Moderate(Moderation::Clear {
            channel: ctx.channel.to_string(),
            count,
            user_id,
        }),
        ctx.reply(format!("🧹 Cleared {} message(s).", count)),
    ])
}
