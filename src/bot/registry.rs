//! Static command table: canonical names, aliases, help text and admin gating.
//!
//! Cooldowns are not stored here; they come from `[cooldowns]` in the config keyed by
//! the canonical name, so every alias shares one cooldown.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    General,
    Economy,
    Gambling,
    Animals,
    Battle,
    Admin,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::Economy,
        Category::Gambling,
        Category::Animals,
        Category::Battle,
        Category::Admin,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Category::General => "🔧 General",
            Category::Economy => "💰 Economy",
            Category::Gambling => "🎰 Gambling",
            Category::Animals => "🐾 Animals",
            Category::Battle => "⚔️ Battle",
            Category::Admin => "🛡️ Admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub category: Category,
    pub usage: &'static str,
    pub description: &'static str,
    pub admin_only: bool,
}

const fn cmd(
    name: &'static str,
    aliases: &'static [&'static str],
    category: Category,
    usage: &'static str,
    description: &'static str,
) -> CommandSpec {
    CommandSpec {
        name,
        aliases,
        category,
        usage,
        description,
        admin_only: matches!(category, Category::Admin),
    }
}

use Category::*;

pub const COMMANDS: &[CommandSpec] = &[
    cmd("help", &["hp", "commands"], General, "help [command]", "Show all commands or details for one"),
    cmd("info", &["botinfo", "about"], General, "info", "Bot name, version and uptime"),
    cmd("ping", &[], General, "ping", "Check that the bot is responsive"),
    cmd("balance", &["bal", "money", "coins"], Economy, "balance [@user]", "Show a balance and active boosters"),
    cmd("daily", &["d"], Economy, "daily", "Claim your daily reward"),
    cmd("weekly", &["w"], Economy, "weekly", "Claim your weekly reward"),
    cmd("work", &["job"], Economy, "work", "Work a shift for coins"),
    cmd("pay", &["give", "transfer"], Economy, "pay <@user> <amount|all>", "Send coins to another user"),
    cmd("profile", &["p", "stats", "me"], Economy, "profile [@user]", "Show level, balance and statistics"),
    cmd("coinflip", &["cf", "flip"], Gambling, "coinflip <amount|all> [heads|tails]", "Flip a coin, 2x on a correct call"),
    cmd("dice", &["roll"], Gambling, "dice <amount|all> [1-6]", "Roll a die, 5x exact or 2x on 4+"),
    cmd("slots", &["s", "slot", "slotmachine"], Gambling, "slots <amount|all>", "Spin the slot machine"),
    cmd("hunt", &["hunting"], Animals, "hunt", "Go hunting for animals"),
    cmd("sell", &["sellpet", "sellanimals"], Animals, "sell <all|animal>", "Sell animals from your zoo"),
    cmd("zoo", &["collection", "animals"], Animals, "zoo [@user]", "Show an animal collection"),
    cmd("duel", &["challenge", "pvp"], Battle, "duel <@user> [bet]", "Challenge another user to a duel"),
    cmd("accept", &[], Battle, "accept", "Accept a pending duel or confirmation"),
    cmd("decline", &[], Battle, "decline", "Decline a pending duel or confirmation"),
    cmd("fight", &["battle", "combat"], Battle, "fight [bet]", "Fight a random enemy"),
    cmd("inv", &["inventory", "item", "items"], Battle, "inv [page] | inv equip <id> | inv unequip <slot>", "Manage your equipment"),
    cmd("player", &[], Battle, "player [@user]", "Show combat stats"),
    cmd("giveitem", &[], Admin, "giveitem <@user> <money|exp|money_booster|exp_booster> [amount]", "Grant currency, experience or a booster"),
    cmd("givepet", &[], Admin, "givepet <@user> <rarity> <animal> [amount]", "Grant animals"),
    cmd("setbal", &[], Admin, "setbal <@user> <amount>", "Set a balance"),
    cmd("setlvl", &[], Admin, "setlvl <@user> <level>", "Set a level"),
    cmd("reset", &[], Admin, "reset <@user>", "Reset a user to defaults (asks for confirmation)"),
    cmd("ban", &[], Admin, "ban <@user> [reason]", "Ban a user"),
    cmd("kick", &[], Admin, "kick <@user> [reason]", "Kick a user"),
    cmd("clear", &[], Admin, "clear <1-100> [@user]", "Delete recent messages"),
];

/// Resolve a command word or alias (case-insensitive) to its table entry.
pub fn lookup(word: &str) -> Option<&'static CommandSpec> {
    let word = word.to_ascii_lowercase();
    COMMANDS
        .iter()
        .find(|c| c.name == word || c.aliases.contains(&word.as_str()))
}

pub fn in_category(category: Category) -> impl Iterator<Item = &'static CommandSpec> {
    COMMANDS.iter().filter(move |c| c.category == category)
}
