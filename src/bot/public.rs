//! Channel command parsing and per-user cooldowns.
//!
//! A message is a command when it starts with one of the configured prefixes (`k`, `K`)
//! or is a configured short prefix such as `cf 100` or a bare `d`. The [CommandParser]
//! only splits the message into a lower-cased command word and its arguments. Alias
//! resolution happens against the command table in [`super::registry`].
//!
//! [CooldownState] keeps the last use of each `(user, command)` pair in memory. It is
//! process-local and intentionally lost on restart; entries are pruned on the
//! housekeeping tick once they are long past any configured cooldown.
use log::trace;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Command word as typed, lower-cased. May be an alias.
    pub name: String,
    pub args: Vec<String>,
}

pub struct CommandParser {
    prefixes: Vec<String>,
    short_prefixes: Vec<(String, String)>,
}

impl CommandParser {
    pub fn new(prefixes: &[String], short_prefixes: &BTreeMap<String, String>) -> Self {
        Self {
            prefixes: prefixes.iter().filter(|p| !p.is_empty()).cloned().collect(),
            short_prefixes: short_prefixes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn parse(&self, raw: &str) -> Option<ParsedCommand> {
        let content = raw.trim();
        for prefix in &self.prefixes {
            if let Some(rest) = content.strip_prefix(prefix.as_str()) {
                let mut words = rest.split_whitespace();
                let name = words.next()?.to_lowercase();
                let args = words.map(str::to_string).collect();
                trace!("Parsed '{}' via prefix '{}' from '{}'", name, prefix, raw);
                return Some(ParsedCommand { name, args });
            }
        }
        for (short, expansion) in &self.short_prefixes {
            let rest = if content == short {
                ""
            } else if let Some(rest) = content.strip_prefix(&format!("{} ", short)) {
                rest
            } else {
                continue;
            };
            let mut words = expansion.split_whitespace();
            let Some(name) = words.next() else {
                continue;
            };
            let mut args: Vec<String> = words.map(str::to_string).collect();
            args.extend(rest.split_whitespace().map(str::to_string));
            trace!("Parsed '{}' via short prefix '{}' from '{}'", name, short, raw);
            return Some(ParsedCommand {
                name: name.to_lowercase(),
                args,
            });
        }
        None
    }
}

/// Accept `<@id>`, `<@!id>` or a bare id.
pub fn parse_user_arg(arg: &str) -> Option<String> {
    let trimmed = arg.trim();
    let id = trimmed
        .strip_prefix("<@")
        .and_then(|s| s.strip_suffix('>'))
        .map(|s| s.trim_start_matches('!'))
        .unwrap_or(trimmed);
    if id.is_empty() || id.contains(char::is_whitespace) || id.contains(['<', '>', '@']) {
        return None;
    }
    Some(id.to_string())
}

pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

#[derive(Debug, Default)]
pub struct CooldownState {
    last_use: HashMap<(String, String), Instant>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and arm the cooldown in one step. Returns the time still to wait when the
    /// command is blocked; otherwise records `now` as the last use.
    pub fn check_and_arm(
        &mut self,
        user_id: &str,
        command: &str,
        cooldown: Duration,
        now: Instant,
    ) -> Result<(), Duration> {
        let key = (user_id.to_string(), command.to_string());
        if let Some(last) = self.last_use.get(&key) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < cooldown {
                return Err(cooldown - elapsed);
            }
        }
        self.last_use.insert(key, now);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.last_use.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_use.is_empty()
    }

    /// Drop entries older than `ttl`.
    pub fn prune_expired(&mut self, ttl: Duration, now: Instant) {
        self.last_use
            .retain(|_, t| now.saturating_duration_since(*t) < ttl);
    }
}
