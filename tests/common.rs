//! Test utilities & fixtures.
//! Every server gets its own throwaway sled store under a temp dir.

use chrono::{DateTime, Utc};
use std::time::Instant;

use ksaekvat::bot::{BotServer, ReactionEvent, TextEvent};
use ksaekvat::config::Config;

pub const ADMIN: &str = "900";
pub const ALICE: &str = "100";
pub const BOB: &str = "200";
pub const CHANNEL: &str = "general";

/// Default config rooted in `tmp`, with `ADMIN` on the allow-list and cooldowns off.
pub fn test_config(tmp: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = tmp.path().join("data").to_string_lossy().to_string();
    config.bot.admin_ids = vec![ADMIN.to_string()];
    config.cooldowns.millis.clear();
    config.health.enabled = false;
    config.logging.file = None;
    config.logging.security_file = None;
    config
}

#[allow(dead_code)]
pub async fn test_server(tmp: &tempfile::TempDir) -> BotServer {
    server_with(test_config(tmp)).await
}

pub async fn server_with(config: Config) -> BotServer {
    let mut server = BotServer::new(config).await.expect("server");
    server.seed_rng(7);
    server
}

/// Post `content` in the shared channel as `user` at the current clock.
#[allow(dead_code)]
pub async fn say(server: &mut BotServer, user: &str, content: &str) {
    say_at(server, user, content, Utc::now(), Instant::now()).await;
}

#[allow(dead_code)]
pub async fn say_at(
    server: &mut BotServer,
    user: &str,
    content: &str,
    now: DateTime<Utc>,
    instant: Instant,
) {
    server
        .handle_text(TextEvent::new(user, CHANNEL, content), now, instant)
        .await
        .expect("handle_text");
}

#[allow(dead_code)]
pub async fn react_at(server: &mut BotServer, user: &str, emoji: &str, instant: Instant) {
    let ev = ReactionEvent {
        user_id: user.to_string(),
        channel: CHANNEL.to_string(),
        emoji: emoji.to_string(),
    };
    server
        .handle_reaction(ev, Utc::now(), instant)
        .await
        .expect("handle_reaction");
}

/// Text of the most recent outbound action.
#[allow(dead_code)]
pub fn last_text(server: &BotServer) -> String {
    server
        .test_messages()
        .last()
        .map(|(_, body)| body.clone())
        .unwrap_or_default()
}

#[allow(dead_code)]
pub fn balance(server: &BotServer, user: &str) -> u64 {
    server.store().get_user(user).expect("user").balance
}
