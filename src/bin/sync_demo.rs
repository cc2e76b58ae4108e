//! End-to-end walk through the sync layer against the in-process backend:
//! create an event, form a team, chat on the team channel and watch the
//! change feed keep every store current.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use collabforge_sync::backend::types::collections;
use collabforge_sync::backend::{Backend, InMemoryBackend};
use collabforge_sync::client::notify::Notifier;
use collabforge_sync::client::stores::events::NewEvent;
use collabforge_sync::client::stores::{ChatStore, EventStore, MyTeamsStore, ProfileResolver};
use collabforge_sync::common::config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = ClientConfig::from_env();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cfg.log_level.as_str()),
    )
    .init();
    println!(
        "sync-demo: in-process backend (configured remote would be {})",
        cfg.backend_url
    );

    let backend = Arc::new(InMemoryBackend::new());
    let shared: Arc<dyn Backend> = backend.clone();
    let (notifier, mut notices) = Notifier::channel();

    for (user_id, name) in [("u-ada", "Ada"), ("u-grace", "Grace")] {
        shared
            .insert(
                collections::PROFILES,
                json!({"user_id": user_id, "display_name": name, "avatar_url": null}),
            )
            .await?;
    }

    let mut event_store = EventStore::new(shared.clone(), notifier.clone());
    event_store.subscribe().await;
    event_store.load().await;

    let now = Utc::now();
    let event = event_store
        .create(NewEvent {
            title: "AI & ML Summit 2025!".to_string(),
            description: "Two days of shipping".to_string(),
            tagline: Some("Build something".to_string()),
            start_at: now + Duration::days(7),
            end_at: now + Duration::days(9),
            registration_deadline: now + Duration::days(5),
            tracks: "AI, Web, Hardware".to_string(),
            capacity: 200,
            team_size_min: 2,
            team_size_max: 5,
            prize_pool: Some("$10k".to_string()),
            location: None,
            is_virtual: true,
            organizer_id: "u-ada".to_string(),
        })
        .await?;
    println!("created event '{}' with slug '{}'", event.title, event.slug);

    let team = shared
        .insert(
            collections::TEAMS,
            json!({
                "event_id": event.id,
                "name": "Rustaceans",
                "tagline": null,
                "track": "AI",
                "repo_link": null,
                "invite_code": "RUST42",
            }),
        )
        .await?;
    let team_id = team["id"].as_str().unwrap().to_string();
    for (user_id, role) in [("u-ada", "leader"), ("u-grace", "member")] {
        shared
            .insert(
                collections::TEAM_MEMBERS,
                json!({"team_id": team_id, "user_id": user_id, "role": role}),
            )
            .await?;
    }

    let mut chat = ChatStore::new(shared.clone(), notifier.clone());
    chat.bind(&team_id, "u-ada").await;
    chat.send("hi team!").await;
    shared
        .insert(
            collections::TEAM_MESSAGES,
            json!({"team_id": team_id, "user_id": "u-grace", "message": "hello Ada"}),
        )
        .await?;

    // Let the feed deliveries land.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let resolver = ProfileResolver::new(shared.clone());
    let messages = chat.messages();
    let authors: Vec<String> = messages.iter().map(|m| m.user_id.clone()).collect();
    let profiles = resolver.resolve(&authors).await;
    println!("-- #{} chat --", team_id);
    for message in &messages {
        let name = profiles
            .get(&message.user_id)
            .and_then(|p| p.display_name.clone())
            .unwrap_or_else(|| "User".to_string());
        println!("[{}] {}: {}", message.created_at, name, message.message);
    }

    let my_teams = MyTeamsStore::new(shared.clone(), notifier.clone());
    my_teams.load("u-ada").await;
    for overview in my_teams.teams() {
        println!(
            "team '{}' ({} members) at '{}'",
            overview.team.name,
            overview.member_count,
            overview
                .event
                .map(|e| e.title)
                .unwrap_or_else(|| "?".to_string()),
        );
    }

    println!("events known to the store: {}", event_store.events().len());

    chat.unbind();
    event_store.close();

    while let Ok(notice) = notices.try_recv() {
        println!("notice: {:?} {}", notice.level, notice.text);
    }
    println!("backend round trips: {}", backend.call_count());
    Ok(())
}
