//! aftermath-runner: apply one session end to a stored account profile.
//!
//! Usage:
//!   aftermath-runner --db profiles.db --post post.json --session abc --import account.json
//!   aftermath-runner --db profiles.db --post post.json --session abc --seed 7 --json
//!
//! --config    keep/discard policy (default config/config.json)
//! --pickups   pickup-condition table used to reopen quests after quest items are lost
//! --import    store this account document under the session before handling it

use aftermath_core::{
    config::KeepConfig,
    engine::{SessionEndEngine, SessionEndReport},
    profile::{AccountProfile, PostSessionResult},
    quest_items::PickupConditionTable,
    store::ProfileStore,
};
use anyhow::{anyhow, Result};
use std::env;

#[derive(serde::Serialize)]
struct RunSummary {
    session_id: String,
    exit: String,
    outcome: &'static str,
    applied_fields: Vec<String>,
    retention: Option<String>,
    session_items_kept: usize,
    discrepancies: usize,
    referential_gaps: usize,
    lost_quest_items: usize,
    quest_changes: usize,
    side_effects: Vec<&'static str>,
    standing: Option<f64>,
    events_logged: i64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_str(&args, "--db").unwrap_or("aftermath.db");
    let config_path = arg_str(&args, "--config").unwrap_or("config/config.json");
    let post_path = arg_str(&args, "--post").ok_or_else(|| anyhow!("--post <file> is required"))?;
    let session_id = arg_str(&args, "--session")
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let seed = parse_arg(&args, "--seed", chrono::Utc::now().timestamp() as u64);
    let json_output = args.iter().any(|a| a == "--json");

    let config = KeepConfig::load(config_path)?;
    log::info!("policy loaded from {config_path} (active={})", config.active);

    let store = ProfileStore::open(db)?;
    store.migrate()?;

    if let Some(path) = arg_str(&args, "--import") {
        let account: AccountProfile = read_json(path)?;
        store.put_profile(&session_id, &account)?;
        log::info!("session={session_id} imported account from {path}");
    }

    let post: PostSessionResult = read_json(post_path)?;
    let exit = post.exit;

    let mut engine = SessionEndEngine::new(config, seed, store);
    if let Some(path) = arg_str(&args, "--pickups") {
        engine = engine.with_quest_repair(Box::new(PickupConditionTable::load(path)?));
    }

    let report = engine.handle_session_end(&session_id, post)?;
    let events_logged = engine.store.event_count(&session_id)?;

    let mut summary = RunSummary {
        session_id: session_id.clone(),
        exit: format!("{exit:?}"),
        outcome: "passed_through",
        applied_fields: Vec::new(),
        retention: None,
        session_items_kept: 0,
        discrepancies: 0,
        referential_gaps: 0,
        lost_quest_items: 0,
        quest_changes: 0,
        side_effects: Vec::new(),
        standing: None,
        events_logged,
    };
    if let SessionEndReport::Reconciled(result) = &report {
        summary.outcome = "reconciled";
        summary.applied_fields = result.applied_fields.iter().map(|f| format!("{f:?}")).collect();
        summary.retention = Some(format!("{:?}", result.retention));
        summary.session_items_kept = result.session_items_kept.len();
        summary.discrepancies = result.discrepancies.len();
        summary.referential_gaps = result.gaps.len();
        summary.lost_quest_items = result.lost_quest_items.len();
        summary.quest_changes = result.quest_changes.len();
        summary.side_effects = result.side_effects.iter().map(|e| e.name()).collect();
        summary.standing = result.standing;
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, db, seed);
    }
    Ok(())
}

fn print_summary(s: &RunSummary, db: &str, seed: u64) {
    println!("=== SESSION END ===");
    println!("  session:        {}", s.session_id);
    println!("  db:             {db}");
    println!("  seed:           {seed}");
    println!("  exit:           {}", s.exit);
    println!("  outcome:        {}", s.outcome);
    if s.outcome == "reconciled" {
        println!("  fields saved:   {}", s.applied_fields.join(", "));
        println!("  retention:      {}", s.retention.as_deref().unwrap_or("-"));
        println!("  items kept:     {}", s.session_items_kept);
        println!("  discrepancies:  {}", s.discrepancies);
        println!("  gaps recovered: {}", s.referential_gaps);
        println!("  quest items:    {} lost", s.lost_quest_items);
        println!("  quest changes:  {}", s.quest_changes);
        println!("  side effects:   {}", s.side_effects.join(", "));
        match s.standing {
            Some(v) => println!("  fence standing: {v:.2}"),
            None => println!("  fence standing: -"),
        }
    }
    println!("  events logged:  {}", s.events_logged);
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow!("Cannot parse {path}: {e}"))
}

fn arg_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
