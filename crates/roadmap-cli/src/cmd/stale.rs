use super::Session;
use crate::output::{print_items, print_json};
use chrono::Utc;
use roadmap_core::{profile::BoardKind, source::FeatureSource};
use serde_json::json;
use std::path::Path;

pub fn run(root: &Path, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    let stale = &session.config.stale;
    let now = Utc::now();

    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let Some(mut scrum) = session.try_board(team, BoardKind::Scrum) else {
            tracing::debug!(team = name, "no scrum board, skipping");
            continue;
        };
        let labeled = scrum.label_stale_cards(now, stale.label_after())?;
        let moved = match session.try_board(team, BoardKind::Backlog) {
            Some(mut backlog) => scrum.evict_stale(&mut backlog, now, stale.move_after())?,
            None => Vec::new(),
        };
        if !json {
            println!("{}:", scrum.label());
            print_items("labeled stale", &labeled);
            print_items("moved to backlog", &moved);
            if labeled.is_empty() && moved.is_empty() {
                println!("  nothing stale");
            }
        }
        results.push(json!({ "team": name, "labeled": labeled, "moved": moved }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}
