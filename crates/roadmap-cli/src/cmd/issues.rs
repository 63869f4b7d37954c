use super::Session;
use crate::output::{print_items, print_json};
use clap::Subcommand;
use roadmap_core::{
    feature::Scope, profile::BoardKind, reconcile::sync_new_items, source::FeatureSource,
};
use serde_json::json;
use std::path::Path;

/// Review cards are board bookkeeping, not product work.
const REVIEW_PREFIX: &str = "PR Review";

#[derive(Subcommand)]
pub enum IssuesSubcommand {
    /// Create or update an issue for every open scrum card
    Export {
        #[arg(long)]
        team: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: IssuesSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    match subcmd {
        IssuesSubcommand::Export { team } => export(&session, team.as_deref(), json),
    }
}

fn export(session: &Session, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let Some(mut project) = session.project(team) else {
            tracing::debug!(team = name, "no issue project, skipping");
            continue;
        };
        let mut scrum = session
            .board(name, team, BoardKind::Scrum)?
            .with_skip_lanes(team.skip_lanes.clone());
        let features: Vec<_> = scrum
            .list_features(&Scope::active())?
            .into_iter()
            .filter(|f| !f.name.starts_with(REVIEW_PREFIX))
            .collect();

        let report = sync_new_items(&features, &mut project, "")?;
        if !json {
            println!("{}:", project.label());
            print_items("created", &report.created);
            print_items("updated", &report.updated);
            println!("  {report}");
        }
        results.push(json!({ "team": name, "sync": report }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}
