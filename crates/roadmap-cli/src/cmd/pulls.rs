use super::Session;
use crate::output::{print_items, print_json, print_table};
use anyhow::anyhow;
use chrono::Utc;
use clap::Subcommand;
use roadmap_core::{
    config::TeamConfig,
    profile::BoardKind,
    review::{external_pulls, PullReview},
    source::FeatureSource,
};
use serde_json::json;
use std::path::Path;

#[derive(Subcommand)]
pub enum PullsSubcommand {
    /// Add a review card to the scrum board for each external pull request
    /// that needs attention
    Check {
        #[arg(long)]
        team: Option<String>,
    },
    /// List external pull requests that need a review
    List {
        #[arg(long)]
        team: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: PullsSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    match subcmd {
        PullsSubcommand::Check { team } => check(&session, team.as_deref(), json),
        PullsSubcommand::List { team } => list(&session, team.as_deref(), json),
    }
}

fn reviews(session: &Session, name: &str, team: &TeamConfig) -> anyhow::Result<Vec<PullReview>> {
    let org = team
        .github_org
        .as_deref()
        .ok_or_else(|| anyhow!("team '{name}' has no github_org configured"))?;
    Ok(external_pulls(
        &session.store,
        org,
        team.github_team.as_deref(),
        Utc::now(),
    )?)
}

fn check(session: &Session, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        if team.github_org.is_none() {
            tracing::debug!(team = name, "no github org, skipping");
            continue;
        }
        let reviews = reviews(session, name, team)?;
        let mut scrum = session.board(name, team, BoardKind::Scrum)?;
        let created = scrum.add_pull_reviews(&reviews, &session.config.pulls.lane)?;
        if !json {
            println!("{}: {} pull requests need review", scrum.label(), reviews.len());
            print_items("created", &created);
        }
        results.push(json!({ "team": name, "reviews": reviews, "created": created }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}

fn list(session: &Session, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut all = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        if team.github_org.is_none() {
            continue;
        }
        all.extend(reviews(session, name, team)?);
    }
    if json {
        return print_json(&all);
    }
    if all.is_empty() {
        println!("No pull requests need review.");
        return Ok(());
    }
    let rows = all
        .iter()
        .map(|r| {
            vec![
                format!("{}#{}", r.repo, r.number),
                r.reason.to_string(),
                r.title.clone(),
            ]
        })
        .collect();
    print_table(&["PR", "REASON", "TITLE"], rows);
    Ok(())
}
