use super::Session;
use crate::output::{print_items, print_json};
use anyhow::Context;
use clap::Subcommand;
use roadmap_core::{
    feature::Scope,
    profile::BoardKind,
    reconcile::{roll_up_status, sync_new_items, tag_release},
    source::FeatureSource,
};
use serde_json::json;
use std::path::Path;

#[derive(Subcommand)]
pub enum ReleaseSubcommand {
    /// Add the release lane and labels to each scrum board, then file and
    /// tag the release's roadmap features
    Create {
        release: String,
        #[arg(long)]
        team: Option<String>,
    },
    /// Tag existing scrum cards with the release label
    Tag {
        release: String,
        #[arg(long)]
        team: Option<String>,
    },
    /// Write scrum board status back into the roadmap
    Status {
        release: String,
        #[arg(long)]
        team: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: ReleaseSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    match subcmd {
        ReleaseSubcommand::Create { release, team } => {
            create(&session, &release, team.as_deref(), json)
        }
        ReleaseSubcommand::Tag { release, team } => tag(&session, &release, team.as_deref(), json),
        ReleaseSubcommand::Status { release, team } => {
            status(&session, &release, team.as_deref(), json)
        }
    }
}

fn create(session: &Session, release: &str, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let Some(mut board) = session.try_board(team, BoardKind::Scrum) else {
            tracing::debug!(team = name, "no scrum board, skipping");
            continue;
        };
        let setup = board
            .create_release(release)
            .with_context(|| format!("failed to create release on {}", board.label()))?;
        if !json {
            println!("{}:", board.label());
            if setup.lane_created {
                println!("  created lane: {release}");
            }
            for color in &setup.labels_created {
                println!("  created label: {release} ({color})");
            }
        }

        let mut roadmap = session.roadmap(name, release)?;
        let features = roadmap.list_features(&Scope::release(release))?;
        let sync = sync_new_items(&features, &mut board, release)?;
        let tags = tag_release(&features, &mut board, release)?;
        if !json {
            print_items("created", &sync.created);
            print_items("updated", &sync.updated);
            print_items("tagged", &tags.tagged);
            println!("  {sync}");
        }
        results.push(json!({ "team": name, "setup": setup, "sync": sync, "tags": tags }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}

fn tag(session: &Session, release: &str, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let Some(mut board) = session.try_board(team, BoardKind::Scrum) else {
            continue;
        };
        let features = session
            .roadmap(name, release)?
            .list_features(&Scope::release(release))?;
        let report = tag_release(&features, &mut board, release)?;
        if !json {
            println!("{}:", board.label());
            print_items("tagged", &report.tagged);
            print_items("not on board", &report.missing);
        }
        results.push(json!({ "team": name, "tags": report }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}

fn status(session: &Session, release: &str, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let Some(mut board) = session.try_board(team, BoardKind::Scrum) else {
            continue;
        };
        let mut roadmap = session.roadmap(name, release)?;
        let report = {
            let mut boards: Vec<&mut dyn FeatureSource> = vec![&mut board];
            roll_up_status(&mut boards, &mut roadmap, release)?
        };
        if !json {
            println!(
                "{name}: {} features on the board, {} roadmap cells updated",
                report.features, report.written
            );
        }
        results.push(json!({ "team": name, "status": report }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}
