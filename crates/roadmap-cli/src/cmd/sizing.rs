use super::Session;
use crate::output::{print_items, print_json};
use clap::Subcommand;
use roadmap_core::{
    feature::Scope,
    profile::{BoardKind, UNSIZED_LANE},
    reconcile::{propagate_sizes, sync_new_items},
    source::FeatureSource,
};
use serde_json::json;
use std::path::Path;

#[derive(Subcommand)]
pub enum SizingSubcommand {
    /// Copy team board and feedback features onto the sizing board
    Gather {
        #[arg(long)]
        team: Option<String>,
    },
    /// Write sizes from the sizing board back to every other destination
    Update {
        #[arg(long)]
        team: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: SizingSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    match subcmd {
        SizingSubcommand::Gather { team } => gather(&session, team.as_deref(), json),
        SizingSubcommand::Update { team } => update(&session, team.as_deref(), json),
    }
}

fn gather(session: &Session, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let Some(mut sizing) = session.try_board(team, BoardKind::Sizing) else {
            tracing::debug!(team = name, "no sizing board, skipping");
            continue;
        };

        let mut features = Vec::new();
        if let Some(mut board) = session.try_board(team, BoardKind::Team) {
            features.extend(board.list_features(&Scope::active())?);
        }
        if let Some(mut feedback) = session.feedback(team) {
            features.extend(feedback.list_features(&Scope::active())?);
        }

        let report = sync_new_items(&features, &mut sizing, UNSIZED_LANE)?;
        if !json {
            println!("{}:", sizing.label());
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

fn update(session: &Session, team: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let mut sizing = session.board(name, team, BoardKind::Sizing)?;
        let sized = sizing.sized_features()?;

        let mut team_board = session.try_board(team, BoardKind::Team);
        let mut scrum = session.try_board(team, BoardKind::Scrum);
        let mut feedback = session.feedback(team);
        let mut project = session.project(team);

        let mut destinations: Vec<&mut dyn FeatureSource> = Vec::new();
        if let Some(b) = team_board.as_mut() {
            destinations.push(b);
        }
        if let Some(b) = scrum.as_mut() {
            destinations.push(b);
        }
        if let Some(f) = feedback.as_mut() {
            destinations.push(f);
        }
        if let Some(p) = project.as_mut() {
            destinations.push(p);
        }

        let reports = propagate_sizes(&sized, &mut destinations)?;
        if !json {
            for report in &reports {
                println!("{report}");
                print_items("sized", &report.written);
            }
        }
        results.push(json!({ "team": name, "sizes": reports }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}
