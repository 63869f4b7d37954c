use super::Session;
use crate::output::{print_items, print_json, print_table};
use anyhow::bail;
use clap::Subcommand;
use roadmap_core::{feature::Scope, profile::BoardKind, source::FeatureSource};
use serde_json::json;
use std::path::Path;

#[derive(Subcommand)]
pub enum BoardSubcommand {
    /// List a board's open features with their resolved status
    List { team: String, kind: BoardKind },
    /// Create the lanes and labels a board of this kind needs
    Setup { team: String, kind: BoardKind },
    /// Recompute epic sizes from their linked cards
    Epics { team: String, kind: BoardKind },
    /// Delete every card on a board
    Clear {
        team: String,
        kind: BoardKind,
        /// Required; there is no undo
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(root: &Path, subcmd: BoardSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    match subcmd {
        BoardSubcommand::List { team, kind } => list(&session, &team, kind, json),
        BoardSubcommand::Setup { team, kind } => {
            let config = session.config.team(&team)?;
            let mut board = session.board(&team, config, kind)?;
            let created = board.setup_board()?;
            if json {
                return print_json(&json!({ "board": board.name(), "lanes_created": created }));
            }
            println!("{}:", board.label());
            print_items("created lane", &created);
            Ok(())
        }
        BoardSubcommand::Epics { team, kind } => {
            let config = session.config.team(&team)?;
            let mut board = session.board(&team, config, kind)?;
            let written = board.recompute_epics()?;
            if json {
                return print_json(&json!({ "board": board.name(), "epics_written": written }));
            }
            println!("{}: {written} epics updated", board.label());
            Ok(())
        }
        BoardSubcommand::Clear { team, kind, yes } => {
            if !yes {
                bail!("refusing to delete every card without --yes");
            }
            let config = session.config.team(&team)?;
            let mut board = session.board(&team, config, kind)?;
            let deleted = board.clear()?;
            if json {
                return print_json(&json!({ "board": board.name(), "deleted": deleted }));
            }
            println!("{}: {deleted} cards deleted", board.label());
            Ok(())
        }
    }
}

fn list(session: &Session, team_name: &str, kind: BoardKind, json: bool) -> anyhow::Result<()> {
    let team = session.config.team(team_name)?;
    let mut board = session
        .board(team_name, team, kind)?
        .with_skip_lanes(team.skip_lanes.clone());
    let features = board.list_features(&Scope::active())?;
    if json {
        return print_json(&features);
    }
    if features.is_empty() {
        println!("No open cards on {}.", board.label());
        return Ok(());
    }
    let rows = features
        .iter()
        .map(|f| {
            vec![
                f.name.clone(),
                f.status.state.to_string(),
                f.status.color.to_string(),
                f.size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["NAME", "STATE", "COLOR", "SIZE"], rows);
    Ok(())
}
