use super::Session;
use crate::output::{print_items, print_json};
use anyhow::anyhow;
use clap::Subcommand;
use roadmap_core::{
    feature::Scope, profile::BoardKind, profile::BACKLOG_LANE, reconcile::sync_new_items,
    source::FeatureSource,
};
use serde_json::json;
use std::path::Path;

#[derive(Subcommand)]
pub enum FeedbackSubcommand {
    /// Copy open feedback rows onto the team board
    Import {
        #[arg(long)]
        team: Option<String>,
        /// Lane new cards are created in
        #[arg(long, default_value = BACKLOG_LANE)]
        lane: String,
    },
    /// Write team board sizes and completion back into the feedback sheet
    Update {
        #[arg(long)]
        team: Option<String>,
    },
    /// Fill blank titles from the first words of the description
    Titles {
        #[arg(long)]
        team: Option<String>,
        /// Number of words (default from config)
        #[arg(long)]
        words: Option<usize>,
    },
}

pub fn run(root: &Path, subcmd: FeedbackSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    match subcmd {
        FeedbackSubcommand::Import { team, lane } => {
            import(&session, team.as_deref(), &lane, json)
        }
        FeedbackSubcommand::Update { team } => update(&session, team.as_deref(), json),
        FeedbackSubcommand::Titles { team, words } => {
            titles(&session, team.as_deref(), words, json)
        }
    }
}

fn import(session: &Session, team: Option<&str>, lane: &str, json: bool) -> anyhow::Result<()> {
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let Some(mut feedback) = session.feedback(team) else {
            tracing::debug!(team = name, "no feedback product, skipping");
            continue;
        };
        let mut board = session.board(name, team, BoardKind::Team)?;
        let features = feedback.list_features(&Scope::active())?;
        let report = sync_new_items(&features, &mut board, lane)?;
        if !json {
            println!("{}:", board.label());
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
        let Some(mut feedback) = session.feedback(team) else {
            continue;
        };
        let mut board = session.board(name, team, BoardKind::Team)?;
        let features = board.list_features(&Scope::all())?;
        let written = feedback.update_features(&features)?;
        if !json {
            println!("{}: {written} rows updated", feedback.label());
        }
        results.push(json!({ "team": name, "rows_updated": written }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}

fn titles(
    session: &Session,
    team: Option<&str>,
    words: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let words = words
        .or_else(|| session.config.feedback.as_ref().map(|f| f.title_words))
        .ok_or_else(|| anyhow!("no feedback sheet configured"))?;
    let mut results = Vec::new();
    for (name, team) in session.config.select_teams(team)? {
        let Some(mut feedback) = session.feedback(team) else {
            continue;
        };
        let filled = feedback.add_titles(words)?;
        if !json {
            println!("{}: {filled} titles added", feedback.label());
        }
        results.push(json!({ "team": name, "titles_added": filled }));
    }
    if json {
        print_json(&results)?;
    }
    Ok(())
}
