use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use roadmap_core::{
    config::{Config, WarnLevel},
    profile::BoardKind,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show configured teams and their boards
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::discover(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }
    let dash = |v: Option<&str>| v.unwrap_or("-").to_string();
    let rows = config
        .teams
        .iter()
        .map(|(name, team)| {
            let mut row = vec![name.clone()];
            row.extend(BoardKind::all().iter().map(|k| dash(team.board(*k))));
            row.push(dash(team.jira_project.as_deref()));
            row
        })
        .collect();
    print_table(
        &["TEAM", "SCRUM", "TEAM BOARD", "BACKLOG", "SIZING", "ISSUES"],
        rows,
    );
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
