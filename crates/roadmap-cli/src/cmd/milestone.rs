use super::Session;
use crate::output::print_json;
use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use roadmap_core::{
    local::LocalStore,
    milestone::{Milestones, FIX_COMMITTED},
};
use serde_json::json;
use std::path::Path;

#[derive(Subcommand)]
pub enum MilestoneSubcommand {
    /// Create a milestone on every project in the group
    Create {
        name: String,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Release fixed bugs and close the milestone on every project
    Close {
        name: String,
        /// Release date (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Tag bugs in the milestone that are still awaiting a backport
    Tag {
        name: String,
        /// Tag to add (default from config)
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, default_value = FIX_COMMITTED)]
        status: String,
    },
    /// Count open bugs per field SLA subscriber (line protocol)
    Sla,
}

pub fn run(root: &Path, subcmd: MilestoneSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::load(root)?;
    let bugs = &session.config.bugs;
    let group = bugs
        .project_group
        .as_deref()
        .ok_or_else(|| anyhow!("no bugs.project_group configured"))?;
    let milestones = Milestones::<LocalStore>::new(&session.store, group).with_series(&bugs.series);

    match subcmd {
        MilestoneSubcommand::Create { name, date } => {
            let reports = milestones.create(&name, date)?;
            if json {
                return print_json(&reports);
            }
            for report in &reports {
                println!("{report}");
            }
        }
        MilestoneSubcommand::Close { name, date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let reports = milestones.close(&name, date)?;
            if json {
                return print_json(&reports);
            }
            for report in &reports {
                println!("{report}");
            }
        }
        MilestoneSubcommand::Tag { name, tag, status } => {
            let tag = tag.unwrap_or_else(|| bugs.backport_tag.clone());
            let tagged = milestones.tag(&name, &tag, &status)?;
            if json {
                return print_json(&json!({ "milestone": name, "tag": tag, "bugs": tagged }));
            }
            for bug in &tagged {
                println!("  tagged: {bug}");
            }
            println!("{} bugs tagged {tag}", tagged.len());
        }
        MilestoneSubcommand::Sla => {
            let counts = milestones.field_sla(&bugs.sla_subscribers, &bugs.sla_statuses)?;
            if json {
                return print_json(&counts);
            }
            for count in &counts {
                println!("{count}");
            }
        }
    }
    Ok(())
}
