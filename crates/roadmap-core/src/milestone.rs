//! Milestone bookkeeping across every project of a bug-tracker group.

use crate::error::{Result, RoadmapError};
use crate::provider::{BugTracker, TaskQuery, TaskScope};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

pub const TRUNK: &str = "trunk";
pub const FIX_COMMITTED: &str = "Fix Committed";
pub const FIX_RELEASED: &str = "Fix Released";
pub const DEFAULT_TAG: &str = "backport-needed";

pub fn default_sla_subscribers() -> Vec<String> {
    ["field-medium", "field-high", "field-critical"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_sla_statuses() -> Vec<String> {
    ["New", "Confirmed", "Triaged", "In Progress"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Closed { bugs_released: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReport {
    pub project: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ProjectReport {
    fn new(project: &str, outcome: Outcome) -> Self {
        Self {
            project: project.to_string(),
            outcome,
        }
    }

    fn skipped(project: &str, reason: impl Into<String>) -> Self {
        Self::new(
            project,
            Outcome::Skipped {
                reason: reason.into(),
            },
        )
    }
}

impl fmt::Display for ProjectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Created => write!(f, "{}: milestone created", self.project),
            Outcome::Closed { bugs_released } => {
                write!(f, "{}: closed ({bugs_released} bugs released)", self.project)
            }
            Outcome::Skipped { reason } => write!(f, "{}: skipping, {reason}", self.project),
        }
    }
}

/// Open bugs subscribed by one SLA team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlaCount {
    pub subscriber: String,
    pub severity: String,
    pub total: usize,
}

impl fmt::Display for SlaCount {
    /// Line protocol, one measurement per subscriber.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field_sla_bugs,subscriber={},severity={} total_bugs={}i",
            self.subscriber, self.severity, self.total
        )
    }
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

pub struct Milestones<'a, B: BugTracker + ?Sized> {
    tracker: &'a B,
    group: String,
    series: String,
}

impl<'a, B: BugTracker + ?Sized> Milestones<'a, B> {
    pub fn new(tracker: &'a B, group: impl Into<String>) -> Self {
        Self {
            tracker,
            group: group.into(),
            series: TRUNK.to_string(),
        }
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = series.into();
        self
    }

    /// Create `name` on every project's series unless it already exists.
    pub fn create(&self, name: &str, date: Option<NaiveDate>) -> Result<Vec<ProjectReport>> {
        let mut reports = Vec::new();
        for project in self.tracker.projects(&self.group)? {
            if !self.tracker.has_series(&project, &self.series)? {
                reports.push(ProjectReport::skipped(&project, format!("no {} series", self.series)));
                continue;
            }
            let exists = self
                .tracker
                .milestones(&project, &self.series)?
                .iter()
                .any(|m| m.name == name);
            if exists {
                reports.push(ProjectReport::skipped(
                    &project,
                    format!("milestone {name} already exists"),
                ));
                continue;
            }
            tracing::info!(%project, milestone = name, "creating milestone");
            self.tracker
                .create_milestone(&project, &self.series, name, date)?;
            reports.push(ProjectReport::new(&project, Outcome::Created));
        }
        Ok(reports)
    }

    /// Release and deactivate the active milestone `name` on every project,
    /// moving its fix-committed bugs to fix-released.
    pub fn close(&self, name: &str, date: NaiveDate) -> Result<Vec<ProjectReport>> {
        let mut reports = Vec::new();
        for project in self.tracker.projects(&self.group)? {
            if !self.tracker.has_series(&project, &self.series)? {
                reports.push(ProjectReport::skipped(&project, format!("no {} series", self.series)));
                continue;
            }
            let Some(mut milestone) = self
                .tracker
                .milestones(&project, &self.series)?
                .into_iter()
                .find(|m| m.active && m.name == name)
            else {
                reports.push(ProjectReport::skipped(
                    &project,
                    format!("no active milestone named {name}"),
                ));
                continue;
            };

            let query = TaskQuery {
                milestone: Some(name.to_string()),
                statuses: vec![FIX_COMMITTED.to_string()],
                subscriber: None,
            };
            let tasks = self
                .tracker
                .search_tasks(TaskScope::Project(&project), &query)?;
            for task in &tasks {
                self.tracker
                    .set_status(task.bug_id, &task.project, FIX_RELEASED)?;
            }

            if milestone.date_targeted.is_none() {
                milestone.date_targeted = Some(date);
            }
            if milestone.released.is_none() {
                self.tracker
                    .release_milestone(&project, &self.series, name, date)?;
            }
            milestone.active = false;
            self.tracker
                .save_milestone(&project, &self.series, &milestone)?;
            tracing::info!(%project, milestone = name, bugs = tasks.len(), "closed milestone");
            reports.push(ProjectReport::new(
                &project,
                Outcome::Closed {
                    bugs_released: tasks.len(),
                },
            ));
        }
        Ok(reports)
    }

    /// Add `tag` to every bug in the group milestone whose task has
    /// `status`. Returns the ids of bugs tagged.
    pub fn tag(&self, name: &str, tag: &str, status: &str) -> Result<Vec<u64>> {
        if self.tracker.group_milestone(&self.group, name)?.is_none() {
            return Err(RoadmapError::MilestoneNotFound(name.to_string()));
        }
        let query = TaskQuery {
            milestone: Some(name.to_string()),
            statuses: vec![status.to_string()],
            subscriber: None,
        };
        let mut seen = HashSet::new();
        let mut tagged = Vec::new();
        for task in self
            .tracker
            .search_tasks(TaskScope::Group(&self.group), &query)?
        {
            if !seen.insert(task.bug_id) || task.tags.iter().any(|t| t == tag) {
                continue;
            }
            let mut tags = task.tags;
            tags.push(tag.to_string());
            self.tracker.set_tags(task.bug_id, &tags)?;
            tracing::info!(bug = task.bug_id, tag, "tagged bug");
            tagged.push(task.bug_id);
        }
        Ok(tagged)
    }

    /// Open bugs per SLA subscriber across the group.
    pub fn field_sla(&self, subscribers: &[String], statuses: &[String]) -> Result<Vec<SlaCount>> {
        let mut counts = Vec::new();
        for subscriber in subscribers {
            let query = TaskQuery {
                milestone: None,
                statuses: statuses.to_vec(),
                subscriber: Some(subscriber.clone()),
            };
            let total = self
                .tracker
                .search_tasks(TaskScope::Group(&self.group), &query)?
                .len();
            let severity = subscriber.rsplit('-').next().unwrap_or(subscriber);
            counts.push(SlaCount {
                subscriber: subscriber.clone(),
                severity: severity.to_string(),
                total,
            });
        }
        Ok(counts)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
