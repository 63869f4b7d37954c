//! Issue-tracker projects as feature sources.

use crate::error::Result;
use crate::feature::{Feature, Link, Scope, Upsert};
use crate::provider::{Issue, IssueTracker, IssueUpdate, NewIssue};
use crate::source::FeatureSource;
use crate::types::{Size, State, Status};

pub const EPIC_TYPE: &str = "Epic";
pub const STORY_TYPE: &str = "Story";
const DEFAULT_SORT: &str = "ORDER BY created DESC";

/// Build a search query scoped to `project`.
pub fn query(project: &str, jql: &str, sort: &str) -> String {
    let mut query = format!("project={project}");
    if !jql.trim().is_empty() {
        query.push_str(&format!(" AND ({})", jql.trim()));
    }
    query.push(' ');
    query.push_str(if sort.trim().is_empty() { DEFAULT_SORT } else { sort.trim() });
    query
}

/// Map an issue status category to a progress state.
pub fn state_of(category: &str) -> State {
    match category {
        "done" => State::Done,
        "indeterminate" => State::InProgress,
        _ => State::NotStarted,
    }
}

pub struct Project<'a, I: IssueTracker + ?Sized> {
    tracker: &'a I,
    key: String,
}

impl<'a, I: IssueTracker + ?Sized> Project<'a, I> {
    pub fn new(tracker: &'a I, key: impl Into<String>) -> Self {
        Self {
            tracker,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn search(&self, jql: &str, sort: &str) -> Result<Vec<Issue>> {
        let query = query(&self.key, jql, sort);
        tracing::debug!(%query, "searching issues");
        self.tracker.search(&query)
    }

    /// First issue whose summary is exactly `summary`.
    pub fn find(&self, summary: &str) -> Result<Option<Issue>> {
        Ok(self
            .search("", "")?
            .into_iter()
            .find(|i| i.summary == summary))
    }

    fn to_feature(issue: Issue, release: Option<&str>) -> Feature {
        let size = if issue.issue_type == EPIC_TYPE {
            Some(Size::Epic)
        } else {
            issue.story_points.filter(|&n| n > 0).map(Size::Points)
        };
        let state = state_of(&issue.status_category);
        Feature {
            name: issue.summary,
            description: issue.description,
            size,
            status: Status::new(state),
            links: issue.remote_links.into_iter().map(Link::Url).collect(),
            closed: state == State::Done,
            release: release.map(str::to_string),
            ..Feature::default()
        }
    }

    /// URLs for the feature's links; named links resolve to the issue with
    /// that summary. Unresolved names are returned separately.
    fn resolve_links(&self, feature: &Feature, issues: &[Issue]) -> (Vec<String>, Vec<String>) {
        let mut urls: Vec<String> = Vec::new();
        let mut unresolved: Vec<String> = Vec::new();
        for link in &feature.links {
            let url = match link {
                Link::Url(url) => url.clone(),
                Link::Named(name) => match issues.iter().find(|i| &i.summary == name) {
                    Some(issue) => issue.url.clone(),
                    None => {
                        tracing::debug!(project = %self.key, link = %name, "linked issue not found");
                        if !unresolved.contains(name) {
                            unresolved.push(name.clone());
                        }
                        continue;
                    }
                },
            };
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        (urls, unresolved)
    }
}

impl<I: IssueTracker + ?Sized> FeatureSource for Project<'_, I> {
    fn label(&self) -> String {
        format!("project {}", self.key)
    }

    fn list_features(&mut self, scope: &Scope) -> Result<Vec<Feature>> {
        let jql = scope
            .release
            .as_ref()
            .map(|r| format!("labels = \"{r}\""))
            .unwrap_or_default();
        Ok(self
            .search(&jql, "")?
            .into_iter()
            .map(|issue| Self::to_feature(issue, scope.release.as_deref()))
            .filter(|f| scope.include_closed || !f.closed)
            .collect())
    }

    fn upsert_feature(&mut self, feature: &Feature, _target_lane: &str) -> Result<Upsert> {
        let issues = self.search("", "")?;
        let (urls, unresolved) = self.resolve_links(feature, &issues);

        let Some(existing) = issues.iter().find(|i| i.summary == feature.name) else {
            let issue_type = if feature.is_epic() { EPIC_TYPE } else { STORY_TYPE };
            tracing::info!(project = %self.key, summary = %feature.name, issue_type, "creating issue");
            let issue = self.tracker.create_issue(NewIssue {
                project: self.key.clone(),
                summary: feature.name.clone(),
                description: feature.description.clone(),
                issue_type: issue_type.to_string(),
            })?;
            if let Some(points) = feature.points() {
                self.tracker.update_issue(
                    &issue.key,
                    IssueUpdate {
                        story_points: Some(points),
                        ..IssueUpdate::default()
                    },
                )?;
            }
            for url in &urls {
                self.tracker.add_remote_link(&issue.key, url)?;
            }
            if !unresolved.is_empty() {
                self.tracker
                    .add_comment(&issue.key, &format!("Related: {}", unresolved.join(", ")))?;
            }
            return Ok(Upsert::Created {
                links_added: urls.len(),
            });
        };

        let description_changed =
            !feature.description.is_empty() && existing.description != feature.description;
        if description_changed {
            tracing::info!(issue = %existing.key, "updating description");
            self.tracker.update_issue(
                &existing.key,
                IssueUpdate {
                    description: Some(feature.description.clone()),
                    ..IssueUpdate::default()
                },
            )?;
        }
        let mut present = existing.remote_links.clone();
        let mut links_added = 0;
        for url in urls {
            if present.contains(&url) {
                continue;
            }
            self.tracker.add_remote_link(&existing.key, &url)?;
            present.push(url);
            links_added += 1;
        }
        Ok(Upsert::existing(description_changed, links_added))
    }

    fn write_back_size(&mut self, name: &str, points: u32) -> Result<bool> {
        let Some(issue) = self.find(name)? else {
            tracing::debug!(project = %self.key, summary = %name, "no issue to size");
            return Ok(false);
        };
        if issue.story_points == Some(points) {
            return Ok(true);
        }
        tracing::info!(issue = %issue.key, points, "writing story points");
        self.tracker.update_issue(
            &issue.key,
            IssueUpdate {
                story_points: Some(points),
                ..IssueUpdate::default()
            },
        )?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
