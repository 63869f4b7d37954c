//! Triage of pull requests from outside contributors.
//!
//! A pull request needs a team review until a team member has reviewed its
//! current head and nothing new from outside the team has arrived since.
//! Reviews older than a week are flagged for follow-up.

use crate::error::Result;
use crate::provider::{PullRequest, Repo, RepoHost};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

pub fn follow_up_after() -> Duration {
    Duration::weeks(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Internal,
    Draft,
    NoReviews,
    NoTeamReview,
    NewCommits,
    UpdatedCommits,
    Updated,
    FollowUp,
    Reviewed,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Internal => "internal PR",
            Reason::Draft => "draft",
            Reason::NoReviews => "no reviews",
            Reason::NoTeamReview => "no team reviews",
            Reason::NewCommits => "new commits",
            Reason::UpdatedCommits => "updated commits",
            Reason::Updated => "updated",
            Reason::FollowUp => "follow-up",
            Reason::Reviewed => "reviewed",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Triage {
    pub needs_review: bool,
    pub reason: Reason,
}

impl Triage {
    fn review(reason: Reason) -> Self {
        Self {
            needs_review: true,
            reason,
        }
    }

    fn skip(reason: Reason) -> Self {
        Self {
            needs_review: false,
            reason,
        }
    }
}

pub fn triage(pr: &PullRequest, members: &[String], now: DateTime<Utc>) -> Triage {
    let is_member = |user: &str| members.iter().any(|m| m == user);

    if is_member(&pr.author) {
        return Triage::skip(Reason::Internal);
    }
    if pr.draft {
        return Triage::skip(Reason::Draft);
    }
    if pr.reviews.is_empty() {
        return Triage::review(Reason::NoReviews);
    }

    let Some((team_review, reviewed_at)) = pr
        .reviews
        .iter()
        .rev()
        .filter(|r| is_member(&r.user))
        .find_map(|r| r.submitted_at.map(|at| (r, at)))
    else {
        return Triage::review(Reason::NoTeamReview);
    };

    if let Some(head) = pr.commits.last() {
        if reviewed_at < head.date {
            return Triage::review(Reason::NewCommits);
        }
        if team_review.commit_id != head.sha {
            return Triage::review(Reason::UpdatedCommits);
        }
    }

    let new_comments = pr
        .comments
        .iter()
        .any(|c| !is_member(&c.user) && c.created_at > reviewed_at);
    let new_reviews = pr
        .reviews
        .iter()
        .any(|r| !is_member(&r.user) && r.submitted_at.is_some_and(|at| at > reviewed_at));
    if new_comments || new_reviews {
        return Triage::review(Reason::Updated);
    }

    if now - reviewed_at > follow_up_after() {
        return Triage::review(Reason::FollowUp);
    }
    Triage::skip(Reason::Reviewed)
}

// ---------------------------------------------------------------------------
// PullReview
// ---------------------------------------------------------------------------

/// A pull request that needs a review card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullReview {
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub reason: Reason,
}

impl PullReview {
    pub fn new(repo: &Repo, pr: &PullRequest, reason: Reason) -> Self {
        Self {
            repo: repo.name.clone(),
            number: pr.number,
            title: pr.title.clone(),
            url: pr.url.clone(),
            reason,
        }
    }

    pub fn card_name(&self) -> String {
        format!("PR Review: {}#{} {}", self.repo, self.number, self.title)
    }

    pub fn description(&self) -> String {
        format!("{}\n\nNeeds review: {}", self.url, self.reason)
    }
}

/// Open pull requests from outside `team` (or the whole organization) that
/// need a review, across every repository the team owns.
pub fn external_pulls<H: RepoHost + ?Sized>(
    host: &H,
    org: &str,
    team: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<PullReview>> {
    let members = host.members(org, team)?;
    let repos = match team {
        Some(team) => host.team_repos(org, team)?,
        None => host.repos(org)?,
    };

    let mut reviews = Vec::new();
    for repo in repos {
        if repo.private {
            tracing::info!(repo = %repo.full_name, "skipping repo: private");
            continue;
        }
        let pulls = host.pulls(&repo)?;
        if pulls.is_empty() {
            tracing::info!(repo = %repo.full_name, "skipping repo: no PRs");
            continue;
        }
        tracing::info!(repo = %repo.full_name, "checking repo");
        for pr in pulls.iter().filter(|p| p.state == "open") {
            let triage = triage(pr, &members, now);
            if triage.needs_review {
                tracing::debug!(repo = %repo.name, number = pr.number, reason = %triage.reason, "needs review");
                reviews.push(PullReview::new(&repo, pr, triage.reason));
            } else {
                tracing::debug!(repo = %repo.name, number = pr.number, reason = %triage.reason, "skipping");
            }
        }
    }
    tracing::debug!(count = reviews.len(), "pull requests needing review");
    Ok(reviews)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
