//! Interfaces to the remote systems the workflows drive.
//!
//! The core never talks to a vendor API directly. Each workflow is handed an
//! implementation of one of these traits; [`crate::local::LocalStore`] is the
//! file-backed implementation used by the CLI and the tests.
//!
//! All calls are blocking. Read methods take `&self` and so do writes: a
//! client is shared by every board or sheet built on top of it within a run,
//! and remote clients hold no state that needs exclusive access.

use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Kanban
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pos: f64,
    #[serde(default)]
    pub closed: bool,
}

/// A tag definition. Names are not unique on a board; name plus colour is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Label {
    pub fn is(&self, name: &str, color: &str) -> bool {
        self.name == name && self.color.eq_ignore_ascii_case(color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub is_upload: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub name: String,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub lane_id: String,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Custom field values keyed by field name.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
    pub last_activity: DateTime<Utc>,
}

impl Card {
    pub fn has_label_named(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }

    pub fn custom_field(&self, name: &str) -> Option<&str> {
        self.custom_fields.get(name).map(String::as_str)
    }

    /// Attachment URLs that are links rather than uploaded files.
    pub fn link_urls(&self) -> impl Iterator<Item = &str> {
        self.attachments
            .iter()
            .filter(|a| !a.is_upload)
            .map(|a| a.url.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCard {
    pub name: String,
    pub description: String,
    pub label_ids: Vec<String>,
}

pub trait KanbanProvider {
    fn boards(&self) -> Result<Vec<BoardRef>>;
    fn lanes(&self, board_id: &str) -> Result<Vec<Lane>>;
    fn labels(&self, board_id: &str) -> Result<Vec<Label>>;
    fn cards(&self, board_id: &str) -> Result<Vec<Card>>;
    fn custom_fields(&self, board_id: &str) -> Result<Vec<CustomField>>;

    /// Create a card at the bottom of `lane_id`.
    fn create_card(&self, board_id: &str, lane_id: &str, card: NewCard) -> Result<Card>;
    fn attach_url(&self, card_id: &str, url: &str) -> Result<()>;
    fn set_description(&self, card_id: &str, description: &str) -> Result<()>;
    fn set_custom_field(&self, card_id: &str, field: &CustomField, value: &str) -> Result<()>;
    fn add_label(&self, card_id: &str, label: &Label) -> Result<()>;
    fn move_card(&self, card_id: &str, board_id: &str, lane_id: &str) -> Result<()>;
    fn delete_card(&self, card_id: &str) -> Result<()>;

    /// Add a lane. `pos` of `None` appends at the bottom.
    fn add_lane(&self, board_id: &str, name: &str, pos: Option<f64>) -> Result<Lane>;
    fn add_label_definition(&self, board_id: &str, name: &str, color: &str) -> Result<Label>;
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

/// A worksheet inside a spreadsheet document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetRef {
    pub key: String,
    pub worksheet: String,
}

impl SheetRef {
    pub fn new(key: impl Into<String>, worksheet: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            worksheet: worksheet.into(),
        }
    }
}

impl std::fmt::Display for SheetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.key, self.worksheet)
    }
}

/// A single cell write. Rows and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellUpdate {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

impl CellUpdate {
    pub fn new(row: usize, col: usize, value: impl Into<String>) -> Self {
        Self {
            row,
            col,
            value: value.into(),
        }
    }

    pub fn a1(&self) -> String {
        a1(self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFormat {
    pub row: usize,
    pub col: usize,
    pub background: String,
    pub foreground: String,
    pub bold: bool,
    pub centered: bool,
}

/// Convert a 1-based row/column pair to A1 notation.
pub fn a1(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.reverse();
    let col: String = letters.into_iter().collect();
    format!("{col}{row}")
}

pub trait SheetProvider {
    /// Every row of the worksheet, header row first.
    fn values(&self, sheet: &SheetRef) -> Result<Vec<Vec<String>>>;
    fn update_cells(&self, sheet: &SheetRef, updates: &[CellUpdate]) -> Result<()>;
    fn format_cells(&self, sheet: &SheetRef, formats: &[CellFormat]) -> Result<()>;
    fn append_row(&self, sheet: &SheetRef, row: Vec<String>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Issue tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub project: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub issue_type: String,
    /// Status category: `new`, `indeterminate` or `done`.
    #[serde(default = "default_status_category")]
    pub status_category: String,
    #[serde(default)]
    pub story_points: Option<u32>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub remote_links: Vec<String>,
    #[serde(default)]
    pub comments: Vec<String>,
    pub url: String,
    pub created: DateTime<Utc>,
}

fn default_status_category() -> String {
    "new".to_string()
}

#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub project: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    pub description: Option<String>,
    pub story_points: Option<u32>,
    pub add_labels: Vec<String>,
}

pub trait IssueTracker {
    fn search(&self, jql: &str) -> Result<Vec<Issue>>;
    fn create_issue(&self, issue: NewIssue) -> Result<Issue>;
    fn update_issue(&self, key: &str, update: IssueUpdate) -> Result<()>;
    fn add_comment(&self, key: &str, body: &str) -> Result<()>;
    fn add_remote_link(&self, key: &str, url: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Source hosting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub user: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    pub commit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub user: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default = "default_pr_state")]
    pub state: String,
    /// Oldest first.
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Oldest first.
    #[serde(default)]
    pub commits: Vec<Commit>,
    /// Issue, review and inline comments together.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

fn default_pr_state() -> String {
    "open".to_string()
}

pub trait RepoHost {
    fn repos(&self, org: &str) -> Result<Vec<Repo>>;
    fn team_repos(&self, org: &str, team: &str) -> Result<Vec<Repo>>;
    /// Members of the team, or of the whole organization when `team` is `None`.
    fn members(&self, org: &str, team: Option<&str>) -> Result<Vec<String>>;
    /// Open pull requests of a repository.
    fn pulls(&self, repo: &Repo) -> Result<Vec<PullRequest>>;
}

// ---------------------------------------------------------------------------
// Bug tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub date_targeted: Option<NaiveDate>,
    #[serde(default)]
    pub released: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugTask {
    pub bug_id: u64,
    pub project: String,
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Where a task search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope<'a> {
    Project(&'a str),
    Group(&'a str),
}

#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub milestone: Option<String>,
    pub statuses: Vec<String>,
    pub subscriber: Option<String>,
}

pub trait BugTracker {
    fn projects(&self, group: &str) -> Result<Vec<String>>;
    fn has_series(&self, project: &str, series: &str) -> Result<bool>;
    /// Every milestone of a series, active or not.
    fn milestones(&self, project: &str, series: &str) -> Result<Vec<Milestone>>;
    /// A milestone defined on any project of the group.
    fn group_milestone(&self, group: &str, name: &str) -> Result<Option<Milestone>>;
    fn create_milestone(
        &self,
        project: &str,
        series: &str,
        name: &str,
        date_targeted: Option<NaiveDate>,
    ) -> Result<()>;
    /// Persist `active` and `date_targeted`.
    fn save_milestone(&self, project: &str, series: &str, milestone: &Milestone) -> Result<()>;
    fn release_milestone(
        &self,
        project: &str,
        series: &str,
        name: &str,
        date: NaiveDate,
    ) -> Result<()>;
    fn search_tasks(&self, scope: TaskScope<'_>, query: &TaskQuery) -> Result<Vec<BugTask>>;
    fn set_status(&self, bug_id: u64, project: &str, status: &str) -> Result<()>;
    fn set_tags(&self, bug_id: u64, tags: &[String]) -> Result<()>;
}
