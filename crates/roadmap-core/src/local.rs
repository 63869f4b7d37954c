//! File-backed provider for offline runs and tests.
//!
//! A [`LocalStore`] keeps boards, worksheets, issues, repositories and bug
//! tasks in one YAML document (`.roadmap/workspace.yaml`). It implements
//! every provider trait. Each write is persisted immediately, so a run that
//! fails partway leaves earlier writes in place just as a remote system
//! would.

use crate::error::{Result, RoadmapError};
use crate::io;
use crate::paths;
use crate::provider::{
    Attachment, BoardRef, BugTask, BugTracker, Card, CellFormat, CellUpdate, CustomField, Issue,
    IssueTracker, IssueUpdate, KanbanProvider, Label, Lane, Milestone, NewCard, NewIssue,
    PullRequest, Repo, RepoHost, SheetProvider, SheetRef, TaskQuery, TaskScope,
};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workspace document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lanes: Vec<Lane>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetData {
    pub key: String,
    pub worksheet: String,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<CellFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoData {
    #[serde(flatten)]
    pub repo: Repo,
    #[serde(default)]
    pub pulls: Vec<PullRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamData {
    pub slug: String,
    #[serde(default)]
    pub members: Vec<String>,
    /// Repository names owned by the team.
    #[serde(default)]
    pub repos: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgData {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub teams: Vec<TeamData>,
    #[serde(default)]
    pub repos: Vec<RepoData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesData {
    pub name: String,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BugProject {
    pub name: String,
    #[serde(default)]
    pub series: Vec<SeriesData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BugGroup {
    pub name: String,
    #[serde(default)]
    pub projects: Vec<String>,
}

/// One bug's task on one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub bug_id: u64,
    pub project: String,
    pub status: String,
    #[serde(default)]
    pub milestone: Option<String>,
    #[serde(default)]
    pub subscribers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BugData {
    #[serde(default)]
    pub groups: Vec<BugGroup>,
    #[serde(default)]
    pub projects: Vec<BugProject>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    /// Tags are per bug, shared by all of its tasks.
    #[serde(default)]
    pub tags: BTreeMap<u64, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub boards: Vec<BoardData>,
    #[serde(default)]
    pub sheets: Vec<SheetData>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub orgs: Vec<OrgData>,
    #[serde(default)]
    pub bugs: BugData,
}

fn not_found(what: &str, id: &str) -> RoadmapError {
    RoadmapError::Provider(format!("{what} not found: {id}"))
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Workspace {
    fn board(&self, id: &str) -> Result<&BoardData> {
        self.boards
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("board", id))
    }

    fn board_mut(&mut self, id: &str) -> Result<&mut BoardData> {
        self.boards
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("board", id))
    }

    fn card_mut(&mut self, id: &str) -> Result<&mut Card> {
        self.boards
            .iter_mut()
            .flat_map(|b| b.cards.iter_mut())
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("card", id))
    }

    fn sheet(&self, sheet: &SheetRef) -> Result<&SheetData> {
        self.sheets
            .iter()
            .find(|s| s.key == sheet.key && s.worksheet == sheet.worksheet)
            .ok_or_else(|| not_found("worksheet", &sheet.to_string()))
    }

    fn sheet_mut(&mut self, sheet: &SheetRef) -> Result<&mut SheetData> {
        self.sheets
            .iter_mut()
            .find(|s| s.key == sheet.key && s.worksheet == sheet.worksheet)
            .ok_or_else(|| not_found("worksheet", &sheet.to_string()))
    }

    fn issue_mut(&mut self, key: &str) -> Result<&mut Issue> {
        self.issues
            .iter_mut()
            .find(|i| i.key == key)
            .ok_or_else(|| not_found("issue", key))
    }

    fn org(&self, name: &str) -> Result<&OrgData> {
        self.orgs
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| not_found("organization", name))
    }

    fn group(&self, name: &str) -> Result<&BugGroup> {
        self.bugs
            .groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| not_found("project group", name))
    }

    fn series(&self, project: &str, series: &str) -> Option<&SeriesData> {
        self.bugs
            .projects
            .iter()
            .find(|p| p.name == project)
            .and_then(|p| p.series.iter().find(|s| s.name == series))
    }

    fn milestone_mut(&mut self, project: &str, series: &str, name: &str) -> Result<&mut Milestone> {
        self.bugs
            .projects
            .iter_mut()
            .find(|p| p.name == project)
            .and_then(|p| p.series.iter_mut().find(|s| s.name == series))
            .and_then(|s| s.milestones.iter_mut().find(|m| m.name == name))
            .ok_or_else(|| not_found("milestone", &format!("{project}/{series}/{name}")))
    }
}

// ---------------------------------------------------------------------------
// LocalStore
// ---------------------------------------------------------------------------

pub struct LocalStore {
    path: Option<PathBuf>,
    workspace: RefCell<Workspace>,
}

impl LocalStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            workspace: RefCell::new(Workspace::default()),
        }
    }

    /// Open the workspace file at `path`, starting empty when it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let workspace = io::read_yaml(&path)?.unwrap_or_default();
        Ok(Self {
            path: Some(path),
            workspace: RefCell::new(workspace),
        })
    }

    /// Open `<root>/.roadmap/workspace.yaml`.
    pub fn load(root: &Path) -> Result<Self> {
        Self::open(paths::workspace_path(root))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        io::write_yaml(path, &*self.workspace.borrow())
    }

    pub fn workspace(&self) -> Ref<'_, Workspace> {
        self.workspace.borrow()
    }

    fn read<T>(&self, f: impl FnOnce(&Workspace) -> Result<T>) -> Result<T> {
        f(&self.workspace.borrow())
    }

    fn write<T>(&self, f: impl FnOnce(&mut Workspace) -> Result<T>) -> Result<T> {
        let out = {
            let mut workspace = self.workspace.borrow_mut();
            f(&mut workspace)?
        };
        self.save()?;
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Add an empty board, or return the existing one of that name.
    pub fn add_board(&self, name: &str) -> Result<BoardRef> {
        self.write(|ws| {
            if let Some(b) = ws.boards.iter().find(|b| b.name == name) {
                return Ok(BoardRef {
                    id: b.id.clone(),
                    name: b.name.clone(),
                });
            }
            let board = BoardData {
                id: new_id(),
                name: name.to_string(),
                ..BoardData::default()
            };
            let r = BoardRef {
                id: board.id.clone(),
                name: board.name.clone(),
            };
            ws.boards.push(board);
            Ok(r)
        })
    }

    pub fn add_custom_field(&self, board_id: &str, name: &str) -> Result<CustomField> {
        self.write(|ws| {
            let board = ws.board_mut(board_id)?;
            if let Some(f) = board.custom_fields.iter().find(|f| f.name == name) {
                return Ok(f.clone());
            }
            let field = CustomField {
                id: new_id(),
                name: name.to_string(),
            };
            board.custom_fields.push(field.clone());
            Ok(field)
        })
    }

    /// Apply an arbitrary edit to a card, for fixtures that need checklist
    /// items or old activity timestamps.
    pub fn edit_card(&self, card_id: &str, f: impl FnOnce(&mut Card)) -> Result<()> {
        self.write(|ws| {
            f(ws.card_mut(card_id)?);
            Ok(())
        })
    }

    /// Replace (or create) a worksheet's values.
    pub fn put_sheet(&self, sheet: &SheetRef, rows: Vec<Vec<String>>) -> Result<()> {
        self.write(|ws| {
            match ws.sheet_mut(sheet) {
                Ok(data) => data.rows = rows,
                Err(_) => ws.sheets.push(SheetData {
                    key: sheet.key.clone(),
                    worksheet: sheet.worksheet.clone(),
                    rows,
                    formats: Vec::new(),
                }),
            }
            Ok(())
        })
    }

    pub fn sheet_values(&self, sheet: &SheetRef) -> Vec<Vec<String>> {
        self.read(|ws| Ok(ws.sheet(sheet)?.rows.clone()))
            .unwrap_or_default()
    }

    pub fn sheet_formats(&self, sheet: &SheetRef) -> Vec<CellFormat> {
        self.read(|ws| Ok(ws.sheet(sheet)?.formats.clone()))
            .unwrap_or_default()
    }

    pub fn add_org(&self, org: OrgData) -> Result<()> {
        self.write(|ws| {
            ws.orgs.retain(|o| o.name != org.name);
            ws.orgs.push(org);
            Ok(())
        })
    }

    pub fn add_bug_group(&self, group: &str, projects: &[&str]) -> Result<()> {
        self.write(|ws| {
            for &name in projects {
                if !ws.bugs.projects.iter().any(|p| p.name == name) {
                    ws.bugs.projects.push(BugProject {
                        name: name.to_string(),
                        series: Vec::new(),
                    });
                }
            }
            ws.bugs.groups.retain(|g| g.name != group);
            ws.bugs.groups.push(BugGroup {
                name: group.to_string(),
                projects: projects.iter().map(|p| p.to_string()).collect(),
            });
            Ok(())
        })
    }

    pub fn add_series(&self, project: &str, series: &str) -> Result<()> {
        self.write(|ws| {
            let project = ws
                .bugs
                .projects
                .iter_mut()
                .find(|p| p.name == project)
                .ok_or_else(|| not_found("project", project))?;
            if !project.series.iter().any(|s| s.name == series) {
                project.series.push(SeriesData {
                    name: series.to_string(),
                    milestones: Vec::new(),
                });
            }
            Ok(())
        })
    }

    pub fn add_task(&self, task: TaskRecord) -> Result<()> {
        self.write(|ws| {
            ws.bugs.tasks.push(task);
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// KanbanProvider
// ---------------------------------------------------------------------------

impl KanbanProvider for LocalStore {
    fn boards(&self) -> Result<Vec<BoardRef>> {
        self.read(|ws| {
            Ok(ws
                .boards
                .iter()
                .map(|b| BoardRef {
                    id: b.id.clone(),
                    name: b.name.clone(),
                })
                .collect())
        })
    }

    fn lanes(&self, board_id: &str) -> Result<Vec<Lane>> {
        self.read(|ws| {
            let mut lanes: Vec<Lane> = ws
                .board(board_id)?
                .lanes
                .iter()
                .filter(|l| !l.closed)
                .cloned()
                .collect();
            lanes.sort_by(|a, b| a.pos.total_cmp(&b.pos));
            Ok(lanes)
        })
    }

    fn labels(&self, board_id: &str) -> Result<Vec<Label>> {
        self.read(|ws| Ok(ws.board(board_id)?.labels.clone()))
    }

    /// Cards in lane order, then creation order within a lane.
    fn cards(&self, board_id: &str) -> Result<Vec<Card>> {
        self.read(|ws| {
            let board = ws.board(board_id)?;
            let lane_pos = |lane_id: &str| {
                board
                    .lanes
                    .iter()
                    .find(|l| l.id == lane_id)
                    .map(|l| l.pos)
                    .unwrap_or(f64::MAX)
            };
            let mut cards = board.cards.clone();
            cards.sort_by(|a, b| lane_pos(&a.lane_id).total_cmp(&lane_pos(&b.lane_id)));
            Ok(cards)
        })
    }

    fn custom_fields(&self, board_id: &str) -> Result<Vec<CustomField>> {
        self.read(|ws| Ok(ws.board(board_id)?.custom_fields.clone()))
    }

    fn create_card(&self, board_id: &str, lane_id: &str, card: NewCard) -> Result<Card> {
        self.write(|ws| {
            let board = ws.board_mut(board_id)?;
            if !board.lanes.iter().any(|l| l.id == lane_id) {
                return Err(not_found("lane", lane_id));
            }
            let labels = card
                .label_ids
                .iter()
                .map(|id| {
                    board
                        .labels
                        .iter()
                        .find(|l| &l.id == id)
                        .cloned()
                        .ok_or_else(|| not_found("label", id))
                })
                .collect::<Result<Vec<_>>>()?;
            let id = new_id();
            let created = Card {
                url: format!("local://cards/{id}"),
                id,
                name: card.name,
                description: card.description,
                lane_id: lane_id.to_string(),
                closed: false,
                labels,
                checklist: Vec::new(),
                attachments: Vec::new(),
                custom_fields: BTreeMap::new(),
                last_activity: Utc::now(),
            };
            board.cards.push(created.clone());
            Ok(created)
        })
    }

    fn attach_url(&self, card_id: &str, url: &str) -> Result<()> {
        self.write(|ws| {
            ws.card_mut(card_id)?.attachments.push(Attachment {
                url: url.to_string(),
                is_upload: false,
            });
            Ok(())
        })
    }

    fn set_description(&self, card_id: &str, description: &str) -> Result<()> {
        self.write(|ws| {
            ws.card_mut(card_id)?.description = description.to_string();
            Ok(())
        })
    }

    fn set_custom_field(&self, card_id: &str, field: &CustomField, value: &str) -> Result<()> {
        self.write(|ws| {
            ws.card_mut(card_id)?
                .custom_fields
                .insert(field.name.clone(), value.to_string());
            Ok(())
        })
    }

    fn add_label(&self, card_id: &str, label: &Label) -> Result<()> {
        self.write(|ws| {
            let card = ws.card_mut(card_id)?;
            if !card.labels.iter().any(|l| l.id == label.id) {
                card.labels.push(label.clone());
            }
            Ok(())
        })
    }

    fn move_card(&self, card_id: &str, board_id: &str, lane_id: &str) -> Result<()> {
        self.write(|ws| {
            if !ws.board(board_id)?.lanes.iter().any(|l| l.id == lane_id) {
                return Err(not_found("lane", lane_id));
            }
            let source = ws
                .boards
                .iter_mut()
                .find(|b| b.cards.iter().any(|c| c.id == card_id))
                .ok_or_else(|| not_found("card", card_id))?;
            let index = source
                .cards
                .iter()
                .position(|c| c.id == card_id)
                .ok_or_else(|| not_found("card", card_id))?;
            let mut card = source.cards.remove(index);
            card.lane_id = lane_id.to_string();
            ws.board_mut(board_id)?.cards.push(card);
            Ok(())
        })
    }

    fn delete_card(&self, card_id: &str) -> Result<()> {
        self.write(|ws| {
            for board in &mut ws.boards {
                board.cards.retain(|c| c.id != card_id);
            }
            Ok(())
        })
    }

    fn add_lane(&self, board_id: &str, name: &str, pos: Option<f64>) -> Result<Lane> {
        self.write(|ws| {
            let board = ws.board_mut(board_id)?;
            let pos = pos.unwrap_or_else(|| {
                board
                    .lanes
                    .iter()
                    .map(|l| l.pos)
                    .fold(0.0, f64::max)
                    + 1024.0
            });
            let lane = Lane {
                id: new_id(),
                name: name.to_string(),
                pos,
                closed: false,
            };
            board.lanes.push(lane.clone());
            Ok(lane)
        })
    }

    fn add_label_definition(&self, board_id: &str, name: &str, color: &str) -> Result<Label> {
        self.write(|ws| {
            let label = Label {
                id: new_id(),
                name: name.to_string(),
                color: color.to_string(),
            };
            ws.board_mut(board_id)?.labels.push(label.clone());
            Ok(label)
        })
    }
}

// ---------------------------------------------------------------------------
// SheetProvider
// ---------------------------------------------------------------------------

impl SheetProvider for LocalStore {
    fn values(&self, sheet: &SheetRef) -> Result<Vec<Vec<String>>> {
        self.read(|ws| Ok(ws.sheet(sheet)?.rows.clone()))
    }

    fn update_cells(&self, sheet: &SheetRef, updates: &[CellUpdate]) -> Result<()> {
        self.write(|ws| {
            let data = ws.sheet_mut(sheet)?;
            for update in updates {
                if update.row == 0 || update.col == 0 {
                    return Err(RoadmapError::Provider(format!(
                        "invalid cell {}:{}",
                        update.row, update.col
                    )));
                }
                let (r, c) = (update.row - 1, update.col - 1);
                if data.rows.len() <= r {
                    data.rows.resize(r + 1, Vec::new());
                }
                let row = &mut data.rows[r];
                if row.len() <= c {
                    row.resize(c + 1, String::new());
                }
                row[c] = update.value.clone();
            }
            Ok(())
        })
    }

    fn format_cells(&self, sheet: &SheetRef, formats: &[CellFormat]) -> Result<()> {
        self.write(|ws| {
            let data = ws.sheet_mut(sheet)?;
            for format in formats {
                data.formats
                    .retain(|f| !(f.row == format.row && f.col == format.col));
                data.formats.push(format.clone());
            }
            Ok(())
        })
    }

    fn append_row(&self, sheet: &SheetRef, row: Vec<String>) -> Result<()> {
        self.write(|ws| {
            ws.sheet_mut(sheet)?.rows.push(row);
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

static PROJECT_RE: OnceLock<Regex> = OnceLock::new();
static LABELS_RE: OnceLock<Regex> = OnceLock::new();

fn project_re() -> &'static Regex {
    PROJECT_RE.get_or_init(|| Regex::new(r#"project\s*=\s*"?([A-Za-z0-9_-]+)"?"#).unwrap())
}

fn labels_re() -> &'static Regex {
    LABELS_RE.get_or_init(|| Regex::new(r#"labels\s*=\s*"([^"]*)""#).unwrap())
}

/// Understands `project=` and `labels = "..."` clauses; results are
/// always newest first.
impl IssueTracker for LocalStore {
    fn search(&self, jql: &str) -> Result<Vec<Issue>> {
        let project = project_re()
            .captures(jql)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        let label = labels_re()
            .captures(jql)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        self.read(|ws| {
            let mut issues: Vec<Issue> = ws
                .issues
                .iter()
                .filter(|i| project.as_ref().is_none_or(|p| &i.project == p))
                .filter(|i| label.as_ref().is_none_or(|l| i.labels.contains(l)))
                .cloned()
                .collect();
            issues.sort_by(|a, b| b.created.cmp(&a.created));
            Ok(issues)
        })
    }

    fn create_issue(&self, issue: NewIssue) -> Result<Issue> {
        self.write(|ws| {
            let n = ws.issues.iter().filter(|i| i.project == issue.project).count() + 1;
            let key = format!("{}-{n}", issue.project);
            let created = Issue {
                url: format!("local://issues/{key}"),
                key,
                project: issue.project,
                summary: issue.summary,
                description: issue.description,
                issue_type: issue.issue_type,
                status_category: "new".to_string(),
                story_points: None,
                labels: Vec::new(),
                remote_links: Vec::new(),
                comments: Vec::new(),
                created: Utc::now(),
            };
            ws.issues.push(created.clone());
            Ok(created)
        })
    }

    fn update_issue(&self, key: &str, update: IssueUpdate) -> Result<()> {
        self.write(|ws| {
            let issue = ws.issue_mut(key)?;
            if let Some(description) = update.description {
                issue.description = description;
            }
            if let Some(points) = update.story_points {
                issue.story_points = Some(points);
            }
            for label in update.add_labels {
                if !issue.labels.contains(&label) {
                    issue.labels.push(label);
                }
            }
            Ok(())
        })
    }

    fn add_comment(&self, key: &str, body: &str) -> Result<()> {
        self.write(|ws| {
            ws.issue_mut(key)?.comments.push(body.to_string());
            Ok(())
        })
    }

    fn add_remote_link(&self, key: &str, url: &str) -> Result<()> {
        self.write(|ws| {
            let issue = ws.issue_mut(key)?;
            if !issue.remote_links.iter().any(|l| l == url) {
                issue.remote_links.push(url.to_string());
            }
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// RepoHost
// ---------------------------------------------------------------------------

impl RepoHost for LocalStore {
    fn repos(&self, org: &str) -> Result<Vec<Repo>> {
        self.read(|ws| Ok(ws.org(org)?.repos.iter().map(|r| r.repo.clone()).collect()))
    }

    fn team_repos(&self, org: &str, team: &str) -> Result<Vec<Repo>> {
        self.read(|ws| {
            let org_data = ws.org(org)?;
            let team_data = org_data
                .teams
                .iter()
                .find(|t| t.slug == team)
                .ok_or_else(|| not_found("team", team))?;
            Ok(org_data
                .repos
                .iter()
                .filter(|r| team_data.repos.contains(&r.repo.name))
                .map(|r| r.repo.clone())
                .collect())
        })
    }

    fn members(&self, org: &str, team: Option<&str>) -> Result<Vec<String>> {
        self.read(|ws| {
            let org_data = ws.org(org)?;
            match team {
                None => Ok(org_data.members.clone()),
                Some(team) => org_data
                    .teams
                    .iter()
                    .find(|t| t.slug == team)
                    .map(|t| t.members.clone())
                    .ok_or_else(|| not_found("team", team)),
            }
        })
    }

    fn pulls(&self, repo: &Repo) -> Result<Vec<PullRequest>> {
        self.read(|ws| {
            Ok(ws
                .orgs
                .iter()
                .flat_map(|o| o.repos.iter())
                .find(|r| r.repo.full_name == repo.full_name)
                .map(|r| r.pulls.clone())
                .unwrap_or_default())
        })
    }
}

// ---------------------------------------------------------------------------
// BugTracker
// ---------------------------------------------------------------------------

impl BugTracker for LocalStore {
    fn projects(&self, group: &str) -> Result<Vec<String>> {
        self.read(|ws| Ok(ws.group(group)?.projects.clone()))
    }

    fn has_series(&self, project: &str, series: &str) -> Result<bool> {
        self.read(|ws| Ok(ws.series(project, series).is_some()))
    }

    fn milestones(&self, project: &str, series: &str) -> Result<Vec<Milestone>> {
        self.read(|ws| {
            Ok(ws
                .series(project, series)
                .map(|s| s.milestones.clone())
                .unwrap_or_default())
        })
    }

    fn group_milestone(&self, group: &str, name: &str) -> Result<Option<Milestone>> {
        self.read(|ws| {
            let projects = &ws.group(group)?.projects;
            Ok(ws
                .bugs
                .projects
                .iter()
                .filter(|p| projects.contains(&p.name))
                .flat_map(|p| p.series.iter())
                .flat_map(|s| s.milestones.iter())
                .find(|m| m.name == name)
                .cloned())
        })
    }

    fn create_milestone(
        &self,
        project: &str,
        series: &str,
        name: &str,
        date_targeted: Option<NaiveDate>,
    ) -> Result<()> {
        self.write(|ws| {
            let data = ws
                .bugs
                .projects
                .iter_mut()
                .find(|p| p.name == project)
                .and_then(|p| p.series.iter_mut().find(|s| s.name == series))
                .ok_or_else(|| not_found("series", &format!("{project}/{series}")))?;
            data.milestones.push(Milestone {
                name: name.to_string(),
                active: true,
                date_targeted,
                released: None,
            });
            Ok(())
        })
    }

    fn save_milestone(&self, project: &str, series: &str, milestone: &Milestone) -> Result<()> {
        self.write(|ws| {
            let stored = ws.milestone_mut(project, series, &milestone.name)?;
            stored.active = milestone.active;
            stored.date_targeted = milestone.date_targeted;
            Ok(())
        })
    }

    fn release_milestone(
        &self,
        project: &str,
        series: &str,
        name: &str,
        date: NaiveDate,
    ) -> Result<()> {
        self.write(|ws| {
            ws.milestone_mut(project, series, name)?.released = Some(date);
            Ok(())
        })
    }

    fn search_tasks(&self, scope: TaskScope<'_>, query: &TaskQuery) -> Result<Vec<BugTask>> {
        self.read(|ws| {
            let projects: Vec<String> = match scope {
                TaskScope::Project(p) => vec![p.to_string()],
                TaskScope::Group(g) => ws.group(g)?.projects.clone(),
            };
            Ok(ws
                .bugs
                .tasks
                .iter()
                .filter(|t| projects.contains(&t.project))
                .filter(|t| {
                    query
                        .milestone
                        .as_ref()
                        .is_none_or(|m| t.milestone.as_ref() == Some(m))
                })
                .filter(|t| query.statuses.is_empty() || query.statuses.contains(&t.status))
                .filter(|t| {
                    query
                        .subscriber
                        .as_ref()
                        .is_none_or(|s| t.subscribers.contains(s))
                })
                .map(|t| BugTask {
                    bug_id: t.bug_id,
                    project: t.project.clone(),
                    status: t.status.clone(),
                    tags: ws.bugs.tags.get(&t.bug_id).cloned().unwrap_or_default(),
                })
                .collect())
        })
    }

    fn set_status(&self, bug_id: u64, project: &str, status: &str) -> Result<()> {
        self.write(|ws| {
            let task = ws
                .bugs
                .tasks
                .iter_mut()
                .find(|t| t.bug_id == bug_id && t.project == project)
                .ok_or_else(|| not_found("bug task", &format!("{bug_id}/{project}")))?;
            task.status = status.to_string();
            Ok(())
        })
    }

    fn set_tags(&self, bug_id: u64, tags: &[String]) -> Result<()> {
        self.write(|ws| {
            ws.bugs.tags.insert(bug_id, tags.to_vec());
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_persist_to_workspace_file() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::load(dir.path()).unwrap();
        let board = store.add_board("CDK Scrum").unwrap();
        let lane = store.add_lane(&board.id, "Done", None).unwrap();
        store
            .create_card(
                &board.id,
                &lane.id,
                NewCard {
                    name: "Ingress".to_string(),
                    ..NewCard::default()
                },
            )
            .unwrap();

        let reopened = LocalStore::load(dir.path()).unwrap();
        let cards = reopened.cards(&board.id).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name, "Ingress");
        assert!(cards[0].url.starts_with("local://cards/"));
    }

    #[test]
    fn missing_board_is_provider_error() {
        let store = LocalStore::in_memory();
        let err = store.lanes("nope").unwrap_err();
        assert!(matches!(err, RoadmapError::Provider(_)));
        assert!(!err.is_configuration());
    }

    #[test]
    fn lanes_sorted_by_position() {
        let store = LocalStore::in_memory();
        let board = store.add_board("b").unwrap();
        store.add_lane(&board.id, "Done", None).unwrap();
        store.add_lane(&board.id, "1.29", Some(0.5)).unwrap();
        let names: Vec<String> = store
            .lanes(&board.id)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["1.29", "Done"]);
    }

    #[test]
    fn move_card_changes_board() {
        let store = LocalStore::in_memory();
        let from = store.add_board("scrum").unwrap();
        let to = store.add_board("backlog").unwrap();
        let from_lane = store.add_lane(&from.id, "In Progress", None).unwrap();
        let to_lane = store.add_lane(&to.id, "Backlog", None).unwrap();
        let card = store
            .create_card(&from.id, &from_lane.id, NewCard::default())
            .unwrap();
        store.move_card(&card.id, &to.id, &to_lane.id).unwrap();
        assert!(store.cards(&from.id).unwrap().is_empty());
        assert_eq!(store.cards(&to.id).unwrap()[0].lane_id, to_lane.id);
    }

    #[test]
    fn update_cells_grows_grid() {
        let store = LocalStore::in_memory();
        let sheet = SheetRef::new("k", "w");
        store.put_sheet(&sheet, vec![vec!["a".to_string()]]).unwrap();
        store
            .update_cells(&sheet, &[CellUpdate::new(3, 2, "x")])
            .unwrap();
        let rows = store.values(&sheet).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec!["", "x"]);
    }

    #[test]
    fn search_filters_project_and_label() {
        let store = LocalStore::in_memory();
        let a = store
            .create_issue(NewIssue {
                project: "CK".to_string(),
                summary: "a".to_string(),
                ..NewIssue::default()
            })
            .unwrap();
        store
            .create_issue(NewIssue {
                project: "KF".to_string(),
                summary: "b".to_string(),
                ..NewIssue::default()
            })
            .unwrap();
        store
            .update_issue(
                &a.key,
                IssueUpdate {
                    add_labels: vec!["1.29".to_string()],
                    ..IssueUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(store.search("project=CK ORDER BY created DESC").unwrap().len(), 1);
        assert_eq!(
            store
                .search("project=CK AND (labels = \"1.29\") ORDER BY created DESC")
                .unwrap()[0]
                .key,
            "CK-1"
        );
        assert!(store
            .search("project=KF AND (labels = \"1.29\")")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn workspace_yaml_round_trips_fixture() {
        let yaml = r#"
boards:
  - id: b1
    name: CDK Scrum
    lanes:
      - { id: l1, name: "1.29", pos: 1 }
    cards:
      - id: c1
        name: Ingress
        url: local://cards/c1
        lane_id: l1
        last_activity: 2024-03-01T00:00:00Z
orgs:
  - name: charmed
    members: [alice]
    repos:
      - name: charm
        full_name: charmed/charm
        pulls:
          - number: 1
            title: Fix
            url: https://example.com/1
            author: bob
"#;
        let ws: Workspace = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(ws.boards[0].cards[0].lane_id, "l1");
        assert_eq!(ws.orgs[0].repos[0].repo.full_name, "charmed/charm");
        assert_eq!(ws.orgs[0].repos[0].pulls[0].state, "open");
    }
}
