use crate::error::{Result, RoadmapError};
use crate::io;
use crate::milestone::{default_sla_statuses, default_sla_subscribers, DEFAULT_TAG, TRUNK};
use crate::paths;
use crate::profile::{default_sizes, BoardKind, BoardProfile};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TeamConfig
// ---------------------------------------------------------------------------

/// Where one team's work lives. Board values are names, or `id:<id>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrum_board: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_board: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlog_board: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizing_board: Option<String>,
    /// Roadmap categories this team's boards accept. Empty accepts all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_categories: Vec<String>,
    /// Worksheet of the feedback sheet holding this team's rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_project: Option<String>,
    /// Scrum lanes whose cards are never exported to the issue tracker.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_lanes: Vec<String>,
}

impl TeamConfig {
    pub fn board(&self, kind: BoardKind) -> Option<&str> {
        match kind {
            BoardKind::Scrum => self.scrum_board.as_deref(),
            BoardKind::Team => self.team_board.as_deref(),
            BoardKind::Backlog => self.backlog_board.as_deref(),
            BoardKind::Sizing => self.sizing_board.as_deref(),
        }
    }

    fn has_any_board(&self) -> bool {
        BoardKind::all().iter().any(|k| self.board(*k).is_some())
    }
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapConfig {
    /// Spreadsheet key.
    pub key: String,
    /// Worksheet (one per organization).
    pub org: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub key: String,
    #[serde(default = "default_title_words")]
    pub title_words: usize,
}

fn default_title_words() -> usize {
    crate::feedback::DEFAULT_TITLE_WORDS
}

// ---------------------------------------------------------------------------
// BoardsConfig
// ---------------------------------------------------------------------------

/// Overrides applied on top of every board kind's built-in profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardsConfig {
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_lane: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_lanes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points_field: Option<String>,
}

impl Default for BoardsConfig {
    fn default() -> Self {
        Self {
            sizes: default_sizes(),
            done_lane: None,
            in_progress_lanes: None,
            story_points_field: None,
        }
    }
}

impl BoardsConfig {
    pub fn profile(&self, kind: BoardKind) -> BoardProfile {
        let mut profile = kind.profile();
        if profile.size_lanes.is_some() {
            profile.size_lanes = Some(self.sizes.clone());
        }
        if let Some(done) = &self.done_lane {
            profile.done_lane = done.clone();
        }
        if let Some(lanes) = &self.in_progress_lanes {
            if kind != BoardKind::Sizing {
                profile.in_progress_lanes = lanes.clone();
            }
        }
        if let Some(field) = &self.story_points_field {
            profile.story_points_field = field.clone();
        }
        profile
    }
}

// ---------------------------------------------------------------------------
// StaleConfig / PullsConfig / BugsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleConfig {
    #[serde(default = "default_label_after_days")]
    pub label_after_days: i64,
    #[serde(default = "default_move_after_days")]
    pub move_after_days: i64,
}

fn default_label_after_days() -> i64 {
    7
}

fn default_move_after_days() -> i64 {
    10
}

impl Default for StaleConfig {
    fn default() -> Self {
        Self {
            label_after_days: default_label_after_days(),
            move_after_days: default_move_after_days(),
        }
    }
}

impl StaleConfig {
    pub fn label_after(&self) -> Duration {
        Duration::days(self.label_after_days)
    }

    pub fn move_after(&self) -> Duration {
        Duration::days(self.move_after_days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullsConfig {
    /// Scrum lane review cards are created in.
    #[serde(default = "default_review_lane")]
    pub lane: String,
}

fn default_review_lane() -> String {
    "In Review".to_string()
}

impl Default for PullsConfig {
    fn default() -> Self {
        Self {
            lane: default_review_lane(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_group: Option<String>,
    #[serde(default = "default_series")]
    pub series: String,
    #[serde(default = "default_backport_tag")]
    pub backport_tag: String,
    #[serde(default = "default_sla_subscribers")]
    pub sla_subscribers: Vec<String>,
    #[serde(default = "default_sla_statuses")]
    pub sla_statuses: Vec<String>,
}

fn default_series() -> String {
    TRUNK.to_string()
}

fn default_backport_tag() -> String {
    DEFAULT_TAG.to_string()
}

impl Default for BugsConfig {
    fn default() -> Self {
        Self {
            project_group: None,
            series: default_series(),
            backport_tag: default_backport_tag(),
            sla_subscribers: default_sla_subscribers(),
            sla_statuses: default_sla_statuses(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub teams: BTreeMap<String, TeamConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roadmap: Option<RoadmapConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackConfig>,
    #[serde(default)]
    pub boards: BoardsConfig,
    #[serde(default)]
    pub stale: StaleConfig,
    #[serde(default)]
    pub pulls: PullsConfig,
    #[serde(default)]
    pub bugs: BugsConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            teams: BTreeMap::new(),
            roadmap: None,
            feedback: None,
            boards: BoardsConfig::default(),
            stale: StaleConfig::default(),
            pulls: PullsConfig::default(),
            bugs: BugsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(RoadmapError::NotInitialized);
        }
        Self::load_file(&path)
    }

    fn load_file(path: &Path) -> Result<Self> {
        io::read_yaml(path)?.ok_or(RoadmapError::NotInitialized)
    }

    /// The project config under `root`, falling back to the user config.
    pub fn discover(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(RoadmapError::NotInitialized) => {}
            other => return other,
        }
        let user = paths::user_config_path()?;
        if user.exists() {
            tracing::debug!(path = %user.display(), "using user config");
            return Self::load_file(&user);
        }
        Err(RoadmapError::NotInitialized)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        io::write_yaml(&path, self)
    }

    pub fn team(&self, name: &str) -> Result<&TeamConfig> {
        self.teams
            .get(name)
            .ok_or_else(|| RoadmapError::TeamNotConfigured(name.to_string()))
    }

    /// The named team, or every team when `name` is `None`.
    pub fn select_teams(&self, name: Option<&str>) -> Result<Vec<(&str, &TeamConfig)>> {
        match name {
            Some(name) => {
                let (key, team) = self
                    .teams
                    .get_key_value(name)
                    .ok_or_else(|| RoadmapError::TeamNotConfigured(name.to_string()))?;
                Ok(vec![(key.as_str(), team)])
            }
            None => Ok(self.teams.iter().map(|(k, v)| (k.as_str(), v)).collect()),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.teams.is_empty() {
            warnings.push(ConfigWarning::warning("no teams configured"));
        }

        for (name, team) in &self.teams {
            if !team.has_any_board() {
                warnings.push(ConfigWarning::warning(format!(
                    "team '{name}' has no boards"
                )));
            }
            if team.github_team.is_some() && team.github_org.is_none() {
                warnings.push(ConfigWarning::error(format!(
                    "team '{name}' sets github_team without github_org"
                )));
            }
            if team.feedback_product.is_some() && self.feedback.is_none() {
                warnings.push(ConfigWarning::warning(format!(
                    "team '{name}' sets feedback_product but no feedback sheet is configured"
                )));
            }
        }

        if let Some(roadmap) = &self.roadmap {
            if roadmap.key.trim().is_empty() {
                warnings.push(ConfigWarning::error("roadmap.key is empty"));
            }
        }

        if self.boards.sizes.is_empty() {
            warnings.push(ConfigWarning::error("boards.sizes is empty"));
        }
        if self.boards.sizes.contains(&0) {
            warnings.push(ConfigWarning::error("boards.sizes contains 0"));
        }

        if self.stale.label_after_days <= 0 || self.stale.move_after_days <= 0 {
            warnings.push(ConfigWarning::error("stale windows must be positive"));
        } else if self.stale.move_after_days < self.stale.label_after_days {
            warnings.push(ConfigWarning::warning(format!(
                "stale.move_after_days ({}) is shorter than label_after_days ({}); \
                 cards will move before they are labeled",
                self.stale.move_after_days, self.stale.label_after_days
            )));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
teams:
  CDK:
    scrum_board: CDK Scrum
    team_board: id:abc123
    sizing_board: CDK Sizing
    product_categories: [Networking, Storage]
    feedback_product: CDK
    jira_project: CK
roadmap:
  key: sheet-key
  org: Kubernetes
feedback:
  key: feedback-key
stale:
  label_after_days: 5
"#;

    #[test]
    fn sample_parses_with_defaults() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.version, 1);
        let team = cfg.team("CDK").unwrap();
        assert_eq!(team.board(BoardKind::Team), Some("id:abc123"));
        assert_eq!(team.board(BoardKind::Backlog), None);
        assert_eq!(cfg.stale.label_after_days, 5);
        assert_eq!(cfg.stale.move_after_days, 10);
        assert_eq!(cfg.pulls.lane, "In Review");
        assert_eq!(cfg.bugs.series, "trunk");
        assert_eq!(cfg.feedback.as_ref().unwrap().title_words, 8);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn unknown_team_is_not_configured() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let err = cfg.team("Kubeflow").unwrap_err();
        assert!(matches!(err, RoadmapError::TeamNotConfigured(_)));
        assert_eq!(cfg.select_teams(None).unwrap().len(), 1);
    }

    #[test]
    fn selected_team_borrows_from_config() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let selected = {
            let wanted = String::from("CDK");
            cfg.select_teams(Some(&wanted)).unwrap()
        };
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, "CDK");
        assert_eq!(selected[0].1.jira_project.as_deref(), Some("CK"));
        assert!(matches!(
            cfg.select_teams(Some("Kubeflow")).unwrap_err(),
            RoadmapError::TeamNotConfigured(_)
        ));
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()).unwrap_err(),
            RoadmapError::NotInitialized
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.teams.insert(
            "CDK".to_string(),
            TeamConfig {
                scrum_board: Some("CDK Scrum".to_string()),
                ..TeamConfig::default()
            },
        );
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.teams, cfg.teams);
        assert_eq!(Config::discover(dir.path()).unwrap().teams, cfg.teams);
    }

    #[test]
    fn profile_overrides_apply() {
        let boards = BoardsConfig {
            sizes: vec![1, 2, 4],
            story_points_field: Some("Story Points".to_string()),
            in_progress_lanes: Some(vec!["Doing".to_string()]),
            ..BoardsConfig::default()
        };
        let sizing = boards.profile(BoardKind::Sizing);
        assert_eq!(sizing.size_lanes, Some(vec![1, 2, 4]));
        assert!(sizing.in_progress_lanes.is_empty());
        let scrum = boards.profile(BoardKind::Scrum);
        assert_eq!(scrum.size_lanes, None);
        assert_eq!(scrum.story_points_field, "Story Points");
        assert_eq!(scrum.in_progress_lanes, vec!["Doing"]);
    }

    #[test]
    fn validate_flags_problems() {
        let mut cfg = Config::default();
        cfg.teams.insert(
            "CDK".to_string(),
            TeamConfig {
                github_team: Some("k8s".to_string()),
                ..TeamConfig::default()
            },
        );
        cfg.boards.sizes = vec![0, 1];
        cfg.stale.move_after_days = 3;

        let warnings = cfg.validate();
        let errors: Vec<&str> = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message.as_str())
            .collect();
        assert!(errors.iter().any(|m| m.contains("github_org")));
        assert!(errors.iter().any(|m| m.contains("contains 0")));
        assert!(warnings.iter().any(|w| w.message.contains("no boards")));
        assert!(warnings.iter().any(|w| w.message.contains("move before")));
    }
}
