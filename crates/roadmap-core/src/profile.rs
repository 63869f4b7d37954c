//! Declarative lane/label tables per board kind.
//!
//! Every board in the workflow is the same [`crate::board::Board`] type; what
//! differs between a scrum board and a sizing board is only the table
//! returned by [`BoardKind::profile`].

use crate::types::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNSIZED_LANE: &str = "Unsized";
pub const EPIC_LANE: &str = "Epic";
pub const BACKLOG_LANE: &str = "Backlog";

// ---------------------------------------------------------------------------
// BoardKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    /// Release execution board: one backlog lane per release plus work lanes.
    Scrum,
    /// Long-lived team feature board.
    Team,
    /// Where inactive cards are parked.
    Backlog,
    /// Estimation board whose lanes encode size.
    Sizing,
}

impl BoardKind {
    pub fn all() -> &'static [BoardKind] {
        &[
            BoardKind::Scrum,
            BoardKind::Team,
            BoardKind::Backlog,
            BoardKind::Sizing,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BoardKind::Scrum => "scrum",
            BoardKind::Team => "team",
            BoardKind::Backlog => "backlog",
            BoardKind::Sizing => "sizing",
        }
    }

    pub fn profile(self) -> BoardProfile {
        let base = BoardProfile::default();
        match self {
            BoardKind::Scrum => BoardProfile {
                tags_release: true,
                stale_label: Some(StaleLabel::default()),
                required_lanes: vec![
                    "In Progress".to_string(),
                    "In Review".to_string(),
                    "Blocked".to_string(),
                    "Done".to_string(),
                ],
                ..base
            },
            BoardKind::Team => base,
            BoardKind::Backlog => BoardProfile {
                required_lanes: vec![BACKLOG_LANE.to_string()],
                ..base
            },
            BoardKind::Sizing => BoardProfile {
                in_progress_lanes: Vec::new(),
                size_lanes: Some(default_sizes()),
                ..base
            },
        }
    }
}

impl fmt::Display for BoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BoardKind {
    type Err = crate::error::RoadmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scrum" => Ok(BoardKind::Scrum),
            "team" => Ok(BoardKind::Team),
            "backlog" => Ok(BoardKind::Backlog),
            "sizing" => Ok(BoardKind::Sizing),
            _ => Err(crate::error::RoadmapError::Unsupported(format!(
                "unknown board kind '{s}'"
            ))),
        }
    }
}

pub fn default_sizes() -> Vec<u32> {
    vec![1, 2, 3, 5, 8, 13, 21]
}

// ---------------------------------------------------------------------------
// BoardProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleLabel {
    pub name: String,
    pub color: String,
}

impl Default for StaleLabel {
    fn default() -> Self {
        Self {
            name: "Stale".to_string(),
            color: "purple".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardProfile {
    /// Cards in a lane whose name starts with this (case-insensitive) are done.
    pub done_lane: String,
    /// Lanes that mean work has started.
    pub in_progress_lanes: Vec<String>,
    /// Colours of the per-release label set.
    pub release_colors: Vec<Color>,
    pub story_points_field: String,
    pub epic_label: String,
    /// When set, cards are filed into `Size n` lanes plus `Unsized`/`Epic`.
    pub size_lanes: Option<Vec<u32>>,
    /// New cards get the planned release label of their feature.
    pub tags_release: bool,
    pub stale_label: Option<StaleLabel>,
    /// Lanes `setup_board` guarantees, in order.
    pub required_lanes: Vec<String>,
}

impl Default for BoardProfile {
    fn default() -> Self {
        Self {
            done_lane: "Done".to_string(),
            in_progress_lanes: vec![
                "In Progress".to_string(),
                "In Review".to_string(),
                "Blocked".to_string(),
            ],
            release_colors: Color::release_colors().to_vec(),
            story_points_field: "sp".to_string(),
            epic_label: "Epic".to_string(),
            size_lanes: None,
            tags_release: false,
            stale_label: None,
            required_lanes: Vec::new(),
        }
    }
}

impl BoardProfile {
    pub fn is_done_lane(&self, lane: &str) -> bool {
        lane.to_lowercase()
            .starts_with(&self.done_lane.to_lowercase())
    }

    pub fn is_in_progress_lane(&self, lane: &str) -> bool {
        self.in_progress_lanes
            .iter()
            .any(|l| l.eq_ignore_ascii_case(lane))
    }

    /// The lane a new card with `size` belongs in on a sizing board.
    pub fn lane_for_size(&self, points: Option<u32>, epic: bool) -> Option<String> {
        let sizes = self.size_lanes.as_ref()?;
        if epic {
            return Some(EPIC_LANE.to_string());
        }
        match points {
            Some(n) if sizes.contains(&n) => Some(size_lane(n)),
            Some(_) => Some(EPIC_LANE.to_string()),
            None => None,
        }
    }

    /// Every lane a sizing board needs, in display order.
    pub fn sizing_lanes(&self) -> Vec<String> {
        let Some(sizes) = &self.size_lanes else {
            return Vec::new();
        };
        let mut lanes = vec![UNSIZED_LANE.to_string()];
        lanes.extend(sizes.iter().map(|&n| size_lane(n)));
        lanes.push(EPIC_LANE.to_string());
        lanes
    }
}

pub fn size_lane(points: u32) -> String {
    format!("Size {points}")
}

/// Parse the size encoded in a sizing lane name (`Size 5` → 5).
pub fn parse_size_lane(lane: &str) -> Option<u32> {
    lane.strip_prefix("Size")?.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
