use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::NotStarted => "not_started",
            State::InProgress => "in_progress",
            State::Done => "done",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for State {
    type Err = crate::error::RoadmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(State::NotStarted),
            "in_progress" => Ok(State::InProgress),
            "done" => Ok(State::Done),
            _ => Err(crate::error::RoadmapError::InvalidState(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Label colours that carry meaning on a release label.
///
/// `White` is the neutral default and is never a label colour itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    White,
    /// Planned for the release.
    Green,
    /// Unplanned or stretch work picked up during the release.
    Blue,
    /// At risk.
    Orange,
    /// Missed the release.
    Red,
    /// Dropped from the release.
    Black,
}

impl Color {
    /// Colours a release label may carry, in creation order.
    pub fn release_colors() -> &'static [Color] {
        &[
            Color::Green,
            Color::Blue,
            Color::Orange,
            Color::Red,
            Color::Black,
        ]
    }

    /// Colours that override the progress colour on the roadmap.
    pub fn is_override(self) -> bool {
        matches!(self, Color::Orange | Color::Red | Color::Black)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Orange => "orange",
            Color::Red => "red",
            Color::Black => "black",
        }
    }

    /// Cell background used by the roadmap sheet.
    pub fn hex(self) -> &'static str {
        match self {
            Color::White => "#ffffff",
            Color::Green => "#6aa84f",
            Color::Blue => "#3d85c6",
            Color::Orange => "#e69138",
            Color::Red => "#cc0000",
            Color::Black => "#000000",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Color {
    type Err = crate::error::RoadmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "white" => Ok(Color::White),
            "green" => Ok(Color::Green),
            "blue" => Ok(Color::Blue),
            "orange" => Ok(Color::Orange),
            "red" => Ok(Color::Red),
            "black" => Ok(Color::Black),
            _ => Err(crate::error::RoadmapError::InvalidColor(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Progress state of a feature plus the release annotation colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    pub state: State,
    #[serde(default)]
    pub color: Color,
}

impl Status {
    pub fn new(state: State) -> Self {
        Self {
            state,
            color: Color::White,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn is_started(&self) -> bool {
        self.state != State::NotStarted
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.state, self.color)
    }
}

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

/// Effort estimate. `Epic` marks an aggregate whose size is derived from
/// linked sub-features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    Points(u32),
    Epic,
}

impl Size {
    pub fn points(self) -> Option<u32> {
        match self {
            Size::Points(n) if n > 0 => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Points(n) => write!(f, "{n}"),
            Size::Epic => f.write_str("epic"),
        }
    }
}

impl std::str::FromStr for Size {
    type Err = crate::error::RoadmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("epic") {
            return Ok(Size::Epic);
        }
        match trimmed.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Size::Points(n)),
            _ => Err(crate::error::RoadmapError::InvalidSize(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parse_is_case_insensitive() {
        assert_eq!("Orange".parse::<Color>().unwrap(), Color::Orange);
        assert_eq!(" red ".parse::<Color>().unwrap(), Color::Red);
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn override_colors() {
        assert!(Color::Red.is_override());
        assert!(Color::Black.is_override());
        assert!(Color::Orange.is_override());
        assert!(!Color::Green.is_override());
        assert!(!Color::Blue.is_override());
    }

    #[test]
    fn status_defaults_to_not_started_white() {
        let status = Status::default();
        assert_eq!(status.state, State::NotStarted);
        assert_eq!(status.color, Color::White);
        assert!(!status.is_started());
        assert_eq!(status.to_string(), "not_started:white");
    }

    #[test]
    fn size_parsing() {
        assert_eq!("5".parse::<Size>().unwrap(), Size::Points(5));
        assert_eq!("Epic".parse::<Size>().unwrap(), Size::Epic);
        assert!("0".parse::<Size>().is_err());
        assert!("-3".parse::<Size>().is_err());
        assert!("big".parse::<Size>().is_err());
    }

    #[test]
    fn zero_points_has_no_points() {
        assert_eq!(Size::Points(0).points(), None);
        assert_eq!(Size::Epic.points(), None);
        assert_eq!(Size::Points(8).points(), Some(8));
    }
}
