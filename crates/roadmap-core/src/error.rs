use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoadmapError {
    #[error("not initialized: run 'roadmap init'")]
    NotInitialized,

    #[error("team not configured: {0}")]
    TeamNotConfigured(String),

    #[error("board not found: {0}")]
    BoardNotFound(String),

    #[error("lane '{lane}' not found on board '{board}'")]
    LaneNotFound { board: String, lane: String },

    #[error("label '{name}' ({color}) not found on board '{board}'")]
    LabelNotFound {
        board: String,
        name: String,
        color: String,
    },

    #[error("custom field '{field}' not found on board '{board}'")]
    CustomFieldNotFound { board: String, field: String },

    #[error("sheet '{sheet}' has no '{column}' column")]
    MissingColumn { sheet: String, column: String },

    #[error("release '{release}' not found in sheet '{sheet}'")]
    ReleaseNotFound { sheet: String, release: String },

    #[error("feature '{name}' belongs to release '{found}', expected '{expected}'")]
    ReleaseMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("milestone not found: {0}")]
    MilestoneNotFound(String),

    #[error("invalid size '{0}': must be a positive number or 'epic'")]
    InvalidSize(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl RoadmapError {
    /// True for errors that indicate a destination was never set up for this
    /// workflow, as opposed to a failed remote call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RoadmapError::NotInitialized
                | RoadmapError::TeamNotConfigured(_)
                | RoadmapError::BoardNotFound(_)
                | RoadmapError::LaneNotFound { .. }
                | RoadmapError::LabelNotFound { .. }
                | RoadmapError::CustomFieldNotFound { .. }
                | RoadmapError::MissingColumn { .. }
                | RoadmapError::ReleaseNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RoadmapError>;
