use crate::error::{Result, RoadmapError};
use crate::feature::{Feature, Scope, Upsert};

/// Anything that can enumerate named features and, optionally, receive them.
///
/// Implemented by kanban boards, the roadmap sheet, the feedback sheet and
/// issue-tracker projects. Capabilities a source does not offer return
/// [`RoadmapError::Unsupported`].
pub trait FeatureSource {
    /// Human-readable name used in progress output.
    fn label(&self) -> String;

    /// Features in the source's native order. Every call re-reads the source.
    fn list_features(&mut self, scope: &Scope) -> Result<Vec<Feature>>;

    /// Create `feature` in `target_lane` when no item has its name, otherwise
    /// bring the existing item's description and links up to date.
    fn upsert_feature(&mut self, feature: &Feature, target_lane: &str) -> Result<Upsert> {
        let _ = (feature, target_lane);
        Err(RoadmapError::Unsupported(format!(
            "{} does not accept new features",
            self.label()
        )))
    }

    /// Write a size onto an existing item. Returns `false` when no item has
    /// that name.
    fn write_back_size(&mut self, name: &str, points: u32) -> Result<bool> {
        let _ = (name, points);
        Err(RoadmapError::Unsupported(format!(
            "{} does not store sizes",
            self.label()
        )))
    }

    /// Whether this destination takes `feature` at all (category allow-list).
    fn accepts(&self, feature: &Feature) -> bool {
        let _ = feature;
        true
    }

    /// Recompute aggregated epic sizes. Returns the number of epics written.
    fn recompute_epics(&mut self) -> Result<usize> {
        Ok(0)
    }
}
