use crate::types::{Size, Status};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// A cross-link from a feature: either a direct URL or the name of another
/// feature in the same source, resolved lazily by the destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    Url(String),
    Named(String),
}

impl Link {
    pub fn url(url: impl Into<String>) -> Self {
        Link::Url(url.into())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Link::Named(name.into())
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            Link::Url(u) => Some(u),
            Link::Named(_) => None,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Url(u) => f.write_str(u),
            Link::Named(n) => write!(f, "@{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Feature
// ---------------------------------------------------------------------------

/// A named unit of work as seen by one source.
///
/// Features are projections built fresh from a source on every query. Two
/// features in different systems are the same feature when their names
/// match exactly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default)]
    pub closed: bool,
    /// Roadmap product category, used by destination allow-lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Size in points, when defined and non-zero.
    pub fn points(&self) -> Option<u32> {
        self.size.and_then(Size::points)
    }

    pub fn is_epic(&self) -> bool {
        self.size == Some(Size::Epic)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.links.iter().filter_map(Link::as_url)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.team, &self.release) {
            (Some(team), Some(release)) => write!(f, "{team}:{release}:{}", self.name),
            (None, Some(release)) => write!(f, "{release}:{}", self.name),
            _ => f.write_str(&self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Filter applied when listing features from a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Only features marked for this release.
    pub release: Option<String>,
    /// Include closed/archived/resolved items.
    pub include_closed: bool,
}

impl Scope {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            release: None,
            include_closed: true,
        }
    }

    pub fn release(release: impl Into<String>) -> Self {
        Self {
            release: Some(release.into()),
            include_closed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Upsert
// ---------------------------------------------------------------------------

/// Outcome of writing one feature into a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Upsert {
    Created {
        links_added: usize,
    },
    Updated {
        description_changed: bool,
        links_added: usize,
    },
    Unchanged,
}

impl Upsert {
    pub fn is_created(&self) -> bool {
        matches!(self, Upsert::Created { .. })
    }

    /// Builds the outcome for an existing item.
    pub fn existing(description_changed: bool, links_added: usize) -> Self {
        if description_changed || links_added > 0 {
            Upsert::Updated {
                description_changed,
                links_added,
            }
        } else {
            Upsert::Unchanged
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, State};

    #[test]
    fn points_ignores_epic_and_zero() {
        assert_eq!(Feature::new("a").points(), None);
        assert_eq!(Feature::new("a").with_size(Size::Epic).points(), None);
        assert_eq!(Feature::new("a").with_size(Size::Points(0)).points(), None);
        assert_eq!(Feature::new("a").with_size(Size::Points(3)).points(), Some(3));
    }

    #[test]
    fn urls_skip_named_links() {
        let f = Feature::new("a")
            .with_link(Link::url("https://bugs/1"))
            .with_link(Link::named("Sub"))
            .with_link(Link::url("https://bugs/2"));
        let urls: Vec<&str> = f.urls().collect();
        assert_eq!(urls, vec!["https://bugs/1", "https://bugs/2"]);
    }

    #[test]
    fn display_includes_team_and_release() {
        let mut f = Feature::new("Ingress").with_release("1.29");
        assert_eq!(f.to_string(), "1.29:Ingress");
        f.team = Some("CDK".to_string());
        assert_eq!(f.to_string(), "CDK:1.29:Ingress");
    }

    #[test]
    fn feature_yaml_uses_defaults() {
        let yaml = "name: Ingress\n";
        let f: Feature = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(f.name, "Ingress");
        assert_eq!(f.status.state, State::NotStarted);
        assert_eq!(f.status.color, Color::White);
        assert!(f.links.is_empty());
        assert!(!f.closed);
    }

    #[test]
    fn upsert_existing_without_changes_is_unchanged() {
        assert_eq!(Upsert::existing(false, 0), Upsert::Unchanged);
        assert_eq!(
            Upsert::existing(false, 1),
            Upsert::Updated {
                description_changed: false,
                links_added: 1
            }
        );
    }
}
