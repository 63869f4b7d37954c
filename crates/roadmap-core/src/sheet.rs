//! The product roadmap spreadsheet.
//!
//! One worksheet per organization. Column 0 holds release labels and every
//! other column belongs to a team. A release's rows run from its label down
//! to the next non-blank label. Inside a team's column a non-blank cell after
//! a blank starts a category, the cells below it are that category's
//! features, and a blank cell ends the category. Each team column is
//! preceded by a status column the roll-up writes into.

use crate::error::{Result, RoadmapError};
use crate::feature::{Feature, Scope};
use crate::provider::{CellFormat, CellUpdate, SheetProvider, SheetRef};
use crate::source::FeatureSource;
use crate::types::{Color, Status};
use std::collections::HashMap;

/// Value written into the status cell of a completed feature.
pub const COMPLETE_MARK: &str = "C";

/// Background for a feature's status cell. Override colours always show;
/// other colours show once work has started.
pub fn status_color(status: &Status) -> Color {
    if status.color.is_override() || status.is_started() {
        status.color
    } else {
        Color::White
    }
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// A feature cell located in the grid. `row` is 0-based over the full grid,
/// header included.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    row: usize,
    name: String,
    category: String,
}

pub struct Roadmap<'a, S: SheetProvider + ?Sized> {
    provider: &'a S,
    sheet: SheetRef,
    team: String,
    release: String,
}

impl<'a, S: SheetProvider + ?Sized> Roadmap<'a, S> {
    pub fn new(
        provider: &'a S,
        sheet: SheetRef,
        team: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            sheet,
            team: team.into(),
            release: release.into(),
        }
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    fn team_column(&self, grid: &[Vec<String>]) -> Result<usize> {
        grid.first()
            .and_then(|header| header.iter().skip(1).position(|h| h.trim() == self.team))
            .map(|i| i + 1)
            .ok_or_else(|| RoadmapError::MissingColumn {
                sheet: self.sheet.to_string(),
                column: self.team.clone(),
            })
    }

    /// Rows `[start, end)` belonging to `release`.
    fn release_rows(&self, grid: &[Vec<String>], release: &str) -> Result<(usize, usize)> {
        let start = grid
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| cell(row, 0).trim() == release)
            .map(|(i, _)| i)
            .ok_or_else(|| RoadmapError::ReleaseNotFound {
                sheet: self.sheet.to_string(),
                release: release.to_string(),
            })?;
        let end = (start + 1..grid.len())
            .find(|&i| !cell(&grid[i], 0).trim().is_empty())
            .unwrap_or(grid.len());
        Ok((start, end))
    }

    fn entries(&self, grid: &[Vec<String>], release: &str) -> Result<Vec<Entry>> {
        let col = self.team_column(grid)?;
        let (start, end) = self.release_rows(grid, release)?;

        let mut category: Option<String> = None;
        let mut entries = Vec::new();
        for (row, values) in grid.iter().enumerate().take(end).skip(start) {
            let value = cell(values, col).trim();
            match &category {
                None if value.is_empty() => {}
                None => category = Some(value.to_string()),
                Some(_) if value.is_empty() => category = None,
                Some(current) => entries.push(Entry {
                    row,
                    name: value.to_string(),
                    category: current.clone(),
                }),
            }
        }
        Ok(entries)
    }

    /// Write the status of each feature into its cell: `C` once done, and a
    /// background colour per [`status_color`]. Returns the number of cells
    /// written.
    pub fn update_status(&mut self, features: &[Feature]) -> Result<usize> {
        let grid = self.provider.values(&self.sheet)?;
        let col = self.team_column(&grid)?;
        let mut rows: HashMap<String, usize> = HashMap::new();
        for entry in self.entries(&grid, &self.release)? {
            rows.entry(entry.name).or_insert(entry.row);
        }

        let mut values = Vec::new();
        let mut formats = Vec::new();
        for feature in features {
            if feature.release.as_deref() != Some(self.release.as_str()) {
                return Err(RoadmapError::ReleaseMismatch {
                    name: feature.name.clone(),
                    expected: self.release.clone(),
                    found: feature.release.clone().unwrap_or_default(),
                });
            }
            let Some(&row) = rows.get(&feature.name) else {
                tracing::debug!(feature = %feature.name, "not on the roadmap, skipping");
                continue;
            };
            // 1-based; the status cell sits left of the team's column.
            let (row, col) = (row + 1, col);
            let mark = if feature.status.is_done() { COMPLETE_MARK } else { "" };
            tracing::debug!(feature = %feature, cell = %crate::provider::a1(row, col), status = %feature.status, "roadmap status");
            values.push(CellUpdate::new(row, col, mark));
            formats.push(CellFormat {
                row,
                col,
                background: status_color(&feature.status).hex().to_string(),
                foreground: Color::White.hex().to_string(),
                bold: true,
                centered: true,
            });
        }

        if !values.is_empty() {
            self.provider.update_cells(&self.sheet, &values)?;
            self.provider.format_cells(&self.sheet, &formats)?;
        }
        Ok(values.len())
    }
}

impl<S: SheetProvider + ?Sized> FeatureSource for Roadmap<'_, S> {
    fn label(&self) -> String {
        format!("roadmap {} ({})", self.sheet, self.team)
    }

    fn list_features(&mut self, scope: &Scope) -> Result<Vec<Feature>> {
        let release = scope.release.as_deref().unwrap_or(&self.release);
        let grid = self.provider.values(&self.sheet)?;
        Ok(self
            .entries(&grid, release)?
            .into_iter()
            .map(|e| Feature {
                name: e.name,
                category: Some(e.category),
                release: Some(release.to_string()),
                team: Some(self.team.clone()),
                ..Feature::default()
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStore;
    use crate::types::State;

    fn grid() -> Vec<Vec<String>> {
        let rows: &[&[&str]] = &[
            &["", "", "CDK", "", "MicroK8s"],
            &["1.28", "", "", "", ""],
            &["", "", "Networking", "", "Core"],
            &["", "", "Old thing", "", "Snap"],
            &["1.29", "", "", "", ""],
            &["", "", "Networking", "", "Core"],
            &["", "", "Ingress", "", "Strict"],
            &["", "", "Gateway API", "", ""],
            &["", "", "", "", ""],
            &["", "", "Storage", "", ""],
            &["", "", "CSI", "", ""],
            &["1.30", "", "", "", ""],
            &["", "", "Networking", "", ""],
            &["", "", "Mesh", "", ""],
        ];
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn store() -> (LocalStore, SheetRef) {
        let store = LocalStore::in_memory();
        let sheet = SheetRef::new("roadmap", "Kubernetes");
        store.put_sheet(&sheet, grid()).unwrap();
        (store, sheet)
    }

    #[test]
    fn parses_categories_until_next_release() {
        let (store, sheet) = store();
        let mut roadmap = Roadmap::new(&store, sheet, "CDK", "1.29");
        let features = roadmap.list_features(&Scope::active()).unwrap();
        let names: Vec<(&str, Option<&str>)> = features
            .iter()
            .map(|f| (f.name.as_str(), f.category.as_deref()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Ingress", Some("Networking")),
                ("Gateway API", Some("Networking")),
                ("CSI", Some("Storage")),
            ]
        );
        assert!(features.iter().all(|f| f.release.as_deref() == Some("1.29")));
        assert!(features.iter().all(|f| f.team.as_deref() == Some("CDK")));
    }

    #[test]
    fn last_release_runs_to_end_of_sheet() {
        let (store, sheet) = store();
        let mut roadmap = Roadmap::new(&store, sheet, "CDK", "1.30");
        let features = roadmap.list_features(&Scope::active()).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name, "Mesh");
    }

    #[test]
    fn unknown_team_is_missing_column() {
        let (store, sheet) = store();
        let mut roadmap = Roadmap::new(&store, sheet, "Kubeflow", "1.29");
        let err = roadmap.list_features(&Scope::active()).unwrap_err();
        assert!(matches!(err, RoadmapError::MissingColumn { .. }));
    }

    #[test]
    fn unknown_release_is_reported() {
        let (store, sheet) = store();
        let mut roadmap = Roadmap::new(&store, sheet, "CDK", "2.0");
        let err = roadmap.list_features(&Scope::active()).unwrap_err();
        assert!(matches!(err, RoadmapError::ReleaseNotFound { .. }));
    }

    #[test]
    fn update_status_marks_done_and_colors() {
        let (store, sheet) = store();
        let mut roadmap = Roadmap::new(&store, sheet.clone(), "CDK", "1.29");
        let done = Feature::new("Ingress")
            .with_release("1.29")
            .with_status(Status::new(State::Done).with_color(Color::Green));
        let pending = Feature::new("CSI")
            .with_release("1.29")
            .with_status(Status::new(State::NotStarted).with_color(Color::Blue));
        let unknown = Feature::new("Not on sheet").with_release("1.29");

        let written = roadmap.update_status(&[done, pending, unknown]).unwrap();
        assert_eq!(written, 2);

        let grid = store.sheet_values(&sheet);
        assert_eq!(grid[6][1], "C");
        assert_eq!(grid[6][2], "Ingress");
        assert_eq!(grid[10][1], "");
        let formats = store.sheet_formats(&sheet);
        let ingress = formats.iter().find(|f| f.row == 7 && f.col == 2).unwrap();
        assert_eq!(ingress.background, "#6aa84f");
        assert!(ingress.bold);
        let csi = formats.iter().find(|f| f.row == 11 && f.col == 2).unwrap();
        assert_eq!(csi.background, "#ffffff");
    }

    #[test]
    fn update_status_rejects_other_release() {
        let (store, sheet) = store();
        let mut roadmap = Roadmap::new(&store, sheet, "CDK", "1.29");
        let err = roadmap
            .update_status(&[Feature::new("Mesh").with_release("1.30")])
            .unwrap_err();
        assert!(matches!(err, RoadmapError::ReleaseMismatch { .. }));
    }

    #[test]
    fn override_colors_show_before_start() {
        let red = Status::new(State::NotStarted).with_color(Color::Red);
        assert_eq!(status_color(&red), Color::Red);
        let blue = Status::new(State::NotStarted).with_color(Color::Blue);
        assert_eq!(status_color(&blue), Color::White);
        let started = Status::new(State::InProgress).with_color(Color::Blue);
        assert_eq!(status_color(&started), Color::Blue);
    }

    #[test]
    fn roadmap_does_not_accept_writes() {
        let (store, sheet) = store();
        let mut roadmap = Roadmap::new(&store, sheet, "CDK", "1.29");
        let err = roadmap.write_back_size("Ingress", 3).unwrap_err();
        assert!(matches!(err, RoadmapError::Unsupported(_)));
    }
}
