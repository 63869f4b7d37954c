//! The product feedback spreadsheet.
//!
//! One worksheet per product, one record per row keyed by the header row.
//! Columns the workflows use: `Title`, `Description`, `Duration` (size),
//! `Resolved` (`TRUE` once done) and `LP` (comma separated bug ids).

use crate::error::{Result, RoadmapError};
use crate::feature::{Feature, Link, Scope, Upsert};
use crate::provider::{CellUpdate, SheetProvider, SheetRef};
use crate::source::FeatureSource;
use crate::types::Size;
use regex::Regex;
use std::sync::OnceLock;

pub const TITLE: &str = "Title";
pub const DESCRIPTION: &str = "Description";
pub const DURATION: &str = "Duration";
pub const RESOLVED: &str = "Resolved";
pub const LP: &str = "LP";

/// Characters of the description used as a name when a row has no title.
const NAME_FROM_DESCRIPTION: usize = 32;
pub const DEFAULT_TITLE_WORDS: usize = 8;
const BUG_URL: &str = "http://pad.lv/";

static BUG_ID_RE: OnceLock<Regex> = OnceLock::new();
static BUG_URL_RE: OnceLock<Regex> = OnceLock::new();

fn bug_id_re() -> &'static Regex {
    BUG_ID_RE.get_or_init(|| Regex::new(r"^\d{7}$").unwrap())
}

fn bug_url_re() -> &'static Regex {
    BUG_URL_RE.get_or_init(|| Regex::new(r"(?:pad\.lv/|/\+bug/)(\d{7})/?$").unwrap())
}

/// Bug ids in an `LP` cell. Anything that is not a 7-digit id is dropped
/// with a warning.
pub fn bug_ids(cell: &str, feature: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|id| {
            let ok = bug_id_re().is_match(id);
            if !ok {
                tracing::warn!(bug = %id, feature, "unrecognized bug id");
            }
            ok
        })
        .map(str::to_string)
        .collect()
}

pub fn bug_url(id: &str) -> String {
    format!("{BUG_URL}{id}")
}

/// The bug id a link points at, for short and long bug URLs.
pub fn bug_id_from_url(url: &str) -> Option<String> {
    bug_url_re()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self {
                header: Vec::new(),
                rows: Vec::new(),
            };
        }
        let header = grid.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
        Self { header, rows: grid }
    }

    fn find(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h == column)
    }

    fn get(&self, row: usize, column: &str) -> &str {
        match (self.rows.get(row), self.find(column)) {
            (Some(values), Some(col)) => values.get(col).map(|v| v.trim()).unwrap_or(""),
            _ => "",
        }
    }

    fn name(&self, row: usize) -> String {
        let title = self.get(row, TITLE);
        if !title.is_empty() {
            return title.to_string();
        }
        self.get(row, DESCRIPTION)
            .chars()
            .take(NAME_FROM_DESCRIPTION)
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Index of the first row named `name`.
    fn position(&self, name: &str) -> Option<usize> {
        (0..self.rows.len()).find(|&i| self.name(i) == name)
    }

    /// 1-based sheet row of record `index` (the header is row 1).
    fn sheet_row(index: usize) -> usize {
        index + 2
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

pub struct Feedback<'a, S: SheetProvider + ?Sized> {
    provider: &'a S,
    sheet: SheetRef,
    product: String,
}

impl<'a, S: SheetProvider + ?Sized> Feedback<'a, S> {
    pub fn new(provider: &'a S, key: impl Into<String>, product: impl Into<String>) -> Self {
        let product = product.into();
        Self {
            provider,
            sheet: SheetRef::new(key, product.clone()),
            product,
        }
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    fn table(&self) -> Result<Table> {
        Ok(Table::from_grid(self.provider.values(&self.sheet)?))
    }

    /// 1-based column of `name`.
    fn column(&self, table: &Table, name: &str) -> Result<usize> {
        table
            .find(name)
            .map(|c| c + 1)
            .ok_or_else(|| RoadmapError::MissingColumn {
                sheet: self.sheet.to_string(),
                column: name.to_string(),
            })
    }

    fn record(&self, table: &Table, row: usize) -> Feature {
        let name = table.name(row);
        let duration = table.get(row, DURATION);
        let size = if duration.is_empty() {
            None
        } else {
            match duration.parse::<Size>() {
                Ok(size) => Some(size),
                Err(_) => {
                    tracing::warn!(feature = %name, duration, "unrecognized duration");
                    None
                }
            }
        };
        let links = bug_ids(table.get(row, LP), &name)
            .iter()
            .map(|id| Link::url(bug_url(id)))
            .collect();

        Feature {
            description: table.get(row, DESCRIPTION).to_string(),
            size,
            links,
            closed: table.get(row, RESOLVED) == "TRUE",
            ..Feature::new(name)
        }
    }

    /// Fill blank titles with the first `words` words of the description.
    /// Returns the number of titles written.
    pub fn add_titles(&mut self, words: usize) -> Result<usize> {
        let table = self.table()?;
        let col = self.column(&table, TITLE)?;
        let updates: Vec<CellUpdate> = (0..table.rows.len())
            .filter(|&i| table.get(i, TITLE).is_empty())
            .filter_map(|i| {
                let title = table
                    .get(i, DESCRIPTION)
                    .split_whitespace()
                    .take(words)
                    .collect::<Vec<_>>()
                    .join(" ");
                (!title.is_empty()).then(|| CellUpdate::new(Table::sheet_row(i), col, title))
            })
            .collect();
        if !updates.is_empty() {
            tracing::info!(sheet = %self.sheet, count = updates.len(), "adding titles");
            self.provider.update_cells(&self.sheet, &updates)?;
        }
        Ok(updates.len())
    }

    /// Write sizes and resolution back from board features. Features not in
    /// the sheet are skipped. Returns the number of rows written.
    pub fn update_features(&mut self, features: &[Feature]) -> Result<usize> {
        let table = self.table()?;
        let size_col = self.column(&table, DURATION)?;
        let resolved_col = self.column(&table, RESOLVED)?;

        let mut updates = Vec::new();
        let mut rows = 0;
        for feature in features {
            let Some(index) = table.position(&feature.name) else {
                tracing::debug!(feature = %feature.name, "not on feedback, skipping");
                continue;
            };
            let row = Table::sheet_row(index);
            if let Some(size) = feature.size {
                updates.push(CellUpdate::new(row, size_col, size.to_string()));
            }
            let resolved = feature.status.is_done() || feature.closed;
            updates.push(CellUpdate::new(
                row,
                resolved_col,
                if resolved { "TRUE" } else { "FALSE" },
            ));
            rows += 1;
        }
        if !updates.is_empty() {
            tracing::info!(sheet = %self.sheet, rows, "updating feedback");
            self.provider.update_cells(&self.sheet, &updates)?;
        }
        Ok(rows)
    }
}

impl<S: SheetProvider + ?Sized> FeatureSource for Feedback<'_, S> {
    fn label(&self) -> String {
        format!("feedback {}", self.sheet)
    }

    fn list_features(&mut self, scope: &Scope) -> Result<Vec<Feature>> {
        let table = self.table()?;
        self.column(&table, TITLE)?;
        Ok((0..table.rows.len())
            .map(|i| self.record(&table, i))
            .filter(|f| !f.name.is_empty())
            .filter(|f| scope.include_closed || !f.closed)
            .collect())
    }

    fn upsert_feature(&mut self, feature: &Feature, _target_lane: &str) -> Result<Upsert> {
        let table = self.table()?;
        let mut wanted: Vec<String> = Vec::new();
        for id in feature.urls().filter_map(bug_id_from_url) {
            if !wanted.contains(&id) {
                wanted.push(id);
            }
        }

        let Some(index) = table.position(&feature.name) else {
            self.column(&table, TITLE)?;
            let row = table
                .header
                .iter()
                .map(|h| match h.as_str() {
                    TITLE => feature.name.clone(),
                    DESCRIPTION => feature.description.clone(),
                    DURATION => feature.size.map(|s| s.to_string()).unwrap_or_default(),
                    LP => wanted.join(","),
                    _ => String::new(),
                })
                .collect();
            tracing::info!(sheet = %self.sheet, feature = %feature.name, "appending feedback row");
            self.provider.append_row(&self.sheet, row)?;
            return Ok(Upsert::Created {
                links_added: wanted.len(),
            });
        };

        let row = Table::sheet_row(index);
        let mut updates = Vec::new();
        let description_changed = !feature.description.is_empty()
            && table.get(index, DESCRIPTION) != feature.description.trim();
        if description_changed {
            let col = self.column(&table, DESCRIPTION)?;
            updates.push(CellUpdate::new(row, col, feature.description.clone()));
        }

        let mut ids = bug_ids(table.get(index, LP), &feature.name);
        let before = ids.len();
        for id in wanted {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        let links_added = ids.len() - before;
        if links_added > 0 {
            let col = self.column(&table, LP)?;
            updates.push(CellUpdate::new(row, col, ids.join(",")));
        }

        if !updates.is_empty() {
            self.provider.update_cells(&self.sheet, &updates)?;
        }
        Ok(Upsert::existing(description_changed, links_added))
    }

    fn write_back_size(&mut self, name: &str, points: u32) -> Result<bool> {
        let table = self.table()?;
        let Some(index) = table.position(name) else {
            tracing::debug!(feature = %name, "not on feedback, skipping size");
            return Ok(false);
        };
        let col = self.column(&table, DURATION)?;
        self.provider.update_cells(
            &self.sheet,
            &[CellUpdate::new(Table::sheet_row(index), col, points.to_string())],
        )?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStore;
    use crate::types::{State, Status};

    fn store() -> LocalStore {
        let store = LocalStore::in_memory();
        let rows: &[&[&str]] = &[
            &["Title", "Description", "Duration", "Resolved", "LP"],
            &["Ingress", "Support ingress controllers", "5", "FALSE", "1234567"],
            &["", "Allow configuring the registry mirror for air-gapped installs", "", "", ""],
            &["Old", "Shipped already", "3", "TRUE", ""],
            &["Bugs", "Several bugs", "", "", "1234567, 12345, lp#7654321,7654321"],
        ];
        let grid = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        store.put_sheet(&SheetRef::new("feedback", "CDK"), grid).unwrap();
        store
    }

    fn sheet() -> SheetRef {
        SheetRef::new("feedback", "CDK")
    }

    #[test]
    fn lp_parsing_keeps_seven_digit_ids() {
        assert_eq!(
            bug_ids("1234567, 12345, lp#7654321,7654321", "x"),
            vec!["1234567", "7654321"]
        );
        assert!(bug_ids("", "x").is_empty());
    }

    #[test]
    fn bug_ids_from_urls() {
        assert_eq!(bug_id_from_url("http://pad.lv/1234567").as_deref(), Some("1234567"));
        assert_eq!(
            bug_id_from_url("https://bugs.launchpad.net/k8s/+bug/7654321").as_deref(),
            Some("7654321")
        );
        assert_eq!(bug_id_from_url("https://github.com/o/r/pull/1"), None);
    }

    #[test]
    fn active_scope_skips_resolved() {
        let store = store();
        let mut feedback = Feedback::new(&store, "feedback", "CDK");
        let names: Vec<String> = feedback
            .list_features(&Scope::active())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(
            names,
            vec!["Ingress", "Allow configuring the registry m", "Bugs"]
        );
        assert_eq!(feedback.list_features(&Scope::all()).unwrap().len(), 4);
    }

    #[test]
    fn records_carry_size_and_bug_links() {
        let store = store();
        let mut feedback = Feedback::new(&store, "feedback", "CDK");
        let features = feedback.list_features(&Scope::active()).unwrap();
        assert_eq!(features[0].size, Some(Size::Points(5)));
        assert_eq!(features[0].links, vec![Link::url("http://pad.lv/1234567")]);
        assert_eq!(features[2].links.len(), 2);
    }

    #[test]
    fn add_titles_fills_only_blank_titles() {
        let store = store();
        let mut feedback = Feedback::new(&store, "feedback", "CDK");
        assert_eq!(feedback.add_titles(4).unwrap(), 1);
        let grid = store.sheet_values(&sheet());
        assert_eq!(grid[2][0], "Allow configuring the registry");
        assert_eq!(grid[1][0], "Ingress");
    }

    #[test]
    fn write_back_size_targets_duration() {
        let store = store();
        let mut feedback = Feedback::new(&store, "feedback", "CDK");
        assert!(feedback.write_back_size("Ingress", 8).unwrap());
        assert!(!feedback.write_back_size("Nope", 8).unwrap());
        assert_eq!(store.sheet_values(&sheet())[1][2], "8");
    }

    #[test]
    fn update_features_marks_done_resolved() {
        let store = store();
        let mut feedback = Feedback::new(&store, "feedback", "CDK");
        let done = Feature::new("Ingress")
            .with_size(Size::Points(13))
            .with_status(Status::new(State::Done));
        let open = Feature::new("Bugs");
        assert_eq!(feedback.update_features(&[done, open]).unwrap(), 2);
        let grid = store.sheet_values(&sheet());
        assert_eq!(grid[1][2], "13");
        assert_eq!(grid[1][3], "TRUE");
        assert_eq!(grid[4][3], "FALSE");
    }

    #[test]
    fn upsert_appends_then_updates() {
        let store = store();
        let mut feedback = Feedback::new(&store, "feedback", "CDK");
        let feature = Feature::new("Gateway")
            .with_description("Gateway API support")
            .with_link(Link::url("http://pad.lv/2222222"));
        assert!(feedback.upsert_feature(&feature, "").unwrap().is_created());
        assert_eq!(
            feedback.upsert_feature(&feature, "").unwrap(),
            Upsert::Unchanged
        );

        let more = feature.with_link(Link::url("http://pad.lv/3333333"));
        assert_eq!(
            feedback.upsert_feature(&more, "").unwrap(),
            Upsert::Updated {
                description_changed: false,
                links_added: 1
            }
        );
        let grid = store.sheet_values(&sheet());
        assert_eq!(grid[5][4], "2222222,3333333");
    }

    #[test]
    fn appended_row_lists_each_bug_once() {
        let store = store();
        let mut feedback = Feedback::new(&store, "feedback", "CDK");
        let feature = Feature::new("Gateway")
            .with_link(Link::url("http://pad.lv/2222222"))
            .with_link(Link::url("https://bugs.launchpad.net/k8s/+bug/2222222"));
        assert_eq!(
            feedback.upsert_feature(&feature, "").unwrap(),
            Upsert::Created { links_added: 1 }
        );
        assert_eq!(store.sheet_values(&sheet())[5][4], "2222222");
    }

    #[test]
    fn missing_column_is_configuration_error() {
        let store = LocalStore::in_memory();
        store.put_sheet(
            &sheet(),
            vec![vec!["Title".to_string(), "Description".to_string()]],
        )
        .unwrap();
        let mut feedback = Feedback::new(&store, "feedback", "CDK");
        let err = feedback.update_features(&[]).unwrap_err();
        assert!(err.is_configuration());
    }
}
