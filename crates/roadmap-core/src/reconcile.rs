//! The reconciliation passes every workflow is built from.
//!
//! Each pass reads features from one side and writes them into another. No
//! state is kept between runs: a pass re-derives everything from the current
//! contents of its sources, and every write it makes is idempotent, so a run
//! that failed partway can simply be repeated.

use crate::board::{Board, TagOutcome};
use crate::error::Result;
use crate::feature::{Feature, Scope, Upsert};
use crate::provider::{KanbanProvider, SheetProvider};
use crate::sheet::Roadmap;
use crate::source::FeatureSource;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// sync_new_items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub destination: String,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    /// Finished work is never backfilled into a planning destination.
    pub skipped_done: Vec<String>,
    /// Features outside the destination's category allow-list.
    pub skipped_category: Vec<String>,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} created, {} updated, {} unchanged, {} skipped",
            self.destination,
            self.created.len(),
            self.updated.len(),
            self.unchanged.len(),
            self.skipped_done.len() + self.skipped_category.len()
        )
    }
}

/// Upsert every feature of `features` into `destination`, filing new items
/// into `target_lane`.
pub fn sync_new_items<D: FeatureSource + ?Sized>(
    features: &[Feature],
    destination: &mut D,
    target_lane: &str,
) -> Result<SyncReport> {
    let mut report = SyncReport {
        destination: destination.label(),
        ..SyncReport::default()
    };
    for feature in features {
        if feature.status.is_done() {
            tracing::debug!(feature = %feature, "done, skipping");
            report.skipped_done.push(feature.name.clone());
            continue;
        }
        if !destination.accepts(feature) {
            tracing::debug!(feature = %feature, destination = %report.destination, "category not accepted, skipping");
            report.skipped_category.push(feature.name.clone());
            continue;
        }
        match destination.upsert_feature(feature, target_lane)? {
            Upsert::Created { .. } => report.created.push(feature.name.clone()),
            Upsert::Updated { .. } => report.updated.push(feature.name.clone()),
            Upsert::Unchanged => report.unchanged.push(feature.name.clone()),
        }
    }
    tracing::info!(destination = %report.destination, created = report.created.len(), updated = report.updated.len(), "sync complete");
    Ok(report)
}

// ---------------------------------------------------------------------------
// propagate_sizes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub destination: String,
    pub written: Vec<String>,
    /// Sized features with no item of that name in the destination.
    pub missing: Vec<String>,
    pub epics_recomputed: usize,
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} sized, {} not found, {} epics recomputed",
            self.destination,
            self.written.len(),
            self.missing.len(),
            self.epics_recomputed
        )
    }
}

/// Write the size of every feature with a defined, non-zero size into each
/// destination, then let each destination recompute its epics.
pub fn propagate_sizes(
    sized: &[Feature],
    destinations: &mut [&mut dyn FeatureSource],
) -> Result<Vec<SizeReport>> {
    let mut reports = Vec::with_capacity(destinations.len());
    for destination in destinations.iter_mut() {
        let mut report = SizeReport {
            destination: destination.label(),
            ..SizeReport::default()
        };
        for feature in sized {
            let Some(points) = feature.points() else {
                continue;
            };
            if destination.write_back_size(&feature.name, points)? {
                report.written.push(feature.name.clone());
            } else {
                report.missing.push(feature.name.clone());
            }
        }
        report.epics_recomputed = destination.recompute_epics()?;
        tracing::info!(destination = %report.destination, written = report.written.len(), epics = report.epics_recomputed, "sizes propagated");
        reports.push(report);
    }
    Ok(reports)
}

// ---------------------------------------------------------------------------
// tag_release
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagReport {
    pub release: String,
    pub tagged: Vec<String>,
    pub already_tagged: Vec<String>,
    pub missing: Vec<String>,
}

/// Make sure every feature already on `board` carries the planned label of
/// `release`. Labels are only ever added.
pub fn tag_release<K: KanbanProvider + ?Sized>(
    features: &[Feature],
    board: &mut Board<'_, K>,
    release: &str,
) -> Result<TagReport> {
    let mut report = TagReport {
        release: release.to_string(),
        ..TagReport::default()
    };
    for feature in features {
        let bucket = match board.tag_card(&feature.name, release)? {
            TagOutcome::Tagged => &mut report.tagged,
            TagOutcome::AlreadyTagged => &mut report.already_tagged,
            TagOutcome::Missing => &mut report.missing,
        };
        bucket.push(feature.name.clone());
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// roll_up_status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollUpReport {
    pub release: String,
    pub features: usize,
    pub written: usize,
}

/// Collect the release's features from every board and write their status
/// into the roadmap. When two boards carry the same name, the first board
/// wins.
pub fn roll_up_status<S: SheetProvider + ?Sized>(
    boards: &mut [&mut dyn FeatureSource],
    roadmap: &mut Roadmap<'_, S>,
    release: &str,
) -> Result<RollUpReport> {
    let scope = Scope::release(release);
    let mut seen = HashSet::new();
    let mut features = Vec::new();
    for board in boards.iter_mut() {
        for mut feature in board.list_features(&scope)? {
            if !seen.insert(feature.name.clone()) {
                tracing::debug!(feature = %feature.name, board = %board.label(), "already collected");
                continue;
            }
            feature.release = Some(release.to_string());
            features.push(feature);
        }
    }
    let written = roadmap.update_status(&features)?;
    tracing::info!(release, features = features.len(), written, "status rolled up");
    Ok(RollUpReport {
        release: release.to_string(),
        features: features.len(),
        written,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardSelector;
    use crate::feature::Link;
    use crate::issues::Project;
    use crate::local::LocalStore;
    use crate::profile::{BoardKind, UNSIZED_LANE};
    use crate::provider::SheetRef;
    use crate::types::{Size, State, Status};

    fn board<'a>(store: &'a LocalStore, name: &str, kind: BoardKind) -> Board<'a, LocalStore> {
        store.add_board(name).unwrap();
        let mut board = Board::new(store, BoardSelector::Name(name.to_string()), kind);
        board.setup_board().unwrap();
        board
    }

    #[test]
    fn sync_skips_done_and_rejected_categories() {
        let store = LocalStore::in_memory();
        let mut sizing = board(&store, "Sizing", BoardKind::Sizing)
            .with_product_categories(vec!["Networking".to_string()]);
        let features = vec![
            Feature::new("New Thing")
                .with_description("Do it")
                .with_category("Networking"),
            Feature::new("Finished")
                .with_category("Networking")
                .with_status(Status::new(State::Done)),
            Feature::new("Storage work").with_category("Storage"),
        ];

        let report = sync_new_items(&features, &mut sizing, UNSIZED_LANE).unwrap();
        assert_eq!(report.created, vec!["New Thing"]);
        assert_eq!(report.skipped_done, vec!["Finished"]);
        assert_eq!(report.skipped_category, vec!["Storage work"]);
        assert!(report.to_string().ends_with("1 created, 0 updated, 0 unchanged, 2 skipped"));

        let again = sync_new_items(&features, &mut sizing, UNSIZED_LANE).unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.unchanged, vec!["New Thing"]);
        assert_eq!(sizing.cards().unwrap().len(), 1);
    }

    #[test]
    fn sync_reports_link_updates() {
        let store = LocalStore::in_memory();
        let mut sizing = board(&store, "Sizing", BoardKind::Sizing);
        let feature = Feature::new("New Thing");
        sync_new_items(&[feature.clone()], &mut sizing, UNSIZED_LANE).unwrap();

        let linked = feature.with_link(Link::url("http://pad.lv/1234567"));
        let report = sync_new_items(&[linked], &mut sizing, UNSIZED_LANE).unwrap();
        assert_eq!(report.updated, vec!["New Thing"]);
    }

    #[test]
    fn propagate_writes_only_defined_sizes() {
        let store = LocalStore::in_memory();
        let r = store.add_board("Team").unwrap();
        store.add_lane(&r.id, "Backlog", None).unwrap();
        store.add_custom_field(&r.id, "sp").unwrap();
        let mut team = Board::new(&store, BoardSelector::Id(r.id.clone()), BoardKind::Team);
        for name in ["Sized", "Zero", "Unsized", "Huge"] {
            team.upsert_feature(&Feature::new(name), "Backlog").unwrap();
        }
        let mut project = Project::new(&store, "CK");
        project.upsert_feature(&Feature::new("Sized"), "").unwrap();

        let sized = vec![
            Feature::new("Sized").with_size(Size::Points(5)),
            Feature::new("Zero").with_size(Size::Points(0)),
            Feature::new("Unsized"),
            Feature::new("Huge").with_size(Size::Epic),
            Feature::new("Elsewhere").with_size(Size::Points(3)),
        ];
        let reports = {
            let mut destinations: Vec<&mut dyn FeatureSource> = vec![&mut team, &mut project];
            propagate_sizes(&sized, &mut destinations).unwrap()
        };
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].written, vec!["Sized"]);
        assert_eq!(reports[0].missing, vec!["Elsewhere"]);
        assert_eq!(reports[1].written, vec!["Sized"]);

        team.invalidate();
        fn card(team: &mut Board<'_, LocalStore>, name: &str) -> crate::provider::Card {
            team.find_card(name).unwrap().unwrap()
        }
        assert_eq!(card(&mut team, "Sized").custom_field("sp"), Some("5"));
        assert_eq!(card(&mut team, "Zero").custom_field("sp"), None);
        assert_eq!(card(&mut team, "Unsized").custom_field("sp"), None);
        assert_eq!(card(&mut team, "Huge").custom_field("sp"), None);
        assert_eq!(project.find("Sized").unwrap().unwrap().story_points, Some(5));
    }

    #[test]
    fn tag_release_twice_leaves_one_label() {
        let store = LocalStore::in_memory();
        let mut scrum = board(&store, "Scrum", BoardKind::Scrum);
        scrum.create_release("1.29").unwrap();
        scrum.upsert_feature(&Feature::new("Ingress"), "1.29").unwrap();
        let features = vec![Feature::new("Ingress"), Feature::new("Not there")];

        let first = tag_release(&features, &mut scrum, "1.29").unwrap();
        assert_eq!(first.tagged, vec!["Ingress"]);
        assert_eq!(first.missing, vec!["Not there"]);
        let second = tag_release(&features, &mut scrum, "1.29").unwrap();
        assert_eq!(second.already_tagged, vec!["Ingress"]);

        let card = scrum.find_card("Ingress").unwrap().unwrap();
        assert_eq!(card.labels.iter().filter(|l| l.name == "1.29").count(), 1);
    }

    #[test]
    fn roll_up_writes_board_status_into_roadmap() {
        let store = LocalStore::in_memory();
        let sheet = SheetRef::new("roadmap", "Kubernetes");
        let grid: Vec<Vec<String>> = [
            ["", "", "CDK"],
            ["1.29", "", ""],
            ["", "", "Networking"],
            ["", "", "Ingress"],
            ["", "", "Gateway API"],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        store.put_sheet(&sheet, grid).unwrap();

        let mut scrum = board(&store, "Scrum", BoardKind::Scrum);
        scrum.create_release("1.29").unwrap();
        scrum
            .upsert_feature(&Feature::new("Ingress").with_release("1.29"), "Done")
            .unwrap();
        scrum
            .upsert_feature(&Feature::new("Gateway API").with_release("1.29"), "1.29")
            .unwrap();
        scrum
            .upsert_feature(&Feature::new("Unplanned"), "In Progress")
            .unwrap();

        let mut roadmap = Roadmap::new(&store, sheet.clone(), "CDK", "1.29");
        let report = {
            let mut boards: Vec<&mut dyn FeatureSource> = vec![&mut scrum];
            roll_up_status(&mut boards, &mut roadmap, "1.29").unwrap()
        };
        assert_eq!(report.features, 2);
        assert_eq!(report.written, 2);

        let values = store.sheet_values(&sheet);
        assert_eq!(values[3][1], "C");
        assert_eq!(values[4][1], "");
    }
}
