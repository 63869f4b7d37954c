//! Status derivation for kanban cards.
//!
//! A card's progress comes from its lane first. When resolving for a
//! release, a card outside both the done lane and that release's backlog
//! lane has started. Cards still sitting in the release backlog lane count
//! as started when any checklist item is ticked or any card they link to on
//! the same board has started. The walk over linked cards is guarded by a
//! `visited` set so cyclic links terminate.

use crate::profile::BoardProfile;
use crate::provider::{Card, Lane};
use crate::types::{Color, State, Status};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// CardGraph
// ---------------------------------------------------------------------------

/// The cards of one board viewed as a link graph.
pub struct CardGraph<'a> {
    cards: &'a [Card],
}

impl<'a> CardGraph<'a> {
    pub fn new(cards: &'a [Card]) -> Self {
        Self { cards }
    }

    pub fn by_url(&self, url: &str) -> Option<&'a Card> {
        self.cards.iter().find(|c| c.url == url)
    }

    /// Cards on this board that `card` links to, in attachment order.
    ///
    /// Uploads and links to anything that is not a card on this board are
    /// skipped.
    pub fn sub_cards(&self, card: &Card) -> Vec<&'a Card> {
        let mut subs = Vec::new();
        for attachment in &card.attachments {
            if attachment.is_upload {
                tracing::debug!(card = %card.name, "skipping upload");
                continue;
            }
            match self.by_url(&attachment.url) {
                Some(sub) if sub.id != card.id => subs.push(sub),
                Some(_) => {}
                None => {
                    tracing::debug!(url = %attachment.url, "attachment is not a card on this board");
                }
            }
        }
        subs
    }
}

// ---------------------------------------------------------------------------
// StatusResolver
// ---------------------------------------------------------------------------

pub struct StatusResolver<'a> {
    profile: &'a BoardProfile,
    lanes: &'a [Lane],
    graph: CardGraph<'a>,
}

impl<'a> StatusResolver<'a> {
    pub fn new(profile: &'a BoardProfile, lanes: &'a [Lane], cards: &'a [Card]) -> Self {
        Self {
            profile,
            lanes,
            graph: CardGraph::new(cards),
        }
    }

    fn lane_name(&self, card: &Card) -> &'a str {
        self.lanes
            .iter()
            .find(|l| l.id == card.lane_id)
            .map(|l| l.name.as_str())
            .unwrap_or("")
    }

    /// Resolve the status of `card` for `release`.
    ///
    /// `visited` holds the ids of cards already walked in this resolution;
    /// pass an empty set for a fresh resolution.
    pub fn resolve(&self, card: &Card, release: Option<&str>, visited: &mut HashSet<String>) -> Status {
        let lane = self.lane_name(card);
        let state = if self.profile.is_done_lane(lane) {
            State::Done
        } else if self.profile.is_in_progress_lane(lane) {
            State::InProgress
        } else if release.is_some_and(|r| !lane.eq_ignore_ascii_case(r)) {
            State::InProgress
        } else {
            self.backlog_state(card, release, visited)
        };

        Status::new(state).with_color(self.release_color(card, release))
    }

    fn backlog_state(
        &self,
        card: &Card,
        release: Option<&str>,
        visited: &mut HashSet<String>,
    ) -> State {
        if card.checklist.iter().any(|item| item.checked) {
            return State::InProgress;
        }

        visited.insert(card.id.clone());
        for sub in self.graph.sub_cards(card) {
            if visited.contains(&sub.id) {
                tracing::debug!(card = %sub.name, "already visited");
                continue;
            }
            let sub_status = self.resolve(sub, release, visited);
            tracing::debug!(card = %card.name, sub = %sub.name, status = %sub_status, "sub-card status");
            if sub_status.is_started() {
                return State::InProgress;
            }
        }
        State::NotStarted
    }

    /// The colour of the card's release label, if it carries one in the
    /// release palette.
    fn release_color(&self, card: &Card, release: Option<&str>) -> Color {
        let Some(release) = release else {
            return Color::White;
        };
        card.labels
            .iter()
            .filter(|l| l.name == release)
            .filter_map(|l| l.color.parse::<Color>().ok())
            .find(|c| self.profile.release_colors.contains(c))
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::BoardKind;
    use crate::provider::{Attachment, ChecklistItem, Label};
    use chrono::Utc;

    fn lanes() -> Vec<Lane> {
        ["1.29", "In Progress", "In Review", "Done", "Icebox"]
            .iter()
            .enumerate()
            .map(|(i, name)| Lane {
                id: format!("lane-{i}"),
                name: name.to_string(),
                pos: i as f64,
                closed: false,
            })
            .collect()
    }

    fn card(id: &str, lane: &str) -> Card {
        let lane_id = lanes()
            .into_iter()
            .find(|l| l.name == lane)
            .map(|l| l.id)
            .unwrap();
        Card {
            id: id.to_string(),
            name: id.to_string(),
            url: format!("https://kanban/c/{id}"),
            description: String::new(),
            lane_id,
            closed: false,
            labels: Vec::new(),
            checklist: Vec::new(),
            attachments: Vec::new(),
            custom_fields: Default::default(),
            last_activity: Utc::now(),
        }
    }

    fn link(from: &mut Card, to: &str) {
        from.attachments.push(Attachment {
            url: format!("https://kanban/c/{to}"),
            is_upload: false,
        });
    }

    fn resolve(cards: &[Card], id: &str) -> Status {
        let profile = BoardKind::Scrum.profile();
        let lanes = lanes();
        let resolver = StatusResolver::new(&profile, &lanes, cards);
        let target = cards.iter().find(|c| c.id == id).unwrap();
        resolver.resolve(target, Some("1.29"), &mut HashSet::new())
    }

    #[test]
    fn done_lane_wins_over_everything() {
        let mut a = card("Feature A", "Done");
        a.checklist.push(ChecklistItem {
            name: "todo".to_string(),
            checked: false,
        });
        link(&mut a, "sub");
        let sub = card("sub", "1.29");
        let status = resolve(&[a, sub], "Feature A");
        assert_eq!(status.state, State::Done);
    }

    #[test]
    fn in_progress_lane_overrides_links() {
        let mut a = card("a", "In Review");
        link(&mut a, "sub");
        let sub = card("sub", "1.29");
        assert_eq!(resolve(&[a, sub], "a").state, State::InProgress);
    }

    #[test]
    fn checked_checklist_starts_backlog_card() {
        let mut a = card("a", "1.29");
        a.checklist.push(ChecklistItem {
            name: "design".to_string(),
            checked: true,
        });
        assert_eq!(resolve(&[a], "a").state, State::InProgress);
    }

    #[test]
    fn started_sub_card_starts_parent() {
        let mut a = card("a", "1.29");
        link(&mut a, "b");
        let b = card("b", "In Progress");
        assert_eq!(resolve(&[a, b], "a").state, State::InProgress);
    }

    #[test]
    fn not_started_sub_card_leaves_parent_not_started() {
        let mut a = card("a", "1.29");
        link(&mut a, "b");
        let b = card("b", "1.29");
        assert_eq!(resolve(&[a, b], "a").state, State::NotStarted);
    }

    #[test]
    fn cyclic_links_terminate() {
        let mut a = card("a", "1.29");
        let mut b = card("b", "1.29");
        link(&mut a, "b");
        link(&mut b, "a");
        link(&mut a, "a");
        assert_eq!(resolve(&[a, b], "a").state, State::NotStarted);
    }

    #[test]
    fn uploads_and_foreign_links_are_skipped() {
        let mut a = card("a", "1.29");
        a.attachments.push(Attachment {
            url: "https://kanban/c/b".to_string(),
            is_upload: true,
        });
        a.attachments.push(Attachment {
            url: "https://bugs.example/123".to_string(),
            is_upload: false,
        });
        let b = card("b", "Done");
        assert_eq!(resolve(&[a, b], "a").state, State::NotStarted);
    }

    #[test]
    fn deep_chain_propagates() {
        let mut a = card("a", "1.29");
        let mut b = card("b", "1.29");
        link(&mut a, "b");
        link(&mut b, "c");
        let c = card("c", "Done");
        assert_eq!(resolve(&[a, b, c], "a").state, State::InProgress);
    }

    #[test]
    fn release_label_sets_color() {
        let mut a = card("a", "In Progress");
        a.labels.push(Label {
            id: "l".to_string(),
            name: "1.29".to_string(),
            color: "red".to_string(),
        });
        let status = resolve(&[a], "a");
        assert_eq!(status.state, State::InProgress);
        assert_eq!(status.color, Color::Red);
    }

    #[test]
    fn unknown_label_color_keeps_default() {
        let mut a = card("a", "1.29");
        a.labels.push(Label {
            id: "l".to_string(),
            name: "1.29".to_string(),
            color: "sky".to_string(),
        });
        a.labels.push(Label {
            id: "m".to_string(),
            name: "1.30".to_string(),
            color: "black".to_string(),
        });
        assert_eq!(resolve(&[a], "a").color, Color::White);
    }

    #[test]
    fn card_off_the_release_lane_is_started() {
        let a = card("a", "Icebox");
        assert_eq!(resolve(&[a], "a").state, State::InProgress);
    }

    #[test]
    fn planned_card_in_earlier_release_lane_is_started() {
        let mut lanes = lanes();
        lanes.push(Lane {
            id: "lane-old".to_string(),
            name: "1.28".to_string(),
            pos: -1.0,
            closed: false,
        });
        let mut a = card("a", "1.29");
        a.lane_id = "lane-old".to_string();
        a.labels.push(Label {
            id: "l".to_string(),
            name: "1.29".to_string(),
            color: "green".to_string(),
        });
        let profile = BoardKind::Scrum.profile();
        let cards = [a];
        let resolver = StatusResolver::new(&profile, &lanes, &cards);
        let status = resolver.resolve(&cards[0], Some("1.29"), &mut HashSet::new());
        assert_eq!(status, Status::new(State::InProgress).with_color(Color::Green));
    }

    #[test]
    fn without_a_release_other_lanes_use_backlog_rules() {
        let profile = BoardKind::Scrum.profile();
        let lanes = lanes();
        let cards = [card("a", "Icebox")];
        let resolver = StatusResolver::new(&profile, &lanes, &cards);
        let status = resolver.resolve(&cards[0], None, &mut HashSet::new());
        assert_eq!(status.state, State::NotStarted);
    }
}
