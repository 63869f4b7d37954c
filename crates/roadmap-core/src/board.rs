//! Kanban boards as feature sources.
//!
//! A [`Board`] wraps one board on a [`KanbanProvider`] and reads lanes,
//! labels, cards and custom fields through a [`BoardCache`]. Every write made
//! through the board invalidates the cache so later reads in the same run see
//! the change.

use crate::error::{Result, RoadmapError};
use crate::feature::{Feature, Link, Scope, Upsert};
use crate::profile::{self, BoardKind, BoardProfile, BACKLOG_LANE, EPIC_LANE};
use crate::provider::{BoardRef, Card, CustomField, KanbanProvider, Label, Lane, NewCard};
use crate::review::PullReview;
use crate::source::FeatureSource;
use crate::status::{CardGraph, StatusResolver};
use crate::types::{Color, Size};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// BoardSelector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardSelector {
    Id(String),
    /// Matched case-insensitively against board names.
    Name(String),
}

impl BoardSelector {
    /// `id:<id>` selects by id; anything else is a board name.
    pub fn parse(value: &str) -> Self {
        match value.strip_prefix("id:") {
            Some(id) => BoardSelector::Id(id.trim().to_string()),
            None => BoardSelector::Name(value.trim().to_string()),
        }
    }
}

impl fmt::Display for BoardSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardSelector::Id(id) => write!(f, "id:{id}"),
            BoardSelector::Name(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// BoardCache
// ---------------------------------------------------------------------------

/// Lazily-populated reads of one board, owned by a single run.
#[derive(Debug, Default)]
pub struct BoardCache {
    lanes: Option<Vec<Lane>>,
    labels: Option<Vec<Label>>,
    cards: Option<Vec<Card>>,
    custom_fields: Option<Vec<CustomField>>,
}

impl BoardCache {
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_none()
            && self.labels.is_none()
            && self.cards.is_none()
            && self.custom_fields.is_none()
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseSetup {
    pub lane_created: bool,
    pub labels_created: Vec<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOutcome {
    Tagged,
    AlreadyTagged,
    Missing,
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

pub struct Board<'a, K: KanbanProvider + ?Sized> {
    provider: &'a K,
    selector: BoardSelector,
    resolved: Option<BoardRef>,
    kind: BoardKind,
    profile: BoardProfile,
    product_categories: Vec<String>,
    skip_lanes: Vec<String>,
    cache: BoardCache,
}

impl<'a, K: KanbanProvider + ?Sized> Board<'a, K> {
    pub fn new(provider: &'a K, selector: BoardSelector, kind: BoardKind) -> Self {
        Self {
            provider,
            selector,
            resolved: None,
            kind,
            profile: kind.profile(),
            product_categories: Vec::new(),
            skip_lanes: Vec::new(),
            cache: BoardCache::default(),
        }
    }

    pub fn with_profile(mut self, profile: BoardProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Only accept features whose roadmap category is listed. An empty list
    /// accepts everything, and so does a feature without a category.
    pub fn with_product_categories(mut self, categories: Vec<String>) -> Self {
        self.product_categories = categories;
        self
    }

    /// Leave cards in these lanes out of listed features.
    pub fn with_skip_lanes(mut self, lanes: Vec<String>) -> Self {
        self.skip_lanes = lanes;
        self
    }

    pub fn kind(&self) -> BoardKind {
        self.kind
    }

    pub fn profile(&self) -> &BoardProfile {
        &self.profile
    }

    pub fn cache(&self) -> &BoardCache {
        &self.cache
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn name(&self) -> String {
        match &self.resolved {
            Some(r) => r.name.clone(),
            None => self.selector.to_string(),
        }
    }

    pub fn board_ref(&mut self) -> Result<BoardRef> {
        if let Some(r) = &self.resolved {
            return Ok(r.clone());
        }
        let boards = self.provider.boards()?;
        let found = match &self.selector {
            BoardSelector::Id(id) => boards.into_iter().find(|b| &b.id == id),
            BoardSelector::Name(name) => {
                let wanted = name.to_lowercase();
                boards.into_iter().find(|b| b.name.to_lowercase() == wanted)
            }
        };
        let board = found.ok_or_else(|| RoadmapError::BoardNotFound(self.selector.to_string()))?;
        self.resolved = Some(board.clone());
        Ok(board)
    }

    pub fn id(&mut self) -> Result<String> {
        Ok(self.board_ref()?.id)
    }

    // -----------------------------------------------------------------------
    // Cached reads
    // -----------------------------------------------------------------------

    fn ensure_lanes(&mut self) -> Result<()> {
        if self.cache.lanes.is_none() {
            let id = self.id()?;
            let mut lanes = self.provider.lanes(&id)?;
            lanes.sort_by(|a, b| a.pos.total_cmp(&b.pos));
            self.cache.lanes = Some(lanes);
        }
        Ok(())
    }

    fn ensure_labels(&mut self) -> Result<()> {
        if self.cache.labels.is_none() {
            let id = self.id()?;
            self.cache.labels = Some(self.provider.labels(&id)?);
        }
        Ok(())
    }

    fn ensure_cards(&mut self) -> Result<()> {
        if self.cache.cards.is_none() {
            let id = self.id()?;
            self.cache.cards = Some(self.provider.cards(&id)?);
        }
        Ok(())
    }

    fn ensure_custom_fields(&mut self) -> Result<()> {
        if self.cache.custom_fields.is_none() {
            let id = self.id()?;
            self.cache.custom_fields = Some(self.provider.custom_fields(&id)?);
        }
        Ok(())
    }

    fn cached_lanes(&self) -> &[Lane] {
        self.cache.lanes.as_deref().unwrap_or(&[])
    }

    fn cached_cards(&self) -> &[Card] {
        self.cache.cards.as_deref().unwrap_or(&[])
    }

    pub fn lanes(&mut self) -> Result<&[Lane]> {
        self.ensure_lanes()?;
        Ok(self.cached_lanes())
    }

    pub fn labels(&mut self) -> Result<&[Label]> {
        self.ensure_labels()?;
        Ok(self.cache.labels.as_deref().unwrap_or(&[]))
    }

    /// Every card on the board, archived ones included.
    pub fn cards(&mut self) -> Result<&[Card]> {
        self.ensure_cards()?;
        Ok(self.cached_cards())
    }

    pub fn custom_fields(&mut self) -> Result<&[CustomField]> {
        self.ensure_custom_fields()?;
        Ok(self.cache.custom_fields.as_deref().unwrap_or(&[]))
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn lane(&mut self, name: &str) -> Result<Lane> {
        let board = self.name();
        self.lanes()?
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| RoadmapError::LaneNotFound {
                board,
                lane: name.to_string(),
            })
    }

    pub fn find_label(&mut self, name: &str, color: &str) -> Result<Label> {
        let board = self.name();
        self.labels()?
            .iter()
            .find(|l| l.is(name, color))
            .cloned()
            .ok_or_else(|| RoadmapError::LabelNotFound {
                board,
                name: name.to_string(),
                color: color.to_string(),
            })
    }

    /// The planned (green) label of a release.
    pub fn release_label(&mut self, release: &str) -> Result<Label> {
        self.find_label(release, Color::Green.as_str())
    }

    pub fn custom_field(&mut self, name: &str) -> Result<CustomField> {
        let board = self.name();
        self.custom_fields()?
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .ok_or_else(|| RoadmapError::CustomFieldNotFound {
                board,
                field: name.to_string(),
            })
    }

    /// First card with exactly this name, in board order.
    pub fn find_card(&mut self, name: &str) -> Result<Option<Card>> {
        Ok(self.cards()?.iter().find(|c| c.name == name).cloned())
    }

    fn lane_name_of<'c>(lanes: &'c [Lane], card: &Card) -> &'c str {
        lanes
            .iter()
            .find(|l| l.id == card.lane_id)
            .map(|l| l.name.as_str())
            .unwrap_or("")
    }

    fn card_size(&self, card: &Card) -> Option<Size> {
        if card.has_label_named(&self.profile.epic_label) {
            return Some(Size::Epic);
        }
        if self.profile.size_lanes.is_some() {
            let lane = Self::lane_name_of(self.cached_lanes(), card);
            if lane == EPIC_LANE {
                return Some(Size::Epic);
            }
            if let Some(points) = profile::parse_size_lane(lane) {
                return Some(Size::Points(points));
            }
        }
        card.custom_field(&self.profile.story_points_field)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .map(Size::Points)
    }

    fn in_release(&self, card: &Card, release: &str) -> bool {
        card.labels.iter().any(|l| {
            l.name == release
                && l.color
                    .parse::<Color>()
                    .is_ok_and(|c| self.profile.release_colors.contains(&c))
        })
    }

    /// URLs for `feature`'s links. Named links resolve to the card of that
    /// name on this board and are dropped when no such card exists yet.
    fn resolve_links(&mut self, feature: &Feature) -> Result<Vec<String>> {
        let mut urls: Vec<String> = Vec::new();
        for link in &feature.links {
            let url = match link {
                Link::Url(u) => u.clone(),
                Link::Named(name) => match self.find_card(name)? {
                    Some(card) => card.url,
                    None => {
                        tracing::debug!(board = %self.name(), link = %name, "linked card not on board yet");
                        continue;
                    }
                },
            };
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(urls)
    }

    // -----------------------------------------------------------------------
    // Upsert
    // -----------------------------------------------------------------------

    fn create_feature_card(&mut self, feature: &Feature, target_lane: &str) -> Result<Upsert> {
        let lane_name = self
            .profile
            .lane_for_size(feature.points(), feature.is_epic())
            .unwrap_or_else(|| target_lane.to_string());
        let lane = self.lane(&lane_name)?;

        let mut label_ids = Vec::new();
        if self.profile.tags_release {
            if let Some(release) = &feature.release {
                label_ids.push(self.release_label(release)?.id);
            }
        }

        let urls = self.resolve_links(feature)?;
        let board_id = self.id()?;
        tracing::info!(board = %self.name(), card = %feature.name, lane = %lane.name, "creating card");
        let card = self.provider.create_card(
            &board_id,
            &lane.id,
            NewCard {
                name: feature.name.clone(),
                description: feature.description.clone(),
                label_ids,
            },
        )?;
        for url in &urls {
            self.provider.attach_url(&card.id, url)?;
        }
        self.invalidate();
        Ok(Upsert::Created {
            links_added: urls.len(),
        })
    }

    fn update_feature_card(&mut self, card: &Card, feature: &Feature) -> Result<Upsert> {
        let description_changed =
            !feature.description.is_empty() && card.description != feature.description;
        if description_changed {
            tracing::info!(board = %self.name(), card = %card.name, "updating description");
            self.provider.set_description(&card.id, &feature.description)?;
        }

        let present: HashSet<&str> = card.attachments.iter().map(|a| a.url.as_str()).collect();
        let mut links_added = 0;
        for url in self.resolve_links(feature)? {
            if present.contains(url.as_str()) {
                continue;
            }
            tracing::info!(board = %self.name(), card = %card.name, url = %url, "attaching link");
            self.provider.attach_url(&card.id, &url)?;
            links_added += 1;
        }

        if description_changed || links_added > 0 {
            self.invalidate();
        }
        Ok(Upsert::existing(description_changed, links_added))
    }

    // -----------------------------------------------------------------------
    // Release bookkeeping
    // -----------------------------------------------------------------------

    /// Add the release backlog lane (just before the first in-progress lane)
    /// and the release label in every release colour. Existing lanes and
    /// labels are left alone.
    pub fn create_release(&mut self, release: &str) -> Result<ReleaseSetup> {
        let board_id = self.id()?;
        let lanes = self.lanes()?.to_vec();
        let mut setup = ReleaseSetup::default();

        if !lanes.iter().any(|l| l.name == release) {
            let pos = self
                .profile
                .in_progress_lanes
                .first()
                .and_then(|ip| lanes.iter().position(|l| l.name.eq_ignore_ascii_case(ip)))
                .map(|i| match i.checked_sub(1).map(|p| lanes[p].pos) {
                    Some(before) => (before + lanes[i].pos) / 2.0,
                    None => lanes[i].pos - 1.0,
                });
            tracing::info!(board = %self.name(), lane = %release, "creating release lane");
            self.provider.add_lane(&board_id, release, pos)?;
            setup.lane_created = true;
        }

        let labels = self.labels()?.to_vec();
        for color in self.profile.release_colors.clone() {
            if labels.iter().any(|l| l.is(release, color.as_str())) {
                continue;
            }
            self.provider
                .add_label_definition(&board_id, release, color.as_str())?;
            setup.labels_created.push(color);
        }

        self.invalidate();
        Ok(setup)
    }

    /// Ensure the card named `name` carries the planned label of `release`.
    pub fn tag_card(&mut self, name: &str, release: &str) -> Result<TagOutcome> {
        let label = self.release_label(release)?;
        let Some(card) = self.find_card(name)? else {
            tracing::debug!(board = %self.name(), card = %name, "no card to tag");
            return Ok(TagOutcome::Missing);
        };
        if card.has_label_named(&label.name) {
            tracing::debug!(board = %self.name(), card = %name, "already labeled");
            return Ok(TagOutcome::AlreadyTagged);
        }
        tracing::info!(board = %self.name(), card = %name, release, "labeling card");
        self.provider.add_label(&card.id, &label)?;
        self.invalidate();
        Ok(TagOutcome::Tagged)
    }

    /// Create the lanes and labels this kind of board relies on. Returns the
    /// names of lanes created.
    pub fn setup_board(&mut self) -> Result<Vec<String>> {
        let board_id = self.id()?;
        let existing: Vec<String> = self.lanes()?.iter().map(|l| l.name.clone()).collect();
        let mut wanted = self.profile.required_lanes.clone();
        wanted.extend(self.profile.sizing_lanes());

        let mut created = Vec::new();
        for name in wanted {
            if existing.iter().any(|l| l.eq_ignore_ascii_case(&name)) || created.contains(&name) {
                continue;
            }
            tracing::info!(board = %self.name(), lane = %name, "creating lane");
            self.provider.add_lane(&board_id, &name, None)?;
            created.push(name);
        }

        if let Some(stale) = self.profile.stale_label.clone() {
            if !self.labels()?.iter().any(|l| l.is(&stale.name, &stale.color)) {
                self.provider
                    .add_label_definition(&board_id, &stale.name, &stale.color)?;
            }
        }

        self.invalidate();
        Ok(created)
    }

    /// Delete every card on the board.
    pub fn clear(&mut self) -> Result<usize> {
        let ids: Vec<String> = self.cards()?.iter().map(|c| c.id.clone()).collect();
        for id in &ids {
            self.provider.delete_card(id)?;
        }
        self.invalidate();
        Ok(ids.len())
    }

    /// Sizes read off a sizing board's lanes.
    pub fn sized_features(&mut self) -> Result<Vec<Feature>> {
        self.ensure_lanes()?;
        self.ensure_cards()?;
        let features = self
            .cached_cards()
            .iter()
            .filter(|c| !c.closed)
            .map(|card| {
                let mut feature = Feature::new(card.name.clone());
                feature.size = self.card_size(card);
                feature
            })
            .collect();
        Ok(features)
    }

    // -----------------------------------------------------------------------
    // Stale cards
    // -----------------------------------------------------------------------

    /// Open cards on `lanes` with no activity for longer than `after`.
    pub fn stale_cards(
        &mut self,
        lanes: &[String],
        now: DateTime<Utc>,
        after: Duration,
    ) -> Result<Vec<Card>> {
        self.ensure_lanes()?;
        self.ensure_cards()?;
        let lane_ids: HashSet<&str> = self
            .cached_lanes()
            .iter()
            .filter(|l| lanes.iter().any(|n| n.eq_ignore_ascii_case(&l.name)))
            .map(|l| l.id.as_str())
            .collect();
        Ok(self
            .cached_cards()
            .iter()
            .filter(|c| !c.closed && lane_ids.contains(c.lane_id.as_str()))
            .filter(|c| now - c.last_activity > after)
            .cloned()
            .collect())
    }

    /// Put the stale label on in-progress cards idle for longer than `after`.
    pub fn label_stale_cards(&mut self, now: DateTime<Utc>, after: Duration) -> Result<Vec<String>> {
        let Some(stale) = self.profile.stale_label.clone() else {
            return Ok(Vec::new());
        };
        let label = self.find_label(&stale.name, &stale.color)?;
        let lanes = self.profile.in_progress_lanes.clone();

        let mut labeled = Vec::new();
        for card in self.stale_cards(&lanes, now, after)? {
            if card.labels.iter().any(|l| l.id == label.id) {
                continue;
            }
            tracing::info!(board = %self.name(), card = %card.name, "labeling stale card");
            self.provider.add_label(&card.id, &label)?;
            labeled.push(card.name);
        }
        if !labeled.is_empty() {
            self.invalidate();
        }
        Ok(labeled)
    }

    /// Move stale-labelled cards idle for longer than `after` to the backlog
    /// lane of `backlog`.
    pub fn evict_stale<B: KanbanProvider + ?Sized>(
        &mut self,
        backlog: &mut Board<'_, B>,
        now: DateTime<Utc>,
        after: Duration,
    ) -> Result<Vec<String>> {
        let Some(stale) = self.profile.stale_label.clone() else {
            return Ok(Vec::new());
        };
        let lanes = self.profile.in_progress_lanes.clone();
        let candidates = self.stale_cards(&lanes, now, after)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let target_board = backlog.id()?;
        let target_lane = backlog.lane(BACKLOG_LANE)?;
        let mut moved = Vec::new();
        for card in candidates {
            if !card.labels.iter().any(|l| l.is(&stale.name, &stale.color)) {
                continue;
            }
            tracing::info!(board = %self.name(), card = %card.name, "moving inactive stale card to backlog");
            self.provider
                .move_card(&card.id, &target_board, &target_lane.id)?;
            moved.push(card.name);
        }
        if !moved.is_empty() {
            self.invalidate();
            backlog.invalidate();
        }
        Ok(moved)
    }

    // -----------------------------------------------------------------------
    // Pull request review cards
    // -----------------------------------------------------------------------

    /// One card per pull request needing review, created in `lane`. Cards
    /// that already exist are left alone.
    pub fn add_pull_reviews(&mut self, reviews: &[PullReview], lane: &str) -> Result<Vec<String>> {
        if reviews.is_empty() {
            return Ok(Vec::new());
        }
        let lane = self.lane(lane)?;
        let board_id = self.id()?;
        let mut created = Vec::new();
        for review in reviews {
            let name = review.card_name();
            if self.find_card(&name)?.is_some() {
                continue;
            }
            tracing::info!(board = %self.name(), card = %name, "adding review card");
            let card = self.provider.create_card(
                &board_id,
                &lane.id,
                NewCard {
                    name: name.clone(),
                    description: review.description(),
                    label_ids: Vec::new(),
                },
            )?;
            self.provider.attach_url(&card.id, &review.url)?;
            self.invalidate();
            created.push(name);
        }
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// Epic aggregation
// ---------------------------------------------------------------------------

/// Sum of the sizes of the cards `card` links to. Linked epics contribute
/// their own aggregate; a card reached twice counts once.
pub fn aggregate_size(
    graph: &CardGraph<'_>,
    card: &Card,
    epic_label: &str,
    field: &str,
    visited: &mut HashSet<String>,
) -> u32 {
    visited.insert(card.id.clone());
    let mut total = 0;
    for sub in graph.sub_cards(card) {
        if !visited.insert(sub.id.clone()) {
            continue;
        }
        total += if sub.has_label_named(epic_label) {
            aggregate_size(graph, sub, epic_label, field, visited)
        } else {
            sub.custom_field(field)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
    }
    total
}

// ---------------------------------------------------------------------------
// FeatureSource
// ---------------------------------------------------------------------------

impl<K: KanbanProvider + ?Sized> FeatureSource for Board<'_, K> {
    fn label(&self) -> String {
        format!("{} board '{}'", self.kind, self.name())
    }

    fn list_features(&mut self, scope: &Scope) -> Result<Vec<Feature>> {
        self.ensure_lanes()?;
        self.ensure_cards()?;
        let lanes = self.cached_lanes();
        let cards = self.cached_cards();
        let resolver = StatusResolver::new(&self.profile, lanes, cards);
        let release = scope.release.as_deref();

        let mut features = Vec::new();
        for card in cards {
            if card.closed && !scope.include_closed {
                continue;
            }
            let lane = Self::lane_name_of(lanes, card);
            if self.skip_lanes.iter().any(|l| l.eq_ignore_ascii_case(lane)) {
                continue;
            }
            if let Some(release) = release {
                if !self.in_release(card, release) {
                    continue;
                }
            }
            let status = resolver.resolve(card, release, &mut HashSet::new());
            features.push(Feature {
                name: card.name.clone(),
                description: card.description.clone(),
                size: self.card_size(card),
                status,
                links: card.link_urls().map(Link::url).collect(),
                closed: card.closed,
                category: None,
                release: release.map(str::to_string),
                team: None,
            });
        }
        Ok(features)
    }

    fn upsert_feature(&mut self, feature: &Feature, target_lane: &str) -> Result<Upsert> {
        match self.find_card(&feature.name)? {
            Some(card) => self.update_feature_card(&card, feature),
            None => self.create_feature_card(feature, target_lane),
        }
    }

    fn write_back_size(&mut self, name: &str, points: u32) -> Result<bool> {
        let Some(card) = self.find_card(name)? else {
            tracing::debug!(board = %self.name(), card = %name, "no card to size");
            return Ok(false);
        };
        let field_name = self.profile.story_points_field.clone();
        let field = self.custom_field(&field_name)?;
        let value = points.to_string();
        if card.custom_field(&field.name) == Some(value.as_str()) {
            return Ok(true);
        }
        tracing::info!(board = %self.name(), card = %name, points, "writing size");
        self.provider.set_custom_field(&card.id, &field, &value)?;
        self.invalidate();
        Ok(true)
    }

    fn accepts(&self, feature: &Feature) -> bool {
        if self.product_categories.is_empty() {
            return true;
        }
        feature
            .category
            .as_ref()
            .is_none_or(|c| self.product_categories.contains(c))
    }

    fn recompute_epics(&mut self) -> Result<usize> {
        self.ensure_cards()?;
        let epic_label = self.profile.epic_label.clone();
        let field_name = self.profile.story_points_field.clone();

        let totals: Vec<(Card, u32)> = {
            let cards = self.cached_cards();
            let graph = CardGraph::new(cards);
            cards
                .iter()
                .filter(|c| !c.closed && c.has_label_named(&epic_label))
                .map(|c| {
                    let total = aggregate_size(&graph, c, &epic_label, &field_name, &mut HashSet::new());
                    (c.clone(), total)
                })
                .collect()
        };
        if totals.is_empty() {
            return Ok(0);
        }

        let field = self.custom_field(&field_name)?;
        let mut written = 0;
        for (card, total) in totals {
            let value = total.to_string();
            if card.custom_field(&field_name) == Some(value.as_str()) {
                continue;
            }
            tracing::info!(board = %self.name(), card = %card.name, total, "writing epic size");
            self.provider.set_custom_field(&card.id, &field, &value)?;
            written += 1;
        }
        if written > 0 {
            self.invalidate();
        }
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
