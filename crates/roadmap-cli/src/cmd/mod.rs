pub mod board;
pub mod config;
pub mod feedback;
pub mod init;
pub mod issues;
pub mod milestone;
pub mod pulls;
pub mod release;
pub mod sizing;
pub mod stale;

use anyhow::{anyhow, Context};
use roadmap_core::{
    board::{Board, BoardSelector},
    config::{Config, TeamConfig},
    feedback::Feedback,
    issues::Project,
    local::LocalStore,
    profile::BoardKind,
    provider::SheetRef,
    sheet::Roadmap,
};
use std::path::Path;

/// Configuration plus the provider every workflow in one run shares.
pub struct Session {
    pub config: Config,
    pub store: LocalStore,
}

impl Session {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let config = Config::discover(root).context("failed to load config")?;
        let store = LocalStore::load(root).context("failed to open workspace")?;
        Ok(Self { config, store })
    }

    pub fn board(
        &self,
        team_name: &str,
        team: &TeamConfig,
        kind: BoardKind,
    ) -> anyhow::Result<Board<'_, LocalStore>> {
        self.try_board(team, kind)
            .ok_or_else(|| anyhow!("team '{team_name}' has no {kind} board configured"))
    }

    pub fn try_board(&self, team: &TeamConfig, kind: BoardKind) -> Option<Board<'_, LocalStore>> {
        let selector = BoardSelector::parse(team.board(kind)?);
        Some(
            Board::new(&self.store, selector, kind)
                .with_profile(self.config.boards.profile(kind))
                .with_product_categories(team.product_categories.clone()),
        )
    }

    pub fn roadmap(&self, team_name: &str, release: &str) -> anyhow::Result<Roadmap<'_, LocalStore>> {
        let cfg = self
            .config
            .roadmap
            .as_ref()
            .ok_or_else(|| anyhow!("no roadmap sheet configured"))?;
        Ok(Roadmap::new(
            &self.store,
            SheetRef::new(&cfg.key, &cfg.org),
            team_name,
            release,
        ))
    }

    pub fn feedback(&self, team: &TeamConfig) -> Option<Feedback<'_, LocalStore>> {
        let cfg = self.config.feedback.as_ref()?;
        let product = team.feedback_product.as_ref()?;
        Some(Feedback::new(&self.store, &cfg.key, product))
    }

    pub fn project(&self, team: &TeamConfig) -> Option<Project<'_, LocalStore>> {
        Some(Project::new(&self.store, team.jira_project.as_ref()?))
    }
}
