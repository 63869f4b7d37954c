use anyhow::Context;
use roadmap_core::{config::Config, io, local::LocalStore, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing roadmap in: {}", root.display());

    let dir = paths::roadmap_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    if !paths::config_path(root).exists() {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    if !paths::workspace_path(root).exists() {
        LocalStore::load(root)
            .and_then(|store| store.save())
            .context("failed to write workspace.yaml")?;
        println!("  created: {}", paths::WORKSPACE_FILE);
    } else {
        println!("  exists:  {}", paths::WORKSPACE_FILE);
    }

    Ok(())
}
