use super::Context;
use crate::output::{pretty_kv, render};
use anyhow::{Context as _, Result};
use clap::Args;
use gram_core::config::{PROJECT_DIR, load_project_config};
use gram_core::store::EngagementStore;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if `.gram/` already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[server]\n\
    listen = \"127.0.0.1:8080\"\n\
    \n\
    [store]\n\
    path = \".gram/gram.sqlite3\"\n\
    \n\
    [media]\n\
    dir = \".gram/media\"\n\
    public_base_url = \"/media\"\n\
    \n\
    [limits]\n\
    max_comment_chars = 8192\n";

const GITIGNORE: &str = "gram.sqlite3\ngram.sqlite3-wal\ngram.sqlite3-shm\nmedia/\n";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitOutput {
    ok: bool,
    config: String,
    store: String,
    media: String,
}

/// Execute `gram init`. Creates:
///
/// ```text
/// .gram/
///   config.toml    (default project config)
///   .gitignore     (store and media)
///   gram.sqlite3   (migrated store)
///   media/
/// ```
///
/// # Errors
///
/// Returns an error if `.gram/` exists and `--force` is not set, or if any
/// filesystem or store operation fails.
pub fn run_init(args: &InitArgs, ctx: &Context) -> Result<()> {
    let gram_dir = ctx.project_root.join(PROJECT_DIR);
    if gram_dir.exists() && !args.force {
        anyhow::bail!("{PROJECT_DIR}/ already exists. Use `gram init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&gram_dir)
        .with_context(|| format!("Failed to create {}", gram_dir.display()))?;

    let config_path = gram_dir.join("config.toml");
    if !config_path.exists() {
        std::fs::write(&config_path, CONFIG_TOML)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    }

    let gitignore_path = gram_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    // Re-read so a kept config.toml decides where things go.
    let project = load_project_config(&ctx.project_root)?;
    let store_path = project.store_path(&ctx.project_root);
    EngagementStore::open(&store_path)?;
    let media_dir = project.media_dir(&ctx.project_root);
    std::fs::create_dir_all(&media_dir)
        .with_context(|| format!("Failed to create {}", media_dir.display()))?;

    let summary = InitOutput {
        ok: true,
        config: config_path.display().to_string(),
        store: store_path.display().to_string(),
        media: media_dir.display().to_string(),
    };
    render(ctx.output, &summary, |s, w| {
        writeln!(w, "Initialized {PROJECT_DIR}/ project structure.")?;
        writeln!(w)?;
        pretty_kv(w, "Config", &s.config)?;
        pretty_kv(w, "Store", &s.store)?;
        pretty_kv(w, "Media", &s.media)?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  export GRAM_USER=your-id")?;
        writeln!(w, "  gram initiative create --title \"...\"")
    })
}
