//! `gram initiative create|list`.

use super::{Backend, Context, runtime};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_rule, render};
use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use gram_core::media::LocalMediaStore;
use gram_core::model::{Initiative, InitiativeView};
use gram_core::service::{CreateInitiative, ImageUpload, InitiativeService};
use gram_replica::EngagementTransport;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct InitiativeArgs {
    #[command(subcommand)]
    pub command: InitiativeCommand,
}

#[derive(Subcommand, Debug)]
pub enum InitiativeCommand {
    #[command(
        about = "Create an initiative",
        after_help = "EXAMPLES:\n    # Create with an image\n    gram initiative create --title \"Community garden\" --image plan.png\n\n    # Create on a running server\n    gram --remote http://127.0.0.1:8080 initiative create --title \"Night market\""
    )]
    Create(CreateArgs),

    #[command(about = "List initiatives, newest first")]
    List,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Image file to attach.
    #[arg(long)]
    pub image: Option<PathBuf>,
}

pub fn run_initiative(args: &InitiativeArgs, ctx: &Context) -> Result<()> {
    match &args.command {
        InitiativeCommand::Create(create) => run_create(create, ctx),
        InitiativeCommand::List => run_list(ctx),
    }
}

fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ImageUpload { file_name, bytes })
}

fn run_create(args: &CreateArgs, ctx: &Context) -> Result<()> {
    let creator = ctx.acting_user()?;
    let image = args.image.as_deref().map(read_image).transpose()?;

    let created = match ctx.backend()? {
        Backend::Remote(transport) => runtime()?
            .block_on(transport.create_initiative(&args.title, &args.description, &creator, image))
            .map_err(|err| ctx.fail(&CliError::with_code(err.to_string(), err.code())))?,
        Backend::Local(_) => {
            let store = ctx.open_store()?;
            let project = &ctx.config.project;
            let media = LocalMediaStore::new(
                project.media_dir(&ctx.project_root),
                project.media.public_base_url.clone(),
            );
            InitiativeService::new(store, Arc::new(media))
                .create(CreateInitiative {
                    title: Some(args.title.clone()),
                    description: Some(args.description.clone()),
                    creator_id: Some(creator.to_string()),
                    image,
                })
                .map_err(|err| ctx.fail(&CliError::from(&err)))?
        }
    };

    render(ctx.output, &created, |i, w| {
        writeln!(w, "Created {}: {}", i.id, i.title)?;
        if let Some(url) = &i.image_url {
            writeln!(w, "  image: {url}")?;
        }
        Ok(())
    })
}

fn run_list(ctx: &Context) -> Result<()> {
    let listed = match ctx.backend()? {
        Backend::Remote(transport) => runtime()?.block_on(transport.list_initiatives()),
        Backend::Local(transport) => runtime()?.block_on(transport.list_initiatives()),
    }
    .map_err(|err| ctx.fail(&CliError::with_code(err.to_string(), err.code())))?;

    let mode = ctx.output;
    render(mode, &listed, |views, w| write_listing(views, mode, w))
}

fn write_listing(views: &[InitiativeView], mode: OutputMode, w: &mut dyn Write) -> std::io::Result<()> {
    if views.is_empty() {
        return writeln!(w, "No initiatives yet.");
    }
    if !mode.is_pretty() {
        writeln!(w, "id  votes  comments  title")?;
        for view in views {
            let i = &view.initiative;
            writeln!(w, "{}  {}  {}  {}", i.id, i.vote_count, i.comment_count, i.title)?;
        }
        return Ok(());
    }
    for view in views {
        write_pretty(view, w)?;
    }
    Ok(())
}

fn write_pretty(view: &InitiativeView, w: &mut dyn Write) -> std::io::Result<()> {
    let i: &Initiative = &view.initiative;
    writeln!(w, "{}", i.title)?;
    pretty_rule(w)?;
    pretty_kv(w, "ID", i.id.as_str())?;
    let creator = view
        .creator_profile
        .as_ref()
        .map_or_else(|| i.creator.to_string(), |u| format!("{} ({})", u.fullname, u.id));
    pretty_kv(w, "Creator", creator)?;
    pretty_kv(w, "Votes", i.vote_count.to_string())?;
    pretty_kv(w, "Comments", i.comment_count.to_string())?;
    pretty_kv(w, "Created", i.created_at.to_rfc3339())?;
    if !i.description.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", i.description)?;
    }
    writeln!(w)
}
