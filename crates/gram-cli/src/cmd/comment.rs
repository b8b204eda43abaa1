//! `gram comment add` and `gram comments`: append to and read an
//! initiative's discussion.

use super::{Backend, Context, runtime};
use crate::output::{CliError, pretty_rule, render};
use anyhow::Result;
use clap::{Args, Subcommand};
use gram_core::model::{Comment, InitiativeId, UserId};
use gram_replica::{EngagementTransport, ReconciliationEngine, ReplicaError, TransportError};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommand,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    #[command(
        about = "Add a comment to an initiative",
        after_help = "EXAMPLES:\n    gram comment add in-18c2f \"Could we add benches?\"\n\n    gram --user u-42 comment add in-18c2f \"Seconded\""
    )]
    Add(CommentAddArgs),
}

#[derive(Args, Debug)]
pub struct CommentAddArgs {
    pub id: String,

    /// Comment text.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct CommentsArgs {
    /// Initiative to show comments for.
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentAddOutput {
    initiative_id: InitiativeId,
    comment: Comment,
    comment_count: usize,
}

pub fn run_comment(args: &CommentArgs, ctx: &Context) -> Result<()> {
    match &args.command {
        CommentCommand::Add(add) => run_comment_add(add, ctx),
    }
}

fn run_comment_add(args: &CommentAddArgs, ctx: &Context) -> Result<()> {
    let author = ctx.acting_user()?;
    let id = InitiativeId::parse(&args.id).map_err(|err| ctx.fail(&CliError::from(&err)))?;

    let outcome = match ctx.backend()? {
        Backend::Local(transport) => runtime()?.block_on(append(transport, &id, &author, &args.text)),
        Backend::Remote(transport) => {
            runtime()?.block_on(append(transport, &id, &author, &args.text))
        }
    };
    let (comment, comment_count) = outcome.map_err(|err| ctx.fail(&CliError::from(&err)))?;

    let output = CommentAddOutput {
        initiative_id: id,
        comment,
        comment_count,
    };
    render(ctx.output, &output, |o, w| {
        writeln!(
            w,
            "Comment {} added to {} ({} comments)",
            o.comment.id, o.initiative_id, o.comment_count
        )
    })
}

async fn append<T: EngagementTransport + 'static>(
    transport: T,
    id: &InitiativeId,
    author: &UserId,
    text: &str,
) -> Result<(Comment, usize), ReplicaError> {
    let engine = ReconciliationEngine::new(transport);
    engine.refresh().await?;
    let comment = engine.comment(id, author, text)?.settle().await?;
    let count = engine
        .snapshot()
        .initiative(id)
        .map_or(0, |replica| replica.comment_count());
    Ok((comment, count))
}

pub fn run_comments(args: &CommentsArgs, ctx: &Context) -> Result<()> {
    let id = InitiativeId::parse(&args.id).map_err(|err| ctx.fail(&CliError::from(&err)))?;
    let listed: Result<Vec<Comment>, TransportError> = match ctx.backend()? {
        Backend::Local(transport) => runtime()?.block_on(transport.comments(&id)),
        Backend::Remote(transport) => runtime()?.block_on(transport.comments(&id)),
    };
    let comments =
        listed.map_err(|err| ctx.fail(&CliError::with_code(err.to_string(), err.code())))?;

    render(ctx.output, &comments, |list, w| {
        if list.is_empty() {
            return writeln!(w, "No comments yet.");
        }
        for comment in list {
            writeln!(
                w,
                "#{} {} @ {}",
                comment.id,
                comment.author,
                comment.created_at.to_rfc3339()
            )?;
            writeln!(w, "{}", comment.text)?;
            pretty_rule(w)?;
        }
        Ok(())
    })
}
