use super::{Backend, Context, runtime};
use crate::output::{CliError, render};
use anyhow::Result;
use clap::Args;
use gram_core::model::{InitiativeId, UserId, VoteTally};
use gram_replica::{EngagementTransport, ReconciliationEngine, ReplicaError};
use serde::Serialize;
use tracing::debug;

#[derive(Args, Debug)]
pub struct VoteArgs {
    /// Initiative to vote on. Voting again withdraws the vote.
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteOutput {
    voted: bool,
    #[serde(flatten)]
    tally: VoteTally,
}

/// Toggle the acting user's vote through the reconciliation engine.
///
/// # Errors
///
/// Returns an error when the initiative is unknown or the request fails; the
/// speculative vote has been rolled back by then.
pub fn run_vote(args: &VoteArgs, ctx: &Context) -> Result<()> {
    let user = ctx.acting_user()?;
    let id = InitiativeId::parse(&args.id).map_err(|err| ctx.fail(&CliError::from(&err)))?;

    let outcome = match ctx.backend()? {
        Backend::Local(transport) => runtime()?.block_on(toggle(transport, &id, &user)),
        Backend::Remote(transport) => runtime()?.block_on(toggle(transport, &id, &user)),
    };
    let tally = outcome.map_err(|err| ctx.fail(&CliError::from(&err)))?;

    let output = VoteOutput {
        voted: tally.liked_by.contains(&user),
        tally,
    };
    render(ctx.output, &output, |o, w| {
        let verb = if o.voted { "Voted for" } else { "Withdrew vote from" };
        writeln!(w, "{verb} {} ({} votes)", o.tally.initiative_id, o.tally.vote_count)
    })
}

async fn toggle<T: EngagementTransport + 'static>(
    transport: T,
    id: &InitiativeId,
    user: &UserId,
) -> Result<VoteTally, ReplicaError> {
    let engine = ReconciliationEngine::new(transport);
    engine.refresh().await?;
    let ticket = engine.vote(id, user)?;
    debug!(mutation = %ticket.mutation(), "vote dispatched");
    let settled = ticket.settle().await;
    for surfaced in engine.take_errors() {
        debug!(mutation = %surfaced.mutation, code = %surfaced.code, "vote rolled back");
    }
    settled
}
