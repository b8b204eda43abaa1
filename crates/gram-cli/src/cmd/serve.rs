use super::{Context, runtime};
use anyhow::{Context as _, Result};
use clap::Args;
use gram_server::AppState;
use tokio::net::TcpListener;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides `[server] listen`).
    #[arg(long)]
    pub listen: Option<String>,
}

/// Run the HTTP server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the address cannot be bound.
pub fn run_serve(args: &ServeArgs, ctx: &Context) -> Result<()> {
    // Fail fast with the uninitialized-project message.
    drop(ctx.open_store()?);
    let state = AppState::open(&ctx.project_root, &ctx.config.project)?;
    let listen = args
        .listen
        .clone()
        .unwrap_or_else(|| ctx.config.project.server.listen.clone());

    runtime()?.block_on(async move {
        let listener = TcpListener::bind(listen.as_str())
            .await
            .with_context(|| format!("failed to bind {listen}"))?;
        eprintln!("gram serving on http://{}", listener.local_addr()?);
        gram_server::serve(listener, state).await
    })
}
