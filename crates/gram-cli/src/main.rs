#![forbid(unsafe_code)]

mod cmd;
mod identity;
mod output;

use clap::{Parser, Subcommand};
use gram_core::config::resolve_config;
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "gram",
    author,
    version,
    about = "gram: community initiatives with votes and discussion",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (skips env resolution).
    #[arg(long, global = true)]
    user: Option<String>,

    /// Send requests to a running gram server instead of the local store.
    #[arg(long, global = true, value_name = "URL")]
    remote: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Project",
        about = "Initialize a gram project",
        long_about = "Create .gram/ with a default config, a migrated store, and a media directory.",
        after_help = "EXAMPLES:\n    gram init\n\n    gram init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Project",
        about = "Run the HTTP server",
        after_help = "EXAMPLES:\n    gram serve\n\n    gram serve --listen 0.0.0.0:8080"
    )]
    Serve(cmd::serve::ServeArgs),

    #[command(next_help_heading = "Members", about = "Manage member profiles")]
    User(cmd::user::UserArgs),

    #[command(next_help_heading = "Initiatives", about = "Create and list initiatives")]
    Initiative(cmd::initiative::InitiativeArgs),

    #[command(
        next_help_heading = "Engagement",
        about = "Toggle your vote on an initiative",
        after_help = "EXAMPLES:\n    # Vote (run again to withdraw)\n    gram vote in-18c2f\n\n    # Vote on a running server\n    gram --remote http://127.0.0.1:8080 vote in-18c2f"
    )]
    Vote(cmd::vote::VoteArgs),

    #[command(next_help_heading = "Engagement", about = "Comment on an initiative")]
    Comment(cmd::comment::CommentArgs),

    #[command(
        next_help_heading = "Engagement",
        about = "Show an initiative's comments in append order"
    )]
    Comments(cmd::comment::CommentsArgs),

    #[command(
        next_help_heading = "Project",
        about = "Check stored counters against their rows"
    )]
    Verify,

    #[command(
        next_help_heading = "Project",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    gram completions bash\n\n    gram completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("GRAM_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "gram=debug,tower_http=debug,info"
        } else {
            "gram=info,warn"
        })
    });

    let format = env::var("GRAM_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions(args) = &cli.command {
        return cmd::completions::run_completions(args);
    }

    let project_root = env::current_dir()?;
    let config = resolve_config(&project_root, cli.json)?;
    debug!(output = %config.resolved_output, "config resolved");
    let ctx = cmd::Context::new(project_root, config, cli.user, cli.remote);

    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, &ctx),
        Commands::Serve(args) => cmd::serve::run_serve(&args, &ctx),
        Commands::User(args) => cmd::user::run_user(&args, &ctx),
        Commands::Initiative(args) => cmd::initiative::run_initiative(&args, &ctx),
        Commands::Vote(args) => cmd::vote::run_vote(&args, &ctx),
        Commands::Comment(args) => cmd::comment::run_comment(&args, &ctx),
        Commands::Comments(args) => cmd::comment::run_comments(&args, &ctx),
        Commands::Verify => cmd::verify::run_verify(&ctx),
        Commands::Completions(args) => cmd::completions::run_completions(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["gram", "vote", "in-1", "--json", "--user", "alice"]);
        assert!(cli.json);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert!(matches!(cli.command, Commands::Vote(_)));
    }

    #[test]
    fn remote_flag_parsed() {
        let cli = Cli::parse_from(["gram", "--remote", "http://127.0.0.1:8080", "initiative", "list"]);
        assert_eq!(cli.remote.as_deref(), Some("http://127.0.0.1:8080"));
        assert!(cli.user.is_none());
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["gram", "init"],
            vec!["gram", "serve", "--listen", "127.0.0.1:0"],
            vec!["gram", "user", "add", "u1", "--fullname", "U One"],
            vec!["gram", "user", "show", "u1"],
            vec!["gram", "initiative", "create", "--title", "x"],
            vec!["gram", "initiative", "list"],
            vec!["gram", "vote", "in-1"],
            vec!["gram", "comment", "add", "in-1", "hello"],
            vec!["gram", "comments", "in-1"],
            vec!["gram", "verify"],
            vec!["gram", "completions", "bash"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn comment_text_is_positional() {
        let cli = Cli::parse_from(["gram", "comment", "add", "in-1", "two words"]);
        let Commands::Comment(args) = cli.command else {
            panic!("expected comment");
        };
        let cmd::comment::CommentCommand::Add(add) = args.command;
        assert_eq!(add.text, "two words");
    }
}
