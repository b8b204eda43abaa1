//! Acting-user resolution for CLI commands.
//!
//! The resolution chain: `--user` flag > `GRAM_USER` env > user config
//! `user` > `USER` env (TTY only). Mutating commands require a user; reads
//! work without one.

use gram_core::ErrorCode;
use gram_core::model::UserId;
use std::env;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_user_with(
    cli_flag: Option<&str>,
    config_user: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(user) = cli_flag.filter(|u| !u.is_empty()) {
        return Some(user.to_string());
    }

    if let Some(val) = env.get("GRAM_USER") {
        return Some(val);
    }

    if let Some(user) = config_user.filter(|u| !u.is_empty()) {
        return Some(user.to_string());
    }

    if env.is_tty() {
        return env.get("USER");
    }

    None
}

/// Errors from user resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    pub message: String,
    pub code: ErrorCode,
}

/// Resolve and validate the acting user.
pub fn require_user(
    cli_flag: Option<&str>,
    config_user: Option<&str>,
) -> Result<UserId, IdentityError> {
    require_user_with(cli_flag, config_user, &RealEnv)
}

fn require_user_with(
    cli_flag: Option<&str>,
    config_user: Option<&str>,
    env: &dyn EnvReader,
) -> Result<UserId, IdentityError> {
    let raw = resolve_user_with(cli_flag, config_user, env).ok_or_else(|| IdentityError {
        message: "Acting user required for this command. Set --user or GRAM_USER.".to_string(),
        code: ErrorCode::Unauthenticated,
    })?;
    UserId::parse(&raw).map_err(|err| IdentityError {
        message: err.to_string(),
        code: err.code(),
    })
}
