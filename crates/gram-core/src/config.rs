use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Directory under the project root holding config, store, and media.
pub const PROJECT_DIR: &str = ".gram";

pub const DEFAULT_MAX_COMMENT_CHARS: usize = 8192;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl ProjectConfig {
    /// Store path, resolved against `project_root` when relative.
    #[must_use]
    pub fn store_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.store.path)
    }

    /// Media directory, resolved against `project_root` when relative.
    #[must_use]
    pub fn media_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.media.dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_dir")]
    pub dir: PathBuf,
    /// Base URL media references are published under.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: default_media_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_comment_chars")]
    pub max_comment_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_comment_chars: default_max_comment_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Default server URL for `vote`/`comment` when `--remote` is not given.
    #[serde(default)]
    pub remote: Option<String>,
    /// Default acting user when neither `--user` nor `GRAM_USER` is set.
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Load `.gram/config.toml` under `project_root`; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `~/.config/gram/config.toml`; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("gram/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config, and output-mode sources.
///
/// # Errors
///
/// Returns an error if either config file is unreadable or malformed.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Output mode precedence: `--json` > `FORMAT` env > user config > TTY.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("gram.sqlite3")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("media")
}

fn default_public_base_url() -> String {
    "/media".to_string()
}

const fn default_max_comment_chars() -> usize {
    DEFAULT_MAX_COMMENT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.server.listen, "127.0.0.1:8080");
        assert_eq!(cfg.limits.max_comment_chars, 8192);
        assert_eq!(cfg.media.public_base_url, "/media");
        assert_eq!(
            cfg.store_path(root.path()),
            root.path().join(".gram/gram.sqlite3")
        );
    }

    #[test]
    fn partial_project_config_keeps_other_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(PROJECT_DIR)).expect("create .gram");
        std::fs::write(
            root.path().join(".gram/config.toml"),
            "[server]\nlisten = \"0.0.0.0:9000\"\n\n[limits]\nmax_comment_chars = 280\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.server.listen, "0.0.0.0:9000");
        assert_eq!(cfg.limits.max_comment_chars, 280);
        assert_eq!(cfg.store.path, PathBuf::from(".gram/gram.sqlite3"));
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(PROJECT_DIR)).expect("create .gram");
        std::fs::write(root.path().join(".gram/config.toml"), "[server\nlisten=").expect("write");

        let err = load_project_config(root.path()).expect_err("parse failure");
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_format_beats_user_config_and_aliases_normalize() {
        assert_eq!(resolve_output(false, Some("table"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("human"), Some("table")), "text");
        assert_eq!(resolve_output(false, Some("json"), Some("bogus")), "json");
    }

    #[test]
    fn user_config_parses_remote_and_user() {
        let cfg: UserConfig = toml::from_str(
            "output = \"json\"\nremote = \"http://127.0.0.1:8080\"\nuser = \"alice\"\n",
        )
        .expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        assert_eq!(cfg.remote.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(cfg.user.as_deref(), Some("alice"));
    }
}
