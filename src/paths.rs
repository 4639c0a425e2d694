//! Where the bank snapshot lives.
//!
//! - **Working directory mode**: if `banks.json` already exists in the
//!   current directory, keep using it. This is where earlier setups wrote it.
//! - **Data directory mode** (default): `<data dir>/XTouch Banks/banks.json`
//!   (`%APPDATA%` on Windows, `~/.local/share` on Linux).

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for the data directory
const APP_NAME: &str = "XTouch Banks";

/// Snapshot file name
pub const STATE_FILE: &str = "banks.json";

/// Resolve the snapshot path from, in order: the command line, the config
/// file, the working directory and the per-user data directory.
pub fn resolve_state_path(cli: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    if let Some(path) = cli.or(configured) {
        return path.to_path_buf();
    }

    let cwd_state = PathBuf::from(STATE_FILE);
    if cwd_state.exists() {
        debug!("Using snapshot in working directory: {}", cwd_state.display());
        return cwd_state;
    }

    default_state_path()
}

/// `<data dir>/XTouch Banks/banks.json`, or `./banks.json` when the platform
/// has no data directory
pub fn default_state_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join(APP_NAME).join(STATE_FILE),
        None => {
            debug!("No platform data directory, using working directory");
            PathBuf::from(STATE_FILE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_wins_over_config() {
        let path = resolve_state_path(
            Some(Path::new("cli.json")),
            Some(Path::new("configured.json")),
        );
        assert_eq!(path, PathBuf::from("cli.json"));
    }

    #[test]
    fn test_config_used_without_cli() {
        let path = resolve_state_path(None, Some(Path::new("configured.json")));
        assert_eq!(path, PathBuf::from("configured.json"));
    }

    #[test]
    fn test_default_path_ends_with_state_file() {
        assert!(default_state_path().ends_with(STATE_FILE));
    }
}
