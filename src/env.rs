//! §6.4's three environment variables: the shared-library search
//! override consumed by `polycall-registry`'s `PluginManager` (named
//! per-manager as `<MANAGER>_LIBRARY_PATH`, so it has no fixed constant
//! here), the script search path, and the default configuration path.

use std::env;
use std::path::{Path, PathBuf};

pub const SCRIPT_PATH_VAR: &str = "LOADER_SCRIPT_PATH";
pub const CONFIGURATION_PATH_VAR: &str = "CONFIGURATION_PATH";

/// Splits `LOADER_SCRIPT_PATH` on the platform path-list delimiter
/// (`:` on Unix, `;` on Windows, via `std::env::split_paths`). Empty or
/// unset yields an empty list rather than an error — callers decide
/// whether "nowhere configured" is fatal.
pub fn script_search_path() -> Vec<PathBuf> {
    match env::var_os(SCRIPT_PATH_VAR) {
        Some(raw) => env::split_paths(&raw).collect(),
        None => Vec::new(),
    }
}

/// `CONFIGURATION_PATH` if set, else `default`.
pub fn configuration_path(default: &Path) -> PathBuf {
    env::var_os(CONFIGURATION_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| default.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_path_falls_back_to_default_when_unset() {
        env::remove_var(CONFIGURATION_PATH_VAR);
        assert_eq!(configuration_path(Path::new("polycall.json")), PathBuf::from("polycall.json"));
    }

    #[test]
    fn script_search_path_is_empty_when_unset() {
        env::remove_var(SCRIPT_PATH_VAR);
        assert!(script_search_path().is_empty());
    }
}
