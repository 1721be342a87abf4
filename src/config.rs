//! §6.2's configuration document is parsed entirely inside
//! `polycall-loader::LoaderCore::load_from_configuration` (children,
//! files, execution_paths); this module only resolves *which* document
//! to hand it, per `CONFIGURATION_PATH` (§6.4).

use std::path::{Path, PathBuf};

use crate::env;

/// `CONFIGURATION_PATH` if set, else `default`.
pub fn resolve_path(default: &Path) -> PathBuf {
    env::configuration_path(default)
}
