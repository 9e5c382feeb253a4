use std::env;
use std::path::PathBuf;

/// Environment variable overriding the default schema base directory.
pub const BASE_DIR_ENV: &str = "SQLMIGRATE_BASE_DIR";

/// Fallback base directory when neither an option nor the environment
/// provides one.
pub const DEFAULT_BASE_DIR: &str = "schemas";

/// Resolve the base directory that schema trees live under.
///
/// Explicit options always win; this is only the fallback consulted at
/// engine construction. Tests pass an override path instead of relying on
/// the process environment.
pub fn default_base_dir() -> PathBuf {
    match env::var(BASE_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_BASE_DIR),
    }
}
