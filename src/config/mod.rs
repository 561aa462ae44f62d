/// Settings read from `release.toml`, merged over the built-in defaults.
pub mod file;
/// Secrets and resolved paths for a single run.
pub mod runtime;
