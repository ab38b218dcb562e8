// Logging setup
//
// RUST_LOG wins when set. Otherwise clipsmith logs at the configured level and
// dependencies at warn. Output goes to stderr so stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Levels accepted in config and on the command line
const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Filter directive for a level name, unknown names fall back to info
pub fn filter_directive(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    let level = if LEVELS.contains(&level.as_str()) {
        level
    } else {
        "info".to_string()
    };
    format!("clipsmith={},warn", level)
}

/// Map `-q` / `-v` counts onto a level, `None` keeps the configured one
pub fn level_from_flags(quiet: bool, verbose: u8) -> Option<&'static str> {
    if quiet {
        return Some("error");
    }
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(filter_directive(level))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
