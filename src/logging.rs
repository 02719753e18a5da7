use tracing::Level;
use tracing_subscriber::fmt;

/// Installs the global fmt subscriber. Returns false if one was already set.
pub fn init(level: Level) -> bool {
    fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}
