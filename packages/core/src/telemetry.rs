//! Logging setup
//!
//! Libraries normally leave subscriber installation to the application; this
//! helper exists for binaries, tests and examples that just want output.

use crate::config::MapperConfig;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `config.log_filter` when the variable is unset
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(config: &MapperConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let config = MapperConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
