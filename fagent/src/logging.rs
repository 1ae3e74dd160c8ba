//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber filtered by `RUST_LOG`, or by `fallback` when the
/// variable is unset or invalid.
///
/// Returns `false` when a global subscriber was already installed; that is not an error.
pub fn init_tracing(fallback: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::init_tracing;

    #[test]
    fn installing_twice_is_harmless() {
        init_tracing("fagent=debug");
        assert!(!init_tracing("fagent=debug"));
        tracing::info!(phase = "test", event = "after_second_init");
    }
}
