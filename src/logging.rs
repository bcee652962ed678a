use tracing_subscriber::EnvFilter;

/// Installs a formatted tracing subscriber for the whole process.
///
/// `directives` is an `EnvFilter` string (e.g. `"info"` or
/// `"action_bridge=debug"`); `RUST_LOG` wins when set. Later calls are
/// ignored.
pub fn init_logging(directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging("info");
        init_logging("debug");
    }
}
