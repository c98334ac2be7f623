use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is not set.
pub fn default_level(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over the flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, quiet)));
    // A subscriber may already be set when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
