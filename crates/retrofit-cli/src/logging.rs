use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub(crate) const LOG_ENV: &str = "RETROFIT_LOG";

pub(crate) fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Diagnostics go to stderr; report lines on stdout stay clean.
pub(crate) fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}
