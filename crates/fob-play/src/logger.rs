//! Logging setup for the `fob-play` binary.
//!
//! Both crates log through `tracing`; this installs the subscriber.
//! `--verbose` shows debug events of fob-play and the browser session,
//! `--quiet` only errors. Otherwise `RUST_LOG` applies, falling back to info.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "fob_play=debug,fob_browser_test=debug";
const QUIET_FILTER: &str = "fob_play=error,fob_browser_test=error";
const DEFAULT_FILTER: &str = "fob_play=info,fob_browser_test=info";

/// Initialize the tracing subscriber.
///
/// Call once, before anything logs. Colors are disabled by `no_color` or
/// the `NO_COLOR` environment variable.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .with_writer(std::io::stderr)
        .compact();

    // try_init: a second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt_layer)
        .try_init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Check if colored log output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them; otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
