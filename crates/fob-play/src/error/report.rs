//! Miette diagnostic conversion for run errors.

use super::{BuildError, PlayError};
use fob_browser_test::{BrowserError, PageFault};
use miette::{MietteDiagnostic, Report};

/// Converts a `PlayError` into a miette report for the terminal.
pub fn into_report(err: PlayError) -> Report {
    match err {
        PlayError::Build(BuildError::Diagnostics {
            bundler,
            diagnostics,
        }) => {
            let mut diagnostic = MietteDiagnostic::new(format!(
                "Errors while bundling with {bundler}:\n{}",
                diagnostics.join("\n")
            ));
            if bundler == "transpile" {
                diagnostic = diagnostic
                    .with_help("The transpile bundler does not resolve imports; use --bundler rolldown");
            }
            Report::new(diagnostic)
        }
        PlayError::PageFault(PageFault::Exception { message }) => Report::new(
            MietteDiagnostic::new(format!("Uncaught error in test page: {message}"))
                .with_help("Errors thrown outside of a test abort the whole run"),
        ),
        PlayError::Browser(BrowserError::LaunchFailed { reason, source }) => {
            let cause = source
                .as_ref()
                .map(ToString::to_string)
                .filter(|cause| !reason.contains(cause.as_str()));
            let message = match cause {
                Some(cause) => format!("Failed to launch Chrome: {reason} ({cause})"),
                None => format!("Failed to launch Chrome: {reason}"),
            };
            Report::new(
                MietteDiagnostic::new(message)
                    .with_help("Install Chrome/Chromium or point --chrome at the executable"),
            )
        }
        other => miette::miette!("{}", other),
    }
}
