//! Log output for riffbook.
//!
//! Events go to stderr through `tracing-subscriber`, leaving stdout to
//! command output such as CSV and JSON. `RUST_LOG`, when set, replaces the
//! filter derived from the command-line flags.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much riffbook logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings and errors; command output carries the rest.
    #[default]
    Normal,
    /// Store traffic and save decisions (debug).
    Verbose,
    /// Everything (trace).
    Trace,
}

impl Verbosity {
    /// Map `-q` and the number of `-v` flags. `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The level name used in filter directives.
    #[must_use]
    pub fn level_name(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
            Self::Trace => "trace",
        }
    }

    /// Filter directive limiting riffbook's own events, e.g. `riffbook=debug`.
    #[must_use]
    pub fn directive(self) -> String {
        format!("riffbook={}", self.level_name())
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// ```no_run
/// use riffbook::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    // Module paths only help when digging into store traffic
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= Verbosity::Verbose);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}

/// Route warnings to the test harness's captured output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(Verbosity::Normal.directive())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(false, 9), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Quiet);
    }

    #[test]
    fn test_directive() {
        assert_eq!(Verbosity::Quiet.directive(), "riffbook=error");
        assert_eq!(Verbosity::default().directive(), "riffbook=warn");
        assert_eq!(Verbosity::Trace.directive(), "riffbook=trace");
    }

    #[test]
    fn test_ordering() {
        assert!(Verbosity::Quiet < Verbosity::Normal);
        assert!(Verbosity::Verbose < Verbosity::Trace);
    }

    #[test]
    fn test_init_is_repeatable() {
        init_logging(Verbosity::Verbose);
        init_logging(Verbosity::Quiet);
        init_test_logging();
    }
}
