//! Tracing setup for the quire binary and embedders
//!
//! Both `quire` (the CLI) and `quire_core` log under their own targets, so a
//! bare level such as `debug` is expanded to cover the two crates.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable checked before `RUST_LOG`
pub const LOG_ENV: &str = "QUIRE_LOG";

const CRATE_TARGETS: [&str; 2] = ["quire", "quire_core"];

/// Log the time elapsed since `$start` at trace level, with optional fields.
///
/// ```rust,ignore
/// let start = Instant::now();
/// store.rebuild_index()?;
/// trace_time!(start, "rebuild_index", notes = count);
/// ```
#[macro_export]
macro_rules! trace_time {
    ($start:expr, $name:expr) => {
        tracing::trace!(elapsed = ?$start.elapsed(), $name);
    };
    ($start:expr, $name:expr $(, $field:ident = $value:expr)*) => {
        tracing::trace!(elapsed = ?$start.elapsed(), $($field = $value),*, $name);
    };
}

/// Filter directives for a CLI level. Anything already written as
/// `target=level` directives is passed through unchanged.
fn directives(verbose: bool, log_level: Option<&str>) -> String {
    let level = log_level.unwrap_or(if verbose { "debug" } else { "warn" });
    if level.contains('=') {
        return level.to_string();
    }
    CRATE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber.
///
/// `QUIRE_LOG`, then `RUST_LOG`, override the level derived from the
/// arguments. Output goes to stderr so stdout stays clean for `--format json`.
pub fn init_tracing(
    verbose: bool,
    log_level: Option<&str>,
    log_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(directives(verbose, log_level)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let base = fmt::layer().with_writer(std::io::stderr).with_ansi(false);

    if log_json {
        registry
            .with(
                base.json()
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
            )
            .try_init()?;
    } else {
        registry.with(base.compact().with_target(false)).try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_verbose_levels() {
        assert_eq!(directives(false, None), "quire=warn,quire_core=warn");
        assert_eq!(directives(true, None), "quire=debug,quire_core=debug");
    }

    #[test]
    fn test_explicit_level_wins_over_verbose() {
        assert_eq!(directives(true, Some("trace")), "quire=trace,quire_core=trace");
        assert_eq!(directives(false, Some("quire_core=info")), "quire_core=info");
    }
}
