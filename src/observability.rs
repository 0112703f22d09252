//! This module provides observability hooks for the planner and executor.
//!
//! Library code only talks to the `log` facade. `log_metric!` formats a
//! structured key-value line under the `gridcodec::metrics` target, and
//! `enable_verbose_logging` installs the `env_logger` backend for binaries that
//! want to see it.

use log::LevelFilter;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use crate::error::CodecError;

/// Target used by every `log_metric!` line, so they can be filtered on their own.
pub const METRIC_TARGET: &str = "gridcodec::metrics";

/// Logs a structured key-value metric line at debug level.
///
/// # Example
/// ```
/// use gridcodec::log_metric;
/// let k = 4;
/// log_metric!("event"="rice_block", "k"=&k);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if $crate::log::log_enabled!(target: $crate::observability::METRIC_TARGET, $crate::log::Level::Debug) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            $crate::log::debug!(
                target: $crate::observability::METRIC_TARGET,
                "GRIDCODEC_METRIC: {{ {} }}",
                parts.join(", ")
            );
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs a `[LEVEL] message` logger at Info level, optionally appending to
/// `log_file` instead of stderr. Only the first call has any effect.
pub fn enable_verbose_logging(log_file: Option<&Path>) -> Result<(), CodecError> {
    let sink = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(LevelFilter::Info);

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = sink {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
