use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::env;

/// Environment variable holding the log level (`error` .. `trace`)
pub(crate) const LOG_ENV: &str = "ESH_LOG";

/// Install the stderr logger. `--trace` wins over `ESH_LOG`; with neither,
/// logging stays off.
pub(crate) fn init(trace: bool) {
    let level = if trace {
        LevelFilter::Trace
    } else {
        env::var(LOG_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LevelFilter::Off)
    };
    if level == LevelFilter::Off {
        return;
    }

    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    if TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        eprintln!("esh: logger already initialized");
    }
}
