//! Logger setup for the binaries

use std::time::Instant;

use log::info;

use crate::common::MpcResult;

pub use log::LevelFilter;

/// Install a `fern` logger writing `[elapsed level] target: message` to stdout
///
/// Must only be called once per process.
pub fn logger_init(min_level: LevelFilter) -> MpcResult<()> {
    let start = Instant::now();

    fern::Dispatch::new()
        .format(move |out, message, record| {
            // target only for debug and trace output
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    start.elapsed().as_secs_f64(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    start.elapsed().as_secs_f64(),
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(min_level)
        .chain(std::io::stdout())
        .apply()?;

    info!("Logging initialised, level {:?}", min_level);
    Ok(())
}

fn level_to_str(level: log::Level) -> &'static str {
    match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info => "INF",
        log::Level::Warn => "WRN",
        log::Level::Error => "ERR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_tags() {
        assert_eq!(level_to_str(log::Level::Warn), "WRN");
        assert_eq!(level_to_str(log::Level::Trace), "TRC");
    }
}
