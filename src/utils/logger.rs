use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Console logging for the CLI. The crate logs at `Info` (or `Debug` with
/// `verbose`), dependencies only surface warnings. Library consumers install
/// their own logger instead of calling this.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME").cyan();
            match record.level() {
                Level::Error => writeln!(
                    buf,
                    "[{} {} {}] {}",
                    name,
                    "ERROR".red(),
                    record.target().to_string().white(),
                    record.args()
                ),
                Level::Warn => writeln!(
                    buf,
                    "[{} {} {}] {}",
                    name,
                    "WARN".yellow(),
                    record.target().to_string().white(),
                    record.args()
                ),
                Level::Debug | Level::Trace => {
                    writeln!(buf, "[{} {}] {}", name, record.target(), record.args())
                }
                Level::Info => writeln!(buf, "[{}] {}", name, record.args()),
            }
        })
        .init();
}
