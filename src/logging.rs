use env_logger::Env;

pub const LOG_ENV: &str = "TREX_OLAP_LOG";

/// Install an `env_logger` backend filtered by `TREX_OLAP_LOG` (default
/// `info`). Safe to call more than once; later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().filter_or(LOG_ENV, "info"))
        .format_timestamp_millis()
        .try_init();
}
