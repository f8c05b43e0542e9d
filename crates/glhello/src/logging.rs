//! `env_logger` setup for the demo binary.
//!
//! `glhello_core` only writes to the `log` facade. Whoever runs the demo
//! decides where that output goes.

/// Send `log` records to stderr.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this after a logger
/// is installed changes nothing.
pub fn init_logging(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::debug!("logger installed");
    }
}
