//! env_logger setup for the bridge

use std::sync::atomic::{AtomicBool, Ordering};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install env_logger with `filter` once per process.
///
/// Returns `false` if this or another logger was already installed, which
/// is expected when the host application brings its own.
pub fn init(filter: &str) -> bool {
    if INSTALLED.swap(true, Ordering::AcqRel) {
        return false;
    }

    let installed = env_logger::Builder::new()
        .parse_filters(filter)
        .format_timestamp_millis()
        .try_init()
        .is_ok();

    if installed {
        log::debug!("logging::init: filter '{}'", filter);
    }
    installed
}
