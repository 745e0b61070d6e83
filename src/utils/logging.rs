//! Conditional logging macros that check a module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! // In your module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! // Then use the macros (they're exported at the crate root):
//! use crate::{log_debug, log_info, log_warn};
//!
//! log_info!("This will log if ENABLE_LOGS is true");
//! ```

use env_logger::Env;
use log::LevelFilter;

/// Installs the global logger. `RUST_LOG` wins; otherwise the level is
/// `Info`, or `Debug` when `debug` is set.
pub fn init(debug: bool) {
    let default_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()))
        .format_timestamp_millis()
        .try_init();
}

/// Macro for conditional debug logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Macro for conditional info logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
///
/// Each module that uses this macro must define:
/// ```ignore
/// const ENABLE_LOGS: bool = true; // or false
/// ```
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Macro for conditional warn logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Macro for conditional error logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
