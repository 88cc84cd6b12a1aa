//! Unified logging macros for knx-tpuart.
//!
//! This module provides a unified logging interface that automatically
//! selects between `defmt::` and `log::` based on the active feature flags,
//! and compiles to nothing when neither backend is enabled.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::tp_log;
//!
//! tp_log!(info, "UART reset requested");
//! tp_log!(debug, "incoming byte {:02x}", byte);
//! tp_log!(warn, "timeout while receiving telegram");
//! ```
//!
//! # Feature Flags
//!
//! - `defmt` - Uses `defmt::` (efficient binary logging for embedded targets)
//! - `log` - Uses `log::` (host-side applications)
//! - Neither - All log statements compile away

/// Unified logging macro - selects defmt::, log:: or no-op based on features
#[macro_export]
#[cfg(feature = "defmt")]
macro_rules! tp_log {
    (info, $($arg:tt)*) => { defmt::info!($($arg)*) };
    (debug, $($arg:tt)*) => { defmt::debug!($($arg)*) };
    (warn, $($arg:tt)*) => { defmt::warn!($($arg)*) };
    (error, $($arg:tt)*) => { defmt::error!($($arg)*) };
    (trace, $($arg:tt)*) => { defmt::trace!($($arg)*) };
}

#[macro_export]
#[cfg(all(not(feature = "defmt"), feature = "log"))]
macro_rules! tp_log {
    (info, $($arg:tt)*) => { log::info!($($arg)*) };
    (debug, $($arg:tt)*) => { log::debug!($($arg)*) };
    (warn, $($arg:tt)*) => { log::warn!($($arg)*) };
    (error, $($arg:tt)*) => { log::error!($($arg)*) };
    (trace, $($arg:tt)*) => { log::trace!($($arg)*) };
}

#[macro_export]
#[cfg(all(not(feature = "defmt"), not(feature = "log")))]
macro_rules! tp_log {
    ($level:ident, $($arg:tt)*) => {{
        // Logging disabled; swallow the arguments without evaluating format
        // machinery but keep them type-checked out of the way.
        let _ = || ($($arg)*);
    }};
}
