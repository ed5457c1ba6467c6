// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time configurable logging.
//!
//! The stack is chatty at `trace` level (every frame in and out) and quiet
//! otherwise, so the macros here are zero-cost when the `logging` feature is
//! off: they expand to nothing rather than to a runtime level check.
//!
//! Unlike the rest of this crate's nearest relatives, which roll a bespoke
//! global logger, this crate is thin enough that it sinks through the
//! ordinary `log` crate; what lives here is the hex-dump formatting `trace`
//! messages need for wire frames.

#[cfg(feature = "logging")]
pub mod output;

#[cfg(feature = "logging")]
pub use output::hex_dump;

/// Debug-level log message. No-op unless the `logging` feature is enabled.
#[macro_export]
#[cfg(feature = "logging")]
macro_rules! debug {
    ($($arg:tt)*) => { log::debug!($($arg)*); };
}

/// Info-level log message. No-op unless the `logging` feature is enabled.
#[macro_export]
#[cfg(feature = "logging")]
macro_rules! info {
    ($($arg:tt)*) => { log::info!($($arg)*); };
}

/// Warning-level log message. No-op unless the `logging` feature is enabled.
#[macro_export]
#[cfg(feature = "logging")]
macro_rules! warn {
    ($($arg:tt)*) => { log::warn!($($arg)*); };
}

/// Error-level log message. No-op unless the `logging` feature is enabled.
#[macro_export]
#[cfg(feature = "logging")]
macro_rules! error {
    ($($arg:tt)*) => { log::error!($($arg)*); };
}

/// Trace a raw wire frame as a hex dump. Only active with both `logging`
/// and `trace` enabled; the frame is otherwise not even formatted.
#[macro_export]
#[cfg(all(feature = "logging", feature = "trace"))]
macro_rules! trace_frame {
    ($label:expr, $bytes:expr) => {
        log::trace!("{}: {}", $label, $crate::logging::hex_dump($bytes));
    };
}

#[macro_export]
#[cfg(not(all(feature = "logging", feature = "trace")))]
macro_rules! trace_frame {
    ($label:expr, $bytes:expr) => {};
}

#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
