#![warn(clippy::all, rust_2018_idioms)]

/// Unified logging macros with module and line context.
///
/// Every record goes to both the `log` facade and `tracing`, so library users
/// that only install one of the two still see probe diagnostics.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!("[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
        tracing::debug!("[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!("[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
        tracing::info!("[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!("[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
        tracing::warn!("[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!("[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
        tracing::error!("[{}:{}] {}", module_path!(), line!(), format!($($arg)*));
    };
}
