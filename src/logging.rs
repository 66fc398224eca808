//! Logging macros.
//!
//! - `stm32` feature: forwarded to `defmt` (RTT transport)
//! - unit tests: `println!` with a level prefix
//! - host builds otherwise: no-op, arguments are still type-checked
//!
//! Stick to `{}` and `{:?}` placeholders so one format string works for both
//! defmt and `core::fmt`.

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "stm32")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "stm32"), test))]
        println!("[ERROR] {}", format!($($arg)*));

        #[cfg(all(not(feature = "stm32"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "stm32")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "stm32"), test))]
        println!("[WARN] {}", format!($($arg)*));

        #[cfg(all(not(feature = "stm32"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "stm32")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "stm32"), test))]
        println!("[INFO] {}", format!($($arg)*));

        #[cfg(all(not(feature = "stm32"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "stm32")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "stm32"), test))]
        println!("[DEBUG] {}", format!($($arg)*));

        #[cfg(all(not(feature = "stm32"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}
